use std::process::ExitCode;

use trailmark::cli::{self, Cli, Globals};
use trailmark::telemetry;
use trailmark::ui::output;

/// Exit status for any failure outside a dry run.
const FAILURE: u8 = 42;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    telemetry::init(cli.debug);

    let globals = Globals::from_cli(&cli);
    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if globals.dry_run => {
            output::warn(format!("{:#}", err), globals.verbosity());
            ExitCode::SUCCESS
        }
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::from(FAILURE)
        }
    }
}
