//! core::user_data
//!
//! Loading and merging user-supplied structured data.

use std::path::Path;

use serde_json::{Map, Value};

use super::payload::PayloadError;

/// Load the JSON document at `path`.
///
/// # Errors
///
/// [`PayloadError::UserDataUnreadable`] when the file cannot be read or is
/// not valid JSON.
pub fn load(path: &Path) -> Result<Value, PayloadError> {
    let unreadable = |reason: String| PayloadError::UserDataUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| unreadable(format!("invalid JSON: {e}")))
}

/// Merge the optional file at `path` over `base`.
///
/// When both are objects the file's top-level keys replace the base's; a
/// non-object file replaces the base entirely. Without a file the base is
/// returned, with `null` normalized to `{}`.
pub fn merge(base: Value, path: Option<&Path>) -> Result<Value, PayloadError> {
    let base = match base {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    let Some(path) = path else {
        return Ok(base);
    };

    match (base, load(path)?) {
        (Value::Object(mut base), Value::Object(file)) => {
            base.extend(file);
            Ok(Value::Object(base))
        }
        (_, file) => Ok(file),
    }
}
