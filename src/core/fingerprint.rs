//! core::fingerprint
//!
//! Artifact identity: a given fingerprint, or one computed from an artifact.
//!
//! # Design
//!
//! Computing digests is delegated to a [`Fingerprinter`]. The built-in
//! [`FileFingerprinter`] hashes regular files; directory and container image
//! digests need a runtime the reporter does not ship with and are rejected.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::{Fingerprint, TypeError};

/// Errors from establishing an artifact's identity.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("{0}")]
    ConflictingArtifactIdentity(String),

    #[error("unsupported artifact type '{artifact_type}'")]
    UnsupportedArtifactType { artifact_type: String },

    #[error("failed to read artifact '{path}': {source}")]
    ArtifactUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    InvalidFingerprint(#[from] TypeError),
}

/// Kinds of artifact a fingerprint can be computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactType {
    File,
    Dir,
    Docker,
    Oci,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::File => "file",
            ArtifactType::Dir => "dir",
            ArtifactType::Docker => "docker",
            ArtifactType::Oci => "oci",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactType {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ArtifactType::File),
            "dir" => Ok(ArtifactType::Dir),
            "docker" => Ok(ArtifactType::Docker),
            "oci" => Ok(ArtifactType::Oci),
            other => Err(FingerprintError::UnsupportedArtifactType {
                artifact_type: other.to_string(),
            }),
        }
    }
}

/// Computes fingerprints for named artifacts.
pub trait Fingerprinter {
    fn fingerprint(&self, artifact_type: ArtifactType, name: &str)
        -> Result<Fingerprint, FingerprintError>;
}

/// SHA-256 of a regular file's contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFingerprinter;

impl Fingerprinter for FileFingerprinter {
    fn fingerprint(
        &self,
        artifact_type: ArtifactType,
        name: &str,
    ) -> Result<Fingerprint, FingerprintError> {
        if artifact_type != ArtifactType::File {
            return Err(FingerprintError::UnsupportedArtifactType {
                artifact_type: artifact_type.to_string(),
            });
        }

        let path = Path::new(name);
        let unreadable = |source| FingerprintError::ArtifactUnreadable {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(unreadable)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher).map_err(unreadable)?;

        Ok(Fingerprint::new(hex::encode(hasher.finalize()))?)
    }
}

/// How the user identified the artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactIdentity {
    /// `--fingerprint`
    pub fingerprint: Option<String>,
    /// `--artifact-type`
    pub artifact_type: Option<String>,
    /// Artifact name or path
    pub name: Option<String>,
}

impl ArtifactIdentity {
    /// Identify by a known fingerprint.
    pub fn by_fingerprint(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: Some(fingerprint.into()),
            ..Self::default()
        }
    }

    /// Identify by computing a fingerprint of `name`.
    pub fn by_type(artifact_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artifact_type: Some(artifact_type.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Resolve to a fingerprint.
    ///
    /// # Errors
    ///
    /// - [`FingerprintError::ConflictingArtifactIdentity`] unless exactly one
    ///   of the fingerprint or the type (with a name) is given
    /// - [`FingerprintError::InvalidFingerprint`] for a malformed digest
    pub fn resolve(&self, fingerprinter: &dyn Fingerprinter) -> Result<Fingerprint, FingerprintError> {
        match (&self.fingerprint, &self.artifact_type) {
            (Some(_), Some(_)) => Err(FingerprintError::ConflictingArtifactIdentity(
                "only one of --fingerprint, --artifact-type is allowed".into(),
            )),
            (None, None) => Err(FingerprintError::ConflictingArtifactIdentity(
                "either --artifact-type or --fingerprint must be specified".into(),
            )),
            (Some(fp), None) => Ok(Fingerprint::new(fp.as_str())?),
            (None, Some(kind)) => {
                let name = self.name.as_deref().filter(|n| !n.is_empty()).ok_or_else(|| {
                    FingerprintError::ConflictingArtifactIdentity(
                        "an artifact name or path is required with --artifact-type".into(),
                    )
                })?;
                fingerprinter.fingerprint(kind.parse()?, name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn file_fingerprint_is_sha256() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let fp = FileFingerprinter
            .fingerprint(ArtifactType::File, f.path().to_str().unwrap())
            .unwrap();
        assert_eq!(fp.as_str(), HELLO_SHA256);
    }

    #[test]
    fn docker_is_unsupported() {
        let err = FileFingerprinter
            .fingerprint(ArtifactType::Docker, "nginx:latest")
            .unwrap_err();
        assert!(matches!(err, FingerprintError::UnsupportedArtifactType { .. }));
    }

    #[test]
    fn unknown_type_is_unsupported() {
        assert!(matches!(
            "tarball".parse::<ArtifactType>(),
            Err(FingerprintError::UnsupportedArtifactType { .. })
        ));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = FileFingerprinter
            .fingerprint(ArtifactType::File, "/no/such/artifact.bin")
            .unwrap_err();
        assert!(matches!(err, FingerprintError::ArtifactUnreadable { .. }));
    }

    mod identity {
        use super::*;

        #[test]
        fn fingerprint_only() {
            let fp = ArtifactIdentity::by_fingerprint(HELLO_SHA256.to_uppercase())
                .resolve(&FileFingerprinter)
                .unwrap();
            assert_eq!(fp.as_str(), HELLO_SHA256);
        }

        #[test]
        fn neither_is_conflict() {
            let err = ArtifactIdentity::default()
                .resolve(&FileFingerprinter)
                .unwrap_err();
            assert!(err.to_string().contains("must be specified"));
        }

        #[test]
        fn both_is_conflict() {
            let identity = ArtifactIdentity {
                fingerprint: Some(HELLO_SHA256.into()),
                artifact_type: Some("file".into()),
                name: Some("app.bin".into()),
            };
            let err = identity.resolve(&FileFingerprinter).unwrap_err();
            assert!(err.to_string().contains("only one of"));
        }

        #[test]
        fn type_without_name_is_conflict() {
            let identity = ArtifactIdentity {
                artifact_type: Some("file".into()),
                ..Default::default()
            };
            assert!(matches!(
                identity.resolve(&FileFingerprinter),
                Err(FingerprintError::ConflictingArtifactIdentity(_))
            ));
        }

        #[test]
        fn malformed_fingerprint_rejected() {
            let err = ArtifactIdentity::by_fingerprint("abc")
                .resolve(&FileFingerprinter)
                .unwrap_err();
            assert!(matches!(err, FingerprintError::InvalidFingerprint(_)));
        }
    }
}
