//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git commit identifier (SHA)
//! - [`Fingerprint`] - SHA-256 content digest identifying an artifact
//! - [`ResourceName`] - Validated flow, environment or trail name
//!
//! # Validation
//!
//! Each type is checked when it is built, so a malformed fingerprint or
//! name can never reach a URL.
//!
//! # Examples
//!
//! ```
//! use trailmark::core::types::{Fingerprint, Oid, ResourceName};
//!
//! let oid = Oid::new("9fceb02d0ae598e95dc970b74767f19372d61af8").unwrap();
//! let fp = Fingerprint::new(
//!     "c6b02fb1708fbc46e63f5074c38d17852bfa0c7bcfcdd1f877e80476e3fcb74f",
//! ).unwrap();
//! let flow = ResourceName::new("payments-api").unwrap();
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(Fingerprint::new("abc").is_err());
//! assert!(ResourceName::new("-leading-dash").is_err());
//! # let _ = (oid, fp, flow);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid name: {0}")]
    InvalidName(String),
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// Stored lowercase.
///
/// # Example
///
/// ```
/// use trailmark::core::types::Oid;
///
/// let oid = Oid::new("9FCEB02D0AE598E95DC970B74767F19372D61AF8").unwrap();
/// assert_eq!(oid.as_str(), "9fceb02d0ae598e95dc970b74767f19372d61af8");
/// assert_eq!(oid.short(7), "9fceb02");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Validate and lowercase a full commit hash.
    ///
    /// # Errors
    ///
    /// [`TypeError::InvalidOid`] unless `oid` is 40 or 64 hex digits.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        match oid.len() {
            40 | 64 if oid.bytes().all(|b| b.is_ascii_hexdigit()) => Ok(Self(oid)),
            40 | 64 => Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal"))),
            n => Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {n}"
            ))),
        }
    }

    /// The first `len` characters, or all of them.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A SHA-256 content digest used as the primary key of an artifact.
///
/// The ledger addresses artifacts by fingerprint, which is what makes
/// repeated deliveries of the same event land on the same resource.
///
/// # Example
///
/// ```
/// use trailmark::core::types::Fingerprint;
///
/// let fp = Fingerprint::of_bytes(b"hello");
/// assert_eq!(
///     fp.as_str(),
///     "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Create a fingerprint from a hex digest string.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidFingerprint` unless the input is exactly
    /// 64 hexadecimal characters.
    pub fn new(digest: impl Into<String>) -> Result<Self, TypeError> {
        let digest = digest.into().to_ascii_lowercase();
        if digest.len() != 64 {
            return Err(TypeError::InvalidFingerprint(format!(
                "expected 64 hex characters, got {}",
                digest.len()
            )));
        }
        if !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidFingerprint(
                "fingerprint must be hexadecimal".into(),
            ));
        }
        Ok(Self(digest))
    }

    /// Compute the fingerprint of a byte buffer.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated ledger resource name (flow, environment or trail).
///
/// Names must start with an ASCII letter or digit and contain only
/// letters, digits, `.`, `-`, `_` and `~`.
///
/// # Example
///
/// ```
/// use trailmark::core::types::ResourceName;
///
/// assert!(ResourceName::new("staging").is_ok());
/// assert!(ResourceName::new("release~1.2_rc").is_ok());
/// assert!(ResourceName::new("").is_err());
/// assert!(ResourceName::new(".hidden").is_err());
/// assert!(ResourceName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a new validated name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidName` describing the first rule violated.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let Some(first) = name.chars().next() else {
            return Err(TypeError::InvalidName("name cannot be empty".into()));
        };

        if !first.is_ascii_alphanumeric() {
            return Err(TypeError::InvalidName(format!(
                "'{name}' must start with a letter or number"
            )));
        }

        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '~')))
        {
            return Err(TypeError::InvalidName(format!(
                "'{name}' contains invalid character '{c}'"
            )));
        }

        Ok(())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.0
    }
}

impl std::str::FromStr for ResourceName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
