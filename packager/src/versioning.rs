//! Versioning mode selection.
//!
//! Chooses whether an archive's root directory is named after the
//! source-control ref or the dotted release version.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which path segment identifies a build's staging directory.
///
/// # Examples
///
/// ```
/// use release_packager::versioning::VersioningMode;
///
/// let mode: VersioningMode = "version".parse().expect("known mode");
/// assert_eq!(mode, VersioningMode::ByVersion);
/// assert!("tag".parse::<VersioningMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersioningMode {
    /// Use the source-control ref (for example a commit SHA).
    ByRef,
    /// Use the dotted release version string.
    ByVersion,
}

impl VersioningMode {
    /// Return the canonical name accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ByRef => "ref",
            Self::ByVersion => "version",
        }
    }
}

impl fmt::Display for VersioningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioning mode string that is neither `ref` nor `version`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown versioning mode \"{0}\"; expected \"ref\" or \"version\"")]
pub struct UnknownVersioningMode(pub String);

impl FromStr for VersioningMode {
    type Err = UnknownVersioningMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ref" => Ok(Self::ByRef),
            "version" => Ok(Self::ByVersion),
            other => Err(UnknownVersioningMode(other.to_owned())),
        }
    }
}
