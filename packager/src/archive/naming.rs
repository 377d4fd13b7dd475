//! Archive naming policy.
//!
//! Platform archives are named `<project>-<platform>` and written as
//! `<name>.tar.gz` under the version directory's `repos/` folder.

use crate::error::{PackagerError, Result};
use serde::Serialize;
use std::fmt;

/// The fixed file extension for repository archives.
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// The base name of a repository archive, without extension.
///
/// # Examples
///
/// ```
/// use release_packager::archive::ArchiveName;
///
/// let name = ArchiveName::for_platform("acme", "el7")?;
/// assert_eq!(name.to_string(), "acme-el7");
/// assert_eq!(name.filename(), "acme-el7.tar.gz");
/// # Ok::<(), release_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArchiveName(String);

impl ArchiveName {
    /// Build the archive name for `platform` of `project`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidArchiveName`] when the combined name
    /// fails [`ArchiveName::new`], as for a project containing `/`.
    pub fn for_platform(project: &str, platform: &str) -> Result<Self> {
        Self::new(&format!("{project}-{platform}"))
    }

    /// Validate an explicit archive name.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidArchiveName`] for empty names and
    /// names containing path separators.
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PackagerError::InvalidArchiveName {
                name: name.to_owned(),
            });
        }
        Ok(Self(name.to_owned()))
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the archive file name, including the `.tar.gz` extension.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("{}{ARCHIVE_EXTENSION}", self.0)
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
