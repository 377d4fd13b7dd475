//! Platform repository table.
//!
//! Each supported platform names the relative location of its packages in
//! the repository tree. The table is read-only once loaded.

use crate::archive::REPOS_DIR;
use crate::config::ConfigError;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One platform and the repository subtree holding its packages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformRepoEntry {
    /// Platform identifier used in the archive name (for example `el7`).
    pub name: String,
    /// Repository subtree relative to the version directory
    /// (for example `rpm/el7`).
    pub repo_location: Utf8PathBuf,
}

impl PlatformRepoEntry {
    /// Create an entry after validating both fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPlatformName`] or
    /// [`ConfigError::InvalidRepoLocation`] when a field is unusable, and
    /// [`ConfigError::ReservedRepoLocation`] for a location under `repos/`.
    pub fn new(
        name: impl Into<String>,
        repo_location: impl Into<Utf8PathBuf>,
    ) -> Result<Self, ConfigError> {
        let entry = Self {
            name: name.into(),
            repo_location: repo_location.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.trim() != name {
            return Err(ConfigError::InvalidPlatformName {
                name: self.name.clone(),
            });
        }
        if !is_plain_relative(&self.repo_location) {
            return Err(ConfigError::InvalidRepoLocation {
                name: self.name.clone(),
                location: self.repo_location.clone(),
            });
        }
        if is_under_repos_dir(&self.repo_location) {
            return Err(ConfigError::ReservedRepoLocation {
                name: self.name.clone(),
                location: self.repo_location.clone(),
            });
        }
        Ok(())
    }
}

fn is_under_repos_dir(path: &Utf8Path) -> bool {
    path.components()
        .find(|component| matches!(component, Utf8Component::Normal(_)))
        .is_some_and(|component| component.as_str() == REPOS_DIR)
}

/// Return `true` for a non-empty relative path made only of normal
/// components (no `..`, no root, no prefix).
fn is_plain_relative(path: &Utf8Path) -> bool {
    path.components()
        .all(|component| matches!(component, Utf8Component::Normal(_) | Utf8Component::CurDir))
        && path
            .components()
            .any(|component| matches!(component, Utf8Component::Normal(_)))
}

/// The ordered set of platforms to archive.
///
/// Platform names are unique, so archive names derived from them are
/// unique within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlatformRepoTable {
    entries: Vec<PlatformRepoEntry>,
}

impl PlatformRepoTable {
    /// Build a table, rejecting invalid or duplicate entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicatePlatform`] when two entries share a
    /// name, or the validation error of the first invalid entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_packager::platform::{PlatformRepoEntry, PlatformRepoTable};
    ///
    /// let table = PlatformRepoTable::new(vec![
    ///     PlatformRepoEntry::new("el7", "rpm/el7")?,
    ///     PlatformRepoEntry::new("deb10", "deb/deb10")?,
    /// ])?;
    /// assert_eq!(table.len(), 2);
    /// # Ok::<(), release_packager::config::ConfigError>(())
    /// ```
    pub fn new(entries: Vec<PlatformRepoEntry>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            entry.validate()?;
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicatePlatform {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Iterate over the entries in configuration order.
    pub fn iter(&self) -> std::slice::Iter<'_, PlatformRepoEntry> {
        self.entries.iter()
    }

    /// Return the number of platforms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if no platforms are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a PlatformRepoTable {
    type Item = &'a PlatformRepoEntry;
    type IntoIter = std::slice::Iter<'a, PlatformRepoEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for PlatformRepoTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<PlatformRepoEntry>::deserialize(deserializer)?;
        Self::new(entries).map_err(serde::de::Error::custom)
    }
}
