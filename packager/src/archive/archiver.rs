//! Creation of per-platform repository archives.

use super::backend::{ArchiveBackend, ArchiveRequest};
use super::digest::compute_sha256;
use super::layout::{ArchiveLayout, REPOS_DIR, is_empty_or_absent};
use super::naming::ArchiveName;
use crate::config::PackagingConfig;
use crate::error::{PackagerError, PlatformFailure, Result};
use crate::versioning::VersioningMode;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable that turns empty repository subtrees into errors.
pub const STRICT_MODE_ENV: &str = "FAIL_ON_MISSING_TARGET";

/// Whether an empty repository subtree is an error or a skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictMode {
    /// Empty subtrees fail with [`PackagerError::MissingArtifacts`].
    Enabled,
    /// Empty subtrees are skipped with a warning.
    Disabled,
}

impl StrictMode {
    /// Read [`STRICT_MODE_ENV`]; only the exact value `true` enables it.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(STRICT_MODE_ENV).ok().as_deref())
    }

    /// Interpret a raw environment value.
    #[must_use]
    pub fn from_value(value: Option<&str>) -> Self {
        if value == Some("true") {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

/// A successfully written archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedArchive {
    /// Final archive path.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// Output reported by the archive writer.
    pub output: String,
}

/// Result of archiving one repository subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ArchiveOutcome {
    /// The archive was written.
    Created(CreatedArchive),
    /// The subtree was empty and strict mode was off.
    Skipped {
        /// Why nothing was written.
        reason: String,
    },
}

/// How [`Archiver::create_all_repo_archives`] reacts to a failing platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure.
    #[default]
    FailFast,
    /// Archive every platform, then report all failures together.
    CollectAll,
}

impl FailurePolicy {
    /// Return the command-line spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::CollectAll => "collect-all",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecognised failure policy string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown failure policy \"{0}\"; expected fail-fast or collect-all")]
pub struct UnknownFailurePolicy(pub String);

impl FromStr for FailurePolicy {
    type Err = UnknownFailurePolicy;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "fail-fast" => Ok(Self::FailFast),
            "collect-all" => Ok(Self::CollectAll),
            other => Err(UnknownFailurePolicy(other.to_owned())),
        }
    }
}

/// One platform's entry in an [`ArchiveReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformOutcome {
    /// Platform name.
    pub platform: String,
    /// Name of the platform's archive.
    pub archive_name: ArchiveName,
    /// What happened.
    pub outcome: ArchiveOutcome,
}

/// Outcomes of archiving every configured platform, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    /// Per-platform outcomes.
    pub platforms: Vec<PlatformOutcome>,
}

impl ArchiveReport {
    /// Archives that were written.
    pub fn created(&self) -> impl Iterator<Item = (&PlatformOutcome, &CreatedArchive)> {
        self.platforms.iter().filter_map(|entry| match &entry.outcome {
            ArchiveOutcome::Created(created) => Some((entry, created)),
            ArchiveOutcome::Skipped { .. } => None,
        })
    }

    /// Number of platforms that were skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.platforms
            .iter()
            .filter(|entry| matches!(entry.outcome, ArchiveOutcome::Skipped { .. }))
            .count()
    }
}

/// Writes repository archives for a packaging run.
pub struct Archiver<'a> {
    config: &'a PackagingConfig,
    backend: &'a dyn ArchiveBackend,
}

impl<'a> Archiver<'a> {
    /// Archive trees described by `config` with `backend`.
    #[must_use]
    pub fn new(config: &'a PackagingConfig, backend: &'a dyn ArchiveBackend) -> Self {
        Self { config, backend }
    }

    /// Archive `repo_subpath` of the selected build as
    /// `repos/<archive_name>.tar.gz`.
    ///
    /// An empty or absent subtree is skipped with a warning unless
    /// [`STRICT_MODE_ENV`] is `true`. The archive is staged in a temporary
    /// file next to its destination and renamed into place, so an existing
    /// archive is replaced only by a complete one.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::OverlappingRepoSubtree`] when `repo_subpath`
    /// and `repos/` contain one another,
    /// [`PackagerError::MissingArtifacts`] for an empty subtree in strict
    /// mode, and the backend's error if writing fails.
    pub fn create_signed_repo_archive(
        &self,
        repo_subpath: &Utf8Path,
        archive_name: &ArchiveName,
        mode: VersioningMode,
    ) -> Result<ArchiveOutcome> {
        let strict = StrictMode::from_env();
        let layout = ArchiveLayout::new(self.config.version_root(mode), repo_subpath);
        let source = layout.source_dir();
        if layout.source_overlaps_repos() {
            return Err(PackagerError::OverlappingRepoSubtree { path: source });
        }

        if is_empty_or_absent(&source)? {
            if strict == StrictMode::Enabled {
                return Err(PackagerError::MissingArtifacts { path: source });
            }
            let reason = format!("{source} has no files");
            log::warn!("Skipping {archive_name} because {reason}");
            return Ok(ArchiveOutcome::Skipped { reason });
        }

        let repos_dir = layout.repos_dir();
        fs::create_dir_all(&repos_dir)?;
        let staged = staging_file(&repos_dir, archive_name)?;
        let staged_name = staged
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "non UTF-8 temporary file name")
            })?;
        let destination = Utf8Path::new(REPOS_DIR).join(staged_name);

        log::info!("Archiving {source} as {archive_name}");
        let output = self.backend.write_archive(&ArchiveRequest {
            working_dir: layout.version_root(),
            source: layout.repo_subpath(),
            destination: &destination,
        })?;

        let path = layout.archive_path(archive_name);
        staged.persist(&path).map_err(|err| err.error)?;
        let sha256 = compute_sha256(path.as_std_path())?;
        log::debug!("{path} sha256 {sha256}");

        Ok(ArchiveOutcome::Created(CreatedArchive { path, sha256, output }))
    }

    /// Archive every configured platform as `<project>-<platform>`.
    ///
    /// # Errors
    ///
    /// With [`FailurePolicy::FailFast`], returns
    /// [`PackagerError::PlatformArchive`] for the first failing platform.
    /// With [`FailurePolicy::CollectAll`], returns
    /// [`PackagerError::ArchiveBatch`] listing every failure. A `project`
    /// that cannot form an archive name fails with
    /// [`PackagerError::InvalidArchiveName`] before anything is written.
    pub fn create_all_repo_archives(
        &self,
        project: &str,
        mode: VersioningMode,
        policy: FailurePolicy,
    ) -> Result<ArchiveReport> {
        let mut report = ArchiveReport::default();
        let mut failures = Vec::new();

        for entry in &self.config.platform_repos {
            let archive_name = ArchiveName::for_platform(project, &entry.name)?;
            match self.create_signed_repo_archive(&entry.repo_location, &archive_name, mode) {
                Ok(outcome) => report.platforms.push(PlatformOutcome {
                    platform: entry.name.clone(),
                    archive_name,
                    outcome,
                }),
                Err(error) => match policy {
                    FailurePolicy::FailFast => {
                        return Err(PackagerError::PlatformArchive {
                            platform: entry.name.clone(),
                            source: Box::new(error),
                        });
                    }
                    FailurePolicy::CollectAll => {
                        log::error!("archiving {} failed: {error}", entry.name);
                        failures.push(PlatformFailure {
                            platform: entry.name.clone(),
                            error,
                        });
                    }
                },
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(PackagerError::ArchiveBatch { failures })
        }
    }
}

fn staging_file(
    repos_dir: &Utf8Path,
    archive_name: &ArchiveName,
) -> io::Result<tempfile::NamedTempFile> {
    let prefix = format!(".{archive_name}.");
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".partial");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(repos_dir)
}

#[cfg(test)]
#[path = "archiver_tests.rs"]
mod tests;
