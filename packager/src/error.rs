//! Error types for the release packager.
//!
//! Every remote failure is wrapped at the call site with the host, path, and
//! operation it concerned. The lower-level cause stays reachable through
//! [`std::error::Error::source`].

use crate::config::ConfigError;
use crate::remote::RemoteError;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while discovering, populating, or archiving
/// package repositories.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// Strict mode is enabled and a platform's repository subtree is empty.
    #[error("missing packages under {path}")]
    MissingArtifacts {
        /// The empty or absent directory.
        path: Utf8PathBuf,
    },

    /// The archiving tool ran but reported failure.
    #[error("{tool} exited with {code}: {stderr}", code = ExitCode(*.status))]
    ArchiveTool {
        /// Path to the archiving tool.
        tool: Utf8PathBuf,
        /// Exit code, or `None` when the tool was killed by a signal.
        status: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The archiving tool could not be started.
    #[error("failed to run {tool}")]
    ToolInvocation {
        /// Path to the tool that failed to start.
        tool: Utf8PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A required tool is not installed or not on `PATH`.
    #[error("required tool {tool} not found on PATH")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// Listing package directories on the distribution host failed.
    #[error(
        "could not retrieve directories that contain {extension} packages in {host}:{directory}"
    )]
    RemoteDiscovery {
        /// The package extension that was searched for.
        extension: String,
        /// The distribution host.
        host: String,
        /// The artifact directory on the host.
        directory: String,
        /// The remote execution failure.
        #[source]
        source: RemoteError,
    },

    /// Merging `artifacts/` into `repos/` on the distribution host failed.
    #[error("could not populate repos directory in {host}:{directory}")]
    RepoPopulation {
        /// The distribution host.
        host: String,
        /// The artifact parent directory on the host.
        directory: String,
        /// The remote execution failure.
        #[source]
        source: RemoteError,
    },

    /// A package extension contains characters outside `[A-Za-z0-9._-]`.
    #[error("invalid package extension \"{extension}\"")]
    InvalidExtension {
        /// The rejected extension.
        extension: String,
    },

    /// An archive name is empty, hidden, or contains a path separator.
    #[error("invalid archive name \"{name}\"")]
    InvalidArchiveName {
        /// The rejected name.
        name: String,
    },

    /// A repository subtree is `repos/`, lies inside it, or contains it.
    #[error("repository subtree {path} overlaps the archive directory")]
    OverlappingRepoSubtree {
        /// The rejected subtree.
        path: Utf8PathBuf,
    },

    /// Archiving a single platform failed while archiving every platform.
    #[error("archiving platform {platform} failed")]
    PlatformArchive {
        /// The platform whose archive failed.
        platform: String,
        /// The failure for that platform.
        #[source]
        source: Box<PackagerError>,
    },

    /// One or more platforms failed while archiving every platform.
    #[error("{} platform archive(s) failed: {}", .failures.len(), PlatformList(.failures))]
    ArchiveBatch {
        /// Failures in platform table order.
        failures: Vec<PlatformFailure>,
    },

    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single platform's failure within an [`PackagerError::ArchiveBatch`].
#[derive(Debug)]
pub struct PlatformFailure {
    /// The platform name.
    pub platform: String,
    /// What went wrong for that platform.
    pub error: PackagerError,
}

struct ExitCode(Option<i32>);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "status {code}"),
            None => f.write_str("no status (terminated by signal)"),
        }
    }
}

struct PlatformList<'a>(&'a [PlatformFailure]);

impl fmt::Display for PlatformList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, failure) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} ({})", failure.platform, failure.error)?;
        }
        Ok(())
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
