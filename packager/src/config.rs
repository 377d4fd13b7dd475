//! Packaging configuration.
//!
//! The configuration is read once from a TOML file at pipeline start and
//! passed by reference to every operation:
//!
//! ```toml
//! project = "acme"
//! ref = "3f2c1e9"
//! version = "1.4.0"
//! distribution_server = "builds.example.com"
//!
//! [ssh]
//! user = "deploy"
//! timeout_secs = 600
//!
//! [[platform_repos]]
//! name = "el7"
//! repo_location = "rpm/el7"
//! ```

use crate::archive::BackendKind;
use crate::platform::PlatformRepoTable;
use crate::remote::SshOptions;
use crate::versioning::VersioningMode;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration file looked up in the working directory by default.
pub const DEFAULT_CONFIG_FILE: &str = "release-packager.toml";

/// Local staging directory holding per-project build trees.
pub const DEFAULT_STAGING_ROOT: &str = "pkg";

const DEFAULT_SSH_TIMEOUT_SECS: u64 = 300;

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Path (or origin label) of the configuration.
        path: Utf8PathBuf,
        /// The TOML decoding error.
        #[source]
        source: toml::de::Error,
    },

    /// A required setting is empty.
    #[error("configuration setting `{field}` must not be empty")]
    EmptySetting {
        /// The setting name.
        field: &'static str,
    },

    /// The project name cannot be used as a path segment.
    #[error("invalid project name \"{name}\"")]
    InvalidProjectName {
        /// The rejected project name.
        name: String,
    },

    /// The `ref` or `version` cannot be used as a path segment.
    #[error("invalid {field} \"{value}\"; expected a single path segment")]
    InvalidBuildIdentifier {
        /// The setting name.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A platform name cannot be used in an archive name.
    #[error("invalid platform name \"{name}\"")]
    InvalidPlatformName {
        /// The rejected platform name.
        name: String,
    },

    /// A platform's repository location is not a plain relative path.
    #[error("platform {name} has invalid repo_location \"{location}\"; expected a relative path")]
    InvalidRepoLocation {
        /// The platform name.
        name: String,
        /// The rejected location.
        location: Utf8PathBuf,
    },

    /// A platform's repository location is the archive directory or lies
    /// inside it.
    #[error("platform {name} has repo_location \"{location}\" inside the reserved repos directory")]
    ReservedRepoLocation {
        /// The platform name.
        name: String,
        /// The rejected location.
        location: Utf8PathBuf,
    },

    /// Two platforms share a name.
    #[error("platform {name} is configured more than once")]
    DuplicatePlatform {
        /// The repeated platform name.
        name: String,
    },
}

/// `ssh` settings from the `[ssh]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SshConfig {
    /// Connection options forwarded to `ssh`.
    #[serde(flatten)]
    pub connection: SshOptions,
    /// Seconds before a remote command is killed.
    #[serde(default = "default_ssh_timeout_secs")]
    pub timeout_secs: u64,
}

impl SshConfig {
    /// Return the remote command timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            connection: SshOptions::default(),
            timeout_secs: DEFAULT_SSH_TIMEOUT_SECS,
        }
    }
}

const fn default_ssh_timeout_secs() -> u64 {
    DEFAULT_SSH_TIMEOUT_SECS
}

fn default_staging_root() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_STAGING_ROOT)
}

/// Immutable configuration for one packaging run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackagingConfig {
    /// Project name; the first path segment under the staging root.
    pub project: String,
    /// Source-control ref of the build.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Dotted release version of the build.
    pub version: String,
    /// Host holding the `artifacts/` and `repos/` trees.
    pub distribution_server: String,
    /// Local directory containing `<project>/<ref-or-version>` trees.
    #[serde(default = "default_staging_root")]
    pub staging_root: Utf8PathBuf,
    /// How archives are written.
    #[serde(default)]
    pub archive_backend: BackendKind,
    /// Explicit path to `tar`; searched on `PATH` when unset.
    #[serde(default)]
    pub tar_path: Option<Utf8PathBuf>,
    /// `ssh` connection settings.
    #[serde(default)]
    pub ssh: SshConfig,
    /// Platforms to archive, in order.
    #[serde(default)]
    pub platform_repos: PlatformRepoTable,
}

impl PackagingConfig {
    /// Load and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, and a parse
    /// or validation error if its contents are unusable.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_toml_str(&contents, path)?;
        log::debug!(
            "loaded {path}: project {}, {} platform(s)",
            config.project,
            config.platform_repos.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration text. `origin` labels errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or schema
    /// mismatches, and a validation error for unusable values.
    pub fn from_toml_str(contents: &str, origin: &Utf8Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("project", &self.project),
            ("ref", &self.git_ref),
            ("version", &self.version),
            ("distribution_server", &self.distribution_server),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptySetting { field });
            }
        }
        if !is_path_segment(&self.project) {
            return Err(ConfigError::InvalidProjectName {
                name: self.project.clone(),
            });
        }
        for (field, value) in [("ref", &self.git_ref), ("version", &self.version)] {
            if !is_path_segment(value) {
                return Err(ConfigError::InvalidBuildIdentifier {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// Return the ref or version string selected by `mode`.
    #[must_use]
    pub fn build_identifier(&self, mode: VersioningMode) -> &str {
        match mode {
            VersioningMode::ByRef => &self.git_ref,
            VersioningMode::ByVersion => &self.version,
        }
    }

    /// Return `<staging_root>/<project>/<ref-or-version>`.
    #[must_use]
    pub fn version_root(&self, mode: VersioningMode) -> Utf8PathBuf {
        self.staging_root
            .join(&self.project)
            .join(self.build_identifier(mode))
    }
}

fn is_path_segment(value: &str) -> bool {
    !value.contains(['/', '\\']) && value != "." && value != ".."
}
