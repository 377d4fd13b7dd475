//! Release packager library.
//!
//! Prepares per-platform package repositories for publication. The crate
//! lists the directories on a distribution host that hold built packages,
//! merges freshly uploaded artifacts into the durable repository tree
//! without overwriting anything, and writes one gzip-compressed tar archive
//! per platform from the local staging tree.
//!
//! # Modules
//!
//! - [`archive`] - Per-platform repository archives
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration for a packaging run
//! - [`error`] - Error types and the crate `Result` alias
//! - [`exec`] - Local process execution with optional timeouts
//! - [`inspector`] - Package directory discovery on the distribution host
//! - [`platform`] - The platform repository table
//! - [`populator`] - Additive merge of artifacts into repositories
//! - [`remote`] - Shell commands on the distribution host
//! - [`tool`] - Executable resolution on `PATH`
//! - [`versioning`] - Ref or version staging directory selection

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod inspector;
pub mod platform;
pub mod populator;
pub mod remote;
pub mod tool;
pub mod versioning;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use archive::{ArchiveOutcome, ArchiveReport, Archiver, FailurePolicy};
pub use config::PackagingConfig;
pub use error::{PackagerError, Result};
pub use inspector::{directories_that_contain_packages, unique_directories};
pub use populator::populate_repo_directory;
pub use versioning::VersioningMode;
