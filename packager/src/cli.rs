//! CLI argument definitions for the release packager.
//!
//! Kept apart from the entrypoint so parsing can be tested without running
//! any packaging step.

use crate::archive::FailurePolicy;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::versioning::VersioningMode;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Prepare per-platform package repositories for release.
#[derive(Parser, Debug)]
#[command(name = "release-packager")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Archive every platform of the configured release version:\n",
    "    $ release-packager archive --by version\n\n",
    "  List directories holding RPMs on the distribution host:\n",
    "    $ release-packager discover /srv/acme/1.4.0/artifacts --ext rpm --unique\n\n",
    "  Merge uploaded artifacts into the published repositories:\n",
    "    $ release-packager populate /srv/acme/1.4.0\n\n",
    "Set FAIL_ON_MISSING_TARGET=true to fail instead of skipping platforms\n",
    "whose repository directory is empty.",
))]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, value_name = "FILE", global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: Utf8PathBuf,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write `repos/<project>-<platform>.tar.gz` for every configured platform.
    Archive(ArchiveArgs),

    /// Merge `artifacts/` into `repos/` on the distribution host.
    Populate(PopulateArgs),

    /// List directories on the distribution host that contain packages.
    Discover(DiscoverArgs),
}

/// Arguments for the `archive` command.
#[derive(Parser, Debug, Clone)]
pub struct ArchiveArgs {
    /// Name the staging directory after the `ref` or the `version`.
    #[arg(long = "by", value_name = "MODE")]
    pub mode: VersioningMode,

    /// Stop at the first failing platform, or attempt them all.
    #[arg(long, value_name = "POLICY", default_value_t = FailurePolicy::FailFast)]
    pub policy: FailurePolicy,

    /// Project name used in archive names [default: from configuration].
    #[arg(long)]
    pub project: Option<String>,

    /// Print the archive report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `populate` command.
#[derive(Parser, Debug, Clone)]
pub struct PopulateArgs {
    /// Remote directory holding `artifacts/` and `repos/`.
    #[arg(value_name = "PARENT_DIR")]
    pub artifact_parent_directory: String,
}

/// Arguments for the `discover` command.
#[derive(Parser, Debug, Clone)]
pub struct DiscoverArgs {
    /// Remote directory to search.
    #[arg(value_name = "ARTIFACT_DIR")]
    pub artifact_directory: String,

    /// Package file extension, without the leading dot.
    #[arg(long = "ext", value_name = "EXT")]
    pub extension: String,

    /// Print each directory once, sorted.
    #[arg(long)]
    pub unique: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
