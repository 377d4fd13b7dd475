//! Additive merge of `artifacts/` into `repos/` on the distribution host.
//!
//! `rsync --ignore-existing` copies only files missing from `repos/`, so the
//! merge never replaces a published file and re-running it after an
//! interruption is safe.

use crate::error::{PackagerError, Result};
use crate::remote::{RemoteCommand, RemoteOutput, RemoteRunner};

/// Build the population command for `artifact_parent_directory`.
#[must_use]
pub fn population_command(artifact_parent_directory: &str) -> RemoteCommand {
    let parent = match artifact_parent_directory.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };
    let artifacts = if parent == "/" {
        "/artifacts".to_owned()
    } else {
        format!("{parent}/artifacts")
    };

    RemoteCommand::new()
        .raws(["[", "-d"])
        .arg(artifacts)
        .raws(["]", "||", "exit", "1", "&&", "cd"])
        .arg(parent)
        .raws([
            "&&",
            "rsync",
            "--archive",
            "--verbose",
            "--one-file-system",
            "--ignore-existing",
            "artifacts/",
            "repos/",
        ])
}

/// Merge `<artifact_parent_directory>/artifacts/` into the sibling `repos/`
/// on `host`, returning the transfer log.
///
/// # Errors
///
/// Returns [`PackagerError::RepoPopulation`] when `artifacts/` is missing,
/// `rsync` fails, or the host cannot be reached.
pub fn populate_repo_directory(
    runner: &dyn RemoteRunner,
    host: &str,
    artifact_parent_directory: &str,
) -> Result<RemoteOutput> {
    let command = population_command(artifact_parent_directory);
    log::info!("populating repos in {host}:{artifact_parent_directory}");
    log::debug!("{command}");

    runner
        .run(host, &command, false)
        .map_err(|source| PackagerError::RepoPopulation {
            host: host.to_owned(),
            directory: artifact_parent_directory.to_owned(),
            source,
        })
}
