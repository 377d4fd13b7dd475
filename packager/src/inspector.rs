//! Discovery of package directories on the distribution host.

use crate::error::{PackagerError, Result};
use crate::remote::{RemoteCommand, RemoteRunner};
use std::collections::BTreeSet;

/// Build the discovery command for `artifact_directory` and `pkg_extension`.
///
/// The command fails when the directory is missing and otherwise prints the
/// containing directory of every `*.<pkg_extension>` file, one per line.
#[must_use]
pub fn discovery_command(artifact_directory: &str, pkg_extension: &str) -> RemoteCommand {
    RemoteCommand::new()
        .raws(["[", "-d"])
        .arg(artifact_directory)
        .raws(["]", "||", "exit", "1", "&&", "cd"])
        .arg(artifact_directory)
        .raws(["&&", "find", ".", "-name"])
        .arg(format!("*.{pkg_extension}"))
        .raws([
            "-print0",
            "|",
            "xargs",
            "--no-run-if-empty",
            "-0",
            "-I",
            "{}",
            "dirname",
            "{}",
        ])
}

/// List the directories under `artifact_directory` on `host` that contain a
/// `*.<pkg_extension>` file.
///
/// Paths are relative to `artifact_directory` without a leading `./`;
/// packages at the root appear as `.`. There is one entry per matching file,
/// in the remote traversal order, so a directory holding several packages is
/// listed several times. See [`unique_directories`].
///
/// # Errors
///
/// Returns [`PackagerError::InvalidExtension`] for an extension outside
/// `[A-Za-z0-9._-]` or starting with a dot, and
/// [`PackagerError::RemoteDiscovery`] when the command fails or the directory
/// does not exist.
pub fn directories_that_contain_packages(
    runner: &dyn RemoteRunner,
    host: &str,
    artifact_directory: &str,
    pkg_extension: &str,
) -> Result<Vec<String>> {
    validate_extension(pkg_extension)?;
    let command = discovery_command(artifact_directory, pkg_extension);
    log::debug!("discovering {pkg_extension} packages on {host}: {command}");

    let output = runner.run(host, &command, false).map_err(|source| {
        PackagerError::RemoteDiscovery {
            extension: pkg_extension.to_owned(),
            host: host.to_owned(),
            directory: artifact_directory.to_owned(),
            source,
        }
    })?;

    Ok(parse_directories(&output.stdout))
}

/// Collapse repeated directories into a sorted set.
#[must_use]
pub fn unique_directories(directories: &[String]) -> BTreeSet<String> {
    directories.iter().cloned().collect()
}

fn parse_directories(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix("./").unwrap_or(line).to_owned())
        .collect()
}

fn validate_extension(extension: &str) -> Result<()> {
    let valid = !extension.is_empty()
        && !extension.starts_with('.')
        && extension
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(PackagerError::InvalidExtension {
            extension: extension.to_owned(),
        })
    }
}
