//! Remote command execution on the distribution host.
//!
//! # Sub-modules
//!
//! - [`command`]: structured, quoted shell command lines (`RemoteCommand`).
//! - [`ssh`]: the production [`RemoteRunner`] built on `ssh`.

pub mod command;
pub mod ssh;

pub use command::{RemoteCommand, shell_quote};
pub use ssh::{SshOptions, SshRunner};

use std::process::Output;
use thiserror::Error;

/// Captured output of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    /// Standard output, lossily decoded as UTF-8.
    pub stdout: String,
    /// Standard error, lossily decoded as UTF-8.
    pub stderr: String,
}

/// Failures of the remote execution transport or the remote command.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The transport could not be started, or it timed out.
    #[error("could not reach {host}")]
    Transport {
        /// The host that was contacted.
        host: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The remote command exited unsuccessfully.
    #[error(
        "command on {host} exited with status {}: {stderr}",
        .status.map_or_else(|| "unknown".to_owned(), |code| code.to_string())
    )]
    NonZeroExit {
        /// The host that ran the command.
        host: String,
        /// Exit code reported by the transport, if any.
        status: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

/// Runs shell commands on a named host.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteRunner {
    /// Run `command` on `host` and return its captured output.
    ///
    /// With `ignore_nonzero_exit` set, a command that runs but exits
    /// unsuccessfully still returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] when the host cannot be reached and
    /// [`RemoteError::NonZeroExit`] when the command fails and
    /// `ignore_nonzero_exit` is `false`.
    fn run(
        &self,
        host: &str,
        command: &RemoteCommand,
        ignore_nonzero_exit: bool,
    ) -> Result<RemoteOutput, RemoteError>;
}

/// Convert a finished transport process into a [`RemoteOutput`], applying
/// the non-zero exit policy.
pub(crate) fn complete(
    host: &str,
    output: &Output,
    ignore_nonzero_exit: bool,
) -> Result<RemoteOutput, RemoteError> {
    let result = RemoteOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if output.status.success() || ignore_nonzero_exit {
        return Ok(result);
    }

    Err(RemoteError::NonZeroExit {
        host: host.to_owned(),
        status: output.status.code(),
        stderr: result.stderr.trim().to_owned(),
    })
}
