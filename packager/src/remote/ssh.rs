//! `ssh`-backed remote runner.

use super::{RemoteCommand, RemoteError, RemoteOutput, RemoteRunner};
use crate::exec::{CommandExecutor, SystemCommandExecutor};
use camino::Utf8PathBuf;
use serde::Deserialize;

/// Connection options passed to `ssh`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SshOptions {
    /// Remote login name; omitted to let `ssh` decide.
    #[serde(default)]
    pub user: Option<String>,
    /// Remote port; omitted to use the `ssh` default.
    #[serde(default)]
    pub port: Option<u16>,
    /// Private key to authenticate with.
    #[serde(default)]
    pub identity_file: Option<Utf8PathBuf>,
    /// Extra `-o` options such as `StrictHostKeyChecking=yes`.
    #[serde(default)]
    pub options: Vec<String>,
}

/// Runs remote commands by invoking the local `ssh` client.
///
/// The rendered command is passed to `ssh` as a single argument after `--`,
/// so the remote login shell sees exactly what [`RemoteCommand::render`]
/// produced.
#[derive(Debug, Clone)]
pub struct SshRunner<E = SystemCommandExecutor> {
    executor: E,
    program: String,
    options: SshOptions,
}

impl SshRunner<SystemCommandExecutor> {
    /// Create a runner using the system `ssh` client.
    #[must_use]
    pub fn new(options: SshOptions, executor: SystemCommandExecutor) -> Self {
        Self::with_executor(executor, options)
    }
}

impl<E: CommandExecutor> SshRunner<E> {
    /// Create a runner that launches `ssh` through `executor`.
    #[must_use]
    pub fn with_executor(executor: E, options: SshOptions) -> Self {
        Self {
            executor,
            program: "ssh".to_owned(),
            options,
        }
    }

    /// Use a different `ssh` binary.
    #[must_use]
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Build the argument vector for running `command` on `host`.
    #[must_use]
    pub fn ssh_args(&self, host: &str, command: &RemoteCommand) -> Vec<String> {
        let mut args = vec!["-o".to_owned(), "BatchMode=yes".to_owned()];
        if let Some(port) = self.options.port {
            args.extend(["-p".to_owned(), port.to_string()]);
        }
        if let Some(identity) = &self.options.identity_file {
            args.extend(["-i".to_owned(), identity.to_string()]);
        }
        for option in &self.options.options {
            args.extend(["-o".to_owned(), option.clone()]);
        }
        let destination = match &self.options.user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_owned(),
        };
        args.extend([destination, "--".to_owned(), command.render()]);
        args
    }
}

impl<E: CommandExecutor> RemoteRunner for SshRunner<E> {
    fn run(
        &self,
        host: &str,
        command: &RemoteCommand,
        ignore_nonzero_exit: bool,
    ) -> Result<RemoteOutput, RemoteError> {
        log::debug!("{host}: {command}");
        let output = self
            .executor
            .run(&self.program, &self.ssh_args(host, command), None)
            .map_err(|source| RemoteError::Transport {
                host: host.to_owned(),
                source,
            })?;

        super::complete(host, &output, ignore_nonzero_exit)
    }
}
