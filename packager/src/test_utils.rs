//! Shared test utilities for the packager crate.

use crate::exec::{CommandExecutor, SystemCommandExecutor};
use crate::remote::{RemoteCommand, RemoteError, RemoteOutput, RemoteRunner};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    output_with_stdout("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn output_with_stdout(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "tar").
    pub program: String,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The working directory the program must run from.
    pub working_dir: Option<Utf8PathBuf>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Utf8Path>,
    ) -> io::Result<Output> {
        let mut expected = self.expected.borrow_mut();
        let call = expected.pop_front().expect("unexpected command invocation");

        assert_eq!(call.program, program);
        assert_eq!(call.args.as_slice(), args);
        assert_eq!(call.working_dir.as_deref(), working_dir);

        call.result
    }
}

/// A [`RemoteRunner`] that ignores the host and runs the rendered command
/// through the local `sh`.
///
/// Lets tests exercise the exact shell text sent to the distribution host
/// against a scratch directory tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalShellRunner {
    executor: SystemCommandExecutor,
}

impl RemoteRunner for LocalShellRunner {
    fn run(
        &self,
        host: &str,
        command: &RemoteCommand,
        ignore_nonzero_exit: bool,
    ) -> Result<RemoteOutput, RemoteError> {
        let args = vec!["-c".to_owned(), command.render()];
        let output = self
            .executor
            .run("sh", &args, None)
            .map_err(|source| RemoteError::Transport {
                host: host.to_owned(),
                source,
            })?;
        crate::remote::complete(host, &output, ignore_nonzero_exit)
    }
}
