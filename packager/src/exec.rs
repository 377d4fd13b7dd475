//! Local process execution.
//!
//! Every external program the packager starts (`tar`, `ssh`) goes through the
//! [`CommandExecutor`] seam so tests can script the responses.

use camino::Utf8Path;
use std::io;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `program` with `args`, optionally from `working_dir`, and returns
    /// the captured output. A non-zero exit is not an error at this layer.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command, including [`io::ErrorKind::TimedOut`] when a timeout expires.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use release_packager::exec::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("tar", &["--version".to_owned()], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, program: &str, args: &[String], working_dir: Option<&Utf8Path>)
    -> io::Result<Output>;
}

/// Executes commands on the host system.
///
/// With a timeout set, a command still running when it expires is killed and
/// reported as [`io::ErrorKind::TimedOut`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor {
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    /// Create an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    /// Return the configured timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(
        &self,
        program: &str,
        args: &[String],
        working_dir: Option<&Utf8Path>,
    ) -> io::Result<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir.as_std_path());
        }

        log::debug!("running {program} {}", args.join(" "));

        match self.timeout {
            None => cmd.output(),
            Some(timeout) => run_with_timeout(&mut cmd, program, timeout),
        }
    }
}

fn run_with_timeout(cmd: &mut Command, program: &str, timeout: Duration) -> io::Result<Output> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Pipes must be drained while waiting or a full pipe stalls the child.
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let Some(status) = child.wait_timeout(timeout)? else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{program} timed out after {} seconds", timeout.as_secs()),
        ));
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout_reader)?,
        stderr: join_reader(stderr_reader)?,
    })
}

type Reader = std::thread::JoinHandle<io::Result<Vec<u8>>>;

fn spawn_reader<R: io::Read + Send + 'static>(mut pipe: R) -> Reader {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        pipe.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn join_reader(reader: Option<Reader>) -> io::Result<Vec<u8>> {
    match reader {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader thread panicked"))?,
    }
}
