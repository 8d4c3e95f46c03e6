//! Builder for executing external tool commands with an optional timeout.
//!
//! Jobs run on worker threads, so execution is blocking. A timeout, when set,
//! kills the child once the limit passes.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::{Error, Result};

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use vidmend_av::ToolCommand;
/// use std::time::Duration;
///
/// let mut cmd = ToolCommand::new("ffmpeg");
/// cmd.args(["-i", "in.mp4", "-c", "copy", "-y", "out.mkv"])
///     .timeout(Duration::from_secs(3600));
/// cmd.run()?;
/// # Ok::<(), vidmend_av::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    visible: bool,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
            visible: false,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Set or clear the maximum execution time.
    pub fn maybe_timeout(&mut self, d: Option<Duration>) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Let the tool write to this process's terminal instead of discarding
    /// its diagnostics.
    pub fn visible(&mut self, visible: bool) -> &mut Self {
        self.visible = visible;
        self
    }

    /// Short program name used in errors and logs.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Shell-like rendering of the full command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command to completion, discarding its output.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if the program cannot be found.
    /// - [`Error::TimedOut`] if the timeout expires (the child is killed).
    /// - [`Error::ToolFailed`] on a non-zero exit status.
    pub fn run(&self) -> Result<()> {
        let mut cmd = self.command();
        cmd.stdout(self.diagnostics());
        let mut child = self.spawn(&mut cmd)?;
        let status = self.wait(&mut child)?;
        self.check(status)
    }

    /// Run the command and return everything it wrote to stdout.
    ///
    /// Errors as [`ToolCommand::run`].
    pub fn capture(&self) -> Result<Vec<u8>> {
        let mut cmd = self.command();
        cmd.stdout(Stdio::piped());
        let mut child = self.spawn(&mut cmd)?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::tool_failed(self.program_name(), "stdout was not captured"))?;
        // Drain on a separate thread so a full pipe cannot stall the child.
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let status = self.wait(&mut child);
        let data = reader
            .join()
            .map_err(|_| Error::tool_failed(self.program_name(), "stdout reader panicked"))?;

        self.check(status?)?;
        Ok(data?)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stderr(self.diagnostics());
        cmd
    }

    fn diagnostics(&self) -> Stdio {
        if self.visible {
            Stdio::inherit()
        } else {
            Stdio::null()
        }
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Child> {
        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(self.program_name())
            } else {
                Error::tool_failed(self.program_name(), format!("failed to spawn: {e}"))
            }
        })
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(limit) = self.timeout else {
            return Ok(child.wait()?);
        };

        match child.wait_timeout(limit)? {
            Some(status) => Ok(status),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(Error::TimedOut {
                    tool: self.program_name(),
                    timeout: limit,
                })
            }
        }
    }

    fn check(&self, status: ExitStatus) -> Result<()> {
        if status.success() {
            Ok(())
        } else {
            Err(Error::tool_failed(
                self.program_name(),
                format!("exited with status {status}"),
            ))
        }
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}
