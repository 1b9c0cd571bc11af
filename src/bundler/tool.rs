//! External tool invocation.
//!
//! Every subprocess the packager starts (`otool`, `install_name_tool`,
//! `codesign`, `hdiutil`, `qmake`, `git`, the probe compiler) goes through a
//! [`ToolRunner`]. The runner always captures the exit code and output so the
//! caller decides whether a failure is fatal, best-effort or merely reported.

use crate::bundler::error::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::path::{Path, PathBuf};

/// A single command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run the program from `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, without the program.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory override, if any.
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Shell-like rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }
}

/// Structured result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// A zero-status result carrying `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A non-zero result carrying `stderr`.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the tool exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`Error::ExternalTool`].
    pub fn checked(self, invocation: &Invocation) -> Result<Self> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(Error::ExternalTool {
                command: invocation.display(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Executes [`Invocation`]s.
///
/// Implementations must not interpret exit codes; that is left to
/// [`ToolOutput::checked`] at the call site.
pub trait ToolRunner {
    /// Run the invocation to completion and capture its output.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ToolOutput>>;

    /// Run and fail on a non-zero exit.
    fn run_checked(&self, invocation: &Invocation) -> impl Future<Output = Result<ToolOutput>> {
        async move { self.run(invocation).await?.checked(invocation) }
    }
}

/// Runs tools as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ToolOutput>> {
        async move {
            log::debug!("Running: {}", invocation.display());

            let mut command = tokio::process::Command::new(invocation.program());
            command.args(invocation.get_args());
            if let Some(dir) = invocation.get_current_dir() {
                command.current_dir(dir);
            }

            let output = command
                .output()
                .await
                .map_err(|error| Error::CommandFailed {
                    command: invocation.display(),
                    error,
                })?;

            let result = ToolOutput {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };

            if !result.succeeded() {
                log::debug!(
                    "{} exited with {:?}: {}",
                    invocation.program(),
                    result.status,
                    result.stderr.trim()
                );
            }

            Ok(result)
        }
    }
}

/// Programs from `programs` that cannot be found on `PATH`.
pub fn missing_tools<'a>(programs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    programs
        .into_iter()
        .filter(|program| match which::which(program) {
            Ok(path) => {
                log::debug!("Found {} at: {}", program, path.display());
                false
            }
            Err(e) => {
                log::debug!("{} not found in PATH: {}", program, e);
                true
            }
        })
        .map(str::to_string)
        .collect()
}
