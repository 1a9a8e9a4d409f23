use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ToolError};

/// A program plus its argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Name of the program, for log lines and errors
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Last argument, which is the output file for both tools
    pub fn output_path(&self) -> Option<&Path> {
        self.args.last().map(Path::new)
    }

    /// Human readable command line (for logs only)
    pub fn display(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Combined stdout and stderr
    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Runs external programs for the pipeline
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion and capture its output
    ///
    /// A non-zero exit status is reported in [`ToolOutput`], not as an error.
    /// Errors are reserved for processes that could not be started or did
    /// not finish in time.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Spawns real processes with a bounded wait
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Check whether a program can be started at all
    pub async fn is_available<P: AsRef<OsStr>>(program: P) -> bool {
        Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let program = invocation.program_name();
        debug!("Running: {}", invocation.display());

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // The child is killed if the wait below is abandoned
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| ToolError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                return Err(ToolError::TimedOut {
                    program,
                    seconds: self.timeout.as_secs(),
                }.into());
            }
        };

        let result = ToolOutput {
            status_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!("{} exited with {:?}: {}", program, result.status_code, result.combined());
        Ok(result)
    }
}
