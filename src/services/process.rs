// src/services/process.rs

//! Child process execution with a wait budget.
//!
//! Commands are described by a typed [`CommandSpec`] rather than a shell
//! string. A command waits `timeout`; with `retry` set it keeps waiting on the
//! same child for twice that long before the child is killed.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Result;

/// Exit code reported for a child that exhausted its wait budget.
pub const BUILD_TIMEOUT_CODE: i32 = -99;

/// Exit code reported for a child terminated by a signal.
const SIGNALLED_CODE: i32 = -1;

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
    pub retry: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: Duration::from_secs(120),
            retry: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration, retry: bool) -> Self {
        self.timeout = timeout;
        self.retry = retry;
        self
    }

    /// Longest total time the runner will wait for this command.
    pub fn budget(&self) -> Duration {
        if self.retry {
            self.timeout * 3
        } else {
            self.timeout
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited(i32),
    TimedOut,
}

/// Collected result of a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status: ProcessStatus::Exited(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            status: ProcessStatus::TimedOut,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Exit code, with [`BUILD_TIMEOUT_CODE`] standing in for a timeout.
    pub fn code(&self) -> i32 {
        match self.status {
            ProcessStatus::Exited(code) => code,
            ProcessStatus::TimedOut => BUILD_TIMEOUT_CODE,
        }
    }

    pub fn success(&self) -> bool {
        self.status == ProcessStatus::Exited(0)
    }
}

/// Executes [`CommandSpec`]s.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command to completion or until its wait budget is spent.
    ///
    /// Spawn failures are errors; a non-zero exit or timeout is not.
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput>;
}

/// Runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRunner;

#[async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            command.current_dir(dir);
        }

        log::debug!("[PROC] {}", spec);
        let child = command.spawn()?;
        let output = child.wait_with_output();
        tokio::pin!(output);

        let finished = match tokio::time::timeout(spec.timeout, &mut output).await {
            Ok(done) => Some(done?),
            Err(_) if spec.retry => {
                let extended = spec.timeout * 2;
                log::warn!(
                    "[PROC] {} still running after {}s, waiting {}s more",
                    spec.program,
                    spec.timeout.as_secs(),
                    extended.as_secs()
                );
                match tokio::time::timeout(extended, &mut output).await {
                    Ok(done) => Some(done?),
                    Err(_) => None,
                }
            }
            Err(_) => None,
        };

        // Dropping the pending future kills the child.
        let Some(out) = finished else {
            log::error!("[PROC] {} timed out", spec.program);
            return Ok(ProcessOutput::timed_out());
        };

        Ok(ProcessOutput::exited(
            out.status.code().unwrap_or(SIGNALLED_CODE),
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Runner returning canned outputs in order and recording every spec.
    #[derive(Default)]
    pub struct ScriptedRunner {
        outputs: Mutex<VecDeque<ProcessOutput>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        pub fn new(outputs: impl IntoIterator<Item = ProcessOutput>) -> Self {
            Self {
                outputs: Mutex::new(outputs.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput> {
            self.calls.lock().unwrap().push(spec.clone());
            Ok(self
                .outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ProcessOutput::exited(0, "", "")))
        }
    }
}
