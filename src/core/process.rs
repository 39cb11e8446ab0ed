//! External process invocation.
//!
//! Every external program (generator, loader, promote tool, schema scripts)
//! is described by a typed `Invocation` and run through a `ProcessRunner`.
//! Arguments are handed to the OS as-is; no shell parses them.

use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::run_log::RunLog;
use crate::utils::shell;

/// A program with literal arguments, working directory and extra environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `flag value` as two separate arguments.
    pub fn flag(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Shell-quoted rendering for the log and the plan output.
    pub fn display(&self) -> String {
        shell::render_command(&self.program, &self.args)
    }
}

/// Exit code of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: i32,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Signal deaths map to `128 + signal`, as a shell would report them.
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self { code };
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self { code: 128 + signal };
            }
        }

        Self { code: 1 }
    }
}

/// What happened to one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(ProcessExit),
    TimedOut(Duration),
    SpawnFailed(String),
}

/// Seam between the pipeline and the operating system.
pub trait ProcessRunner {
    /// Run `invocation` to completion, sending its output to `log`.
    fn run(
        &self,
        invocation: &Invocation,
        log: &mut RunLog,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutcome>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        invocation: &Invocation,
        log: &mut RunLog,
        timeout: Option<Duration>,
    ) -> Result<ProcessOutcome> {
        let (stdout, stderr) = log.child_stdio()?;

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);

        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        cmd.envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return Ok(ProcessOutcome::SpawnFailed(e.to_string())),
        };

        let wait_error = |e: std::io::Error| {
            Error::internal_io(e.to_string(), Some(format!("wait for {}", invocation.program)))
        };

        let Some(limit) = timeout else {
            let status = child.wait().map_err(wait_error)?;
            return Ok(ProcessOutcome::Exited(ProcessExit::from_status(status)));
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(wait_error)? {
                return Ok(ProcessOutcome::Exited(ProcessExit::from_status(status)));
            }

            if started.elapsed() >= limit {
                // The child may exit between try_wait and kill; either way reap it.
                let _ = child.kill();
                let _ = child.wait();
                return Ok(ProcessOutcome::TimedOut(limit));
            }

            thread::sleep(self.poll_interval);
        }
    }
}
