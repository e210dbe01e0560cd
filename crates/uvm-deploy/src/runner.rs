//! External command execution with explicit timeouts.
//!
//! Deployers never spawn processes directly; they go through a
//! [`CommandRunner`] so workflows can be tested without `multipass`,
//! `terraform` or `xorriso` installed.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use uvm_core::UvmError;
use wait_timeout::ChildExt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`UvmError::CommandFailed`].
    pub fn check(self, program: &str) -> Result<CommandOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(UvmError::CommandFailed {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            }
            .into())
        }
    }
}

/// Render a command line for progress/log display.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|a| {
            if a.contains(' ') {
                format!("'{}'", a)
            } else {
                a.clone()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput>;

    fn run_checked(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        self.run(program, args, cwd, timeout)?.check(program)
    }
}

/// Runs real processes; kills them when the timeout expires.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        log::debug!("exec: {}", display_command(program, args));

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {}", program))?;

        // Drain pipes on threads so a chatty child can't block on a full pipe.
        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let stdout_handle = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout.take() {
                let _ = out.read_to_end(&mut buf);
            }
            buf
        });
        let stderr_handle = std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr.take() {
                let _ = err.read_to_end(&mut buf);
            }
            buf
        });

        let status = match child.wait_timeout(timeout).context("wait_timeout failed")? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(UvmError::CommandTimeout {
                    program: program.to_string(),
                    timeout_secs: timeout.as_secs(),
                }
                .into());
            }
        };

        let stdout = stdout_handle.join().unwrap_or_default();
        let stderr = stderr_handle.join().unwrap_or_default();
        Ok(CommandOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }
}

/// Recorded invocation of a [`fake::FakeRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl RecordedCommand {
    pub fn line(&self) -> String {
        display_command(&self.program, &self.args)
    }
}

pub mod fake {
    //! Scripted runner for tests: records every command and answers from a
    //! list of `(prefix, output)` rules.

    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct FakeRunner {
        rules: Arc<Mutex<Vec<(String, CommandOutput)>>>,
        calls: Arc<Mutex<Vec<RecordedCommand>>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer commands whose rendered line starts with `prefix`.
        /// Later rules win. Unmatched commands succeed with empty output.
        pub fn on(self, prefix: &str, output: CommandOutput) -> Self {
            if let Ok(mut rules) = self.rules.lock() {
                rules.push((prefix.to_string(), output));
            }
            self
        }

        pub fn ok(self, prefix: &str, stdout: &str) -> Self {
            self.on(
                prefix,
                CommandOutput {
                    code: Some(0),
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            )
        }

        pub fn fail(self, prefix: &str, code: i32, stderr: &str) -> Self {
            self.on(
                prefix,
                CommandOutput {
                    code: Some(code),
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
            )
        }

        pub fn calls(&self) -> Vec<RecordedCommand> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }

        pub fn lines(&self) -> Vec<String> {
            self.calls().iter().map(RecordedCommand::line).collect()
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(
            &self,
            program: &str,
            args: &[String],
            cwd: Option<&Path>,
            _timeout: Duration,
        ) -> Result<CommandOutput> {
            let call = RecordedCommand {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            };
            let line = call.line();
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(call);
            }
            let rules = self.rules.lock().map(|r| r.clone()).unwrap_or_default();
            let answer = rules
                .iter()
                .rev()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, out)| out.clone())
                .unwrap_or(CommandOutput {
                    code: Some(0),
                    ..Default::default()
                });
            Ok(answer)
        }
    }
}
