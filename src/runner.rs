//! Turning descriptors into OS processes.
//!
//! Pipe endpoints are owned by `std::process` handles: a `Stdio` handed to a
//! [`Command`] stays open in this process until the `Command` is dropped, so
//! every `Command` is dropped right after `spawn`. A reader downstream only
//! sees end-of-stream once no copy of the write end is left here.

use std::io::Read;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::command::{COMMAND_NOT_FOUND, ExitCode, Objectify, exit_code};
use crate::config::{Config, Invocation};
use crate::descriptor::CommandDescriptor;
use crate::env::Environment;
use crate::errors::{Result, ShellError};
use crate::lookup::find_command_path;
use crate::objectifier::{ObjectifierRegistry, Value, split_lines};
use crate::pipeline::{Pipeline, PipelineStatuses};

/// Runtime record of one spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when nothing could be spawned (status 127).
    pub pid: Option<u32>,
    pub status: ExitCode,
    /// Raw captured lines, before filtering and objectifying.
    pub output: Option<Vec<String>>,
}

impl ProcessResult {
    fn not_found() -> Self {
        Self {
            pid: None,
            status: COMMAND_NOT_FOUND,
            output: None,
        }
    }

    /// Enforce the exit-status contract and objectify captured output.
    ///
    /// A non-zero status drops whatever was captured.
    pub fn into_value(
        self,
        descriptor: &CommandDescriptor,
        objectifiers: &ObjectifierRegistry,
    ) -> Result<Option<Value>> {
        if self.status != 0 {
            if let Some(lines) = &self.output {
                debug!(discarded = lines.len(), "dropping output of failed command");
            }
            return Err(ShellError::BadStatus(self.status));
        }
        let Some(lines) = self.output else {
            return Ok(None);
        };
        let lines = descriptor.select_lines(lines);
        let value = match descriptor.capture() {
            Some(Objectify::Named(name)) => objectifiers.apply(&name, lines)?,
            Some(Objectify::Lines) | None => Value::Lines(lines),
        };
        Ok(Some(value))
    }
}

/// Spawns descriptors according to a session's [`Config`] and [`Environment`].
pub(crate) struct Launcher<'a> {
    pub config: &'a Config,
    pub env: &'a Environment,
}

impl Launcher<'_> {
    fn command(&self, descriptor: &CommandDescriptor) -> Option<Command> {
        let mut cmd = match self.config.invocation {
            Invocation::Shell => {
                if !self.shell_can_find(descriptor.exe()) {
                    return None;
                }
                let mut cmd = Command::new(&self.config.shell);
                cmd.arg("-c").arg(descriptor.command_line());
                cmd
            }
            Invocation::Direct => {
                let search_paths = self.env.get_var("PATH").unwrap_or_default();
                let exe = find_command_path(
                    search_paths.as_ref(),
                    &self.env.current_dir,
                    descriptor.exe(),
                )?;
                let mut cmd = Command::new(exe);
                cmd.args(descriptor.argv());
                cmd
            }
        };
        cmd.envs(self.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.env.current_dir);
        Some(cmd)
    }

    /// Whether the shell would find `name` to run.
    ///
    /// Names that are shell syntax (`exit 3`, `a; b`) or shell builtins are
    /// left to the shell, and so is everything when `PATH` is unset.
    fn shell_can_find(&self, name: &str) -> bool {
        if is_shell_syntax(name) || SHELL_BUILTINS.contains(&name) {
            return true;
        }
        let Some(search_paths) = self.env.get_var("PATH") else {
            return true;
        };
        find_command_path(search_paths.as_ref(), &self.env.current_dir, name).is_some()
    }

    /// Spawn `descriptor` with the given standard streams.
    ///
    /// Returns `Ok(None)` when the executable cannot be found, or cannot be
    /// started in direct mode; that has already been reported on stderr and
    /// counts as exit status 127.
    fn spawn(
        &self,
        descriptor: &CommandDescriptor,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<Option<Child>> {
        let Some(mut cmd) = self.command(descriptor) else {
            report_not_found(descriptor);
            return Ok(None);
        };
        cmd.stdin(stdin).stdout(stdout);
        let spawned = cmd.spawn();
        // Closes this process's copies of the stage's stdin/stdout.
        drop(cmd);

        match spawned {
            Ok(child) => {
                debug!(pid = child.id(), cmd = descriptor.command_line(), "spawned");
                Ok(Some(child))
            }
            Err(err) if self.config.invocation == Invocation::Direct => {
                debug!(error = %err, "direct spawn failed");
                report_not_found(descriptor);
                Ok(None)
            }
            Err(source) => Err(ShellError::Spawn {
                command: descriptor.command_line().to_owned(),
                source,
            }),
        }
    }

    /// Run a single command to completion.
    pub fn run(&self, descriptor: &CommandDescriptor) -> Result<ProcessResult> {
        let capture = descriptor.capture().is_some();
        let stdout = if capture {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };

        let Some(mut child) = self.spawn(descriptor, Stdio::inherit(), stdout)? else {
            return Ok(ProcessResult::not_found());
        };
        let pid = child.id();

        let read = child.stdout.take().map(|mut out| {
            let mut buf = Vec::new();
            // `out` is dropped at the end of this closure, closing the read end.
            out.read_to_end(&mut buf).map(|_| buf)
        });

        // Always reap the child, even if reading failed.
        let status = exit_code(child.wait()?);
        debug!(pid, status, "process exited");

        let output = match read {
            Some(bytes) => Some(split_lines(&bytes?)),
            None => None,
        };
        Ok(ProcessResult {
            pid: Some(pid),
            status,
            output,
        })
    }

    /// Run every stage of `pipeline`, head reading `stdin` and tail writing
    /// `stdout`, and wait for all of them.
    pub fn run_pipeline(
        &self,
        pipeline: &Pipeline,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<PipelineStatuses> {
        let stages = pipeline.stages();
        let last = stages.len() - 1;
        let mut head_in = Some(stdin);
        let mut tail_out = Some(stdout);
        // Read end of the pipe feeding the next stage.
        let mut current: Option<Stdio> = None;
        let mut children: Vec<Option<Child>> = Vec::with_capacity(stages.len());

        for (index, descriptor) in stages.iter().enumerate() {
            let input = if index == 0 {
                head_in.take()
            } else {
                current.take()
            }
            .unwrap_or_else(Stdio::null);
            let output = if index == last {
                tail_out.take().unwrap_or_else(Stdio::inherit)
            } else {
                Stdio::piped()
            };

            match self.spawn(descriptor, input, output) {
                Ok(Some(mut child)) => {
                    if index != last {
                        current = child.stdout.take().map(Stdio::from);
                    }
                    children.push(Some(child));
                }
                Ok(None) => {
                    // Behaves like a stage that exited at once: the next
                    // stage reads end-of-stream.
                    if index != last {
                        current = Some(Stdio::null());
                    }
                    children.push(None);
                }
                Err(err) => {
                    warn!(stage = index, error = %err, "pipeline stage failed to spawn");
                    drop(current.take());
                    abort_started(children);
                    return Err(err);
                }
            }
        }

        let statuses = wait_all(children)?;
        debug!(?statuses, "pipeline finished");
        Ok(PipelineStatuses::new(statuses))
    }
}

/// Wait for every child in order; children that never started count as 127.
fn wait_all(children: Vec<Option<Child>>) -> Result<Vec<ExitCode>> {
    let mut statuses = Vec::with_capacity(children.len());
    let mut first_err = None;
    for child in children {
        let status = match child {
            Some(mut child) => match child.wait() {
                Ok(status) => exit_code(status),
                Err(err) => {
                    warn!(pid = child.id(), error = %err, "wait failed");
                    first_err.get_or_insert(err);
                    -1
                }
            },
            None => COMMAND_NOT_FOUND,
        };
        statuses.push(status);
    }
    match first_err {
        Some(err) => Err(err.into()),
        None => Ok(statuses),
    }
}

/// Kill and reap stages started before a later stage failed to spawn.
///
/// A head stage reading a terminal would otherwise never see end-of-stream.
fn abort_started(children: Vec<Option<Child>>) {
    for mut child in children.into_iter().flatten() {
        let pid = child.id();
        if let Err(err) = child.kill() {
            warn!(pid, error = %err, "kill failed");
        }
        match child.wait() {
            Ok(status) => debug!(pid, status = exit_code(status), "aborted stage reaped"),
            Err(err) => warn!(pid, error = %err, "wait failed"),
        }
    }
}

/// Builtins of a POSIX shell that may have no executable on `PATH`.
const SHELL_BUILTINS: &[&str] = &[
    ".", ":", "alias", "break", "cd", "command", "continue", "echo", "eval", "exec", "exit",
    "export", "false", "getopts", "hash", "kill", "local", "printf", "pwd", "read", "readonly",
    "return", "set", "shift", "source", "test", "times", "trap", "true", "type", "ulimit",
    "umask", "unalias", "unset", "wait",
];

fn is_shell_syntax(name: &str) -> bool {
    name.chars()
        .any(|c| c.is_whitespace() || ";&|<>()$`\\\"'*?[]{}=~#!".contains(c))
}

fn report_not_found(descriptor: &CommandDescriptor) {
    eprintln!("{}: command not found", descriptor.exe());
}
