//! Chains of commands connected by OS pipes.

use crate::command::ExitCode;
use crate::descriptor::CommandDescriptor;
use crate::errors::{Result, ShellError, SyntaxError};

/// Two or more descriptors, each stage's stdout feeding the next stage's stdin.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<CommandDescriptor>,
}

impl Pipeline {
    /// Validate a list of stages. Nothing is spawned here.
    ///
    /// Fails with [`ShellError::PipelineTooShort`] for fewer than two stages,
    /// and rejects stages that ask for captured output.
    pub fn new(stages: Vec<CommandDescriptor>) -> Result<Self> {
        if stages.len() < 2 {
            return Err(ShellError::PipelineTooShort(stages.len()));
        }
        if let Some(stage) = stages.iter().find(|s| s.capture().is_some()) {
            return Err(SyntaxError::CaptureInPipeline(stage.command_line().to_owned()).into());
        }
        Ok(Self { stages })
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[CommandDescriptor] {
        &self.stages
    }

    /// Number of stages, at least two.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: a pipeline has at least two stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Exit status of every stage, in stage order.
///
/// Every stage runs to completion even if another one fails; the caller
/// decides what a failed stage means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatuses(Vec<ExitCode>);

impl PipelineStatuses {
    pub(crate) fn new(statuses: Vec<ExitCode>) -> Self {
        Self(statuses)
    }

    /// Every stage's status, head first.
    pub fn statuses(&self) -> &[ExitCode] {
        &self.0
    }

    /// Status of the last stage, which is what a POSIX shell reports.
    pub fn tail(&self) -> ExitCode {
        self.0.last().copied().unwrap_or(0)
    }

    /// Whether every stage exited with 0.
    pub fn all_succeeded(&self) -> bool {
        self.0.iter().all(|&s| s == 0)
    }

    /// Turn a failed last stage into [`ShellError::BadStatus`].
    pub fn check(&self) -> Result<()> {
        match self.tail() {
            0 => Ok(()),
            status => Err(ShellError::BadStatus(status)),
        }
    }
}
