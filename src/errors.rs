//! Crate-wide error types.
//!
//! Construction problems are reported as [`SyntaxError`] before anything is
//! spawned. Everything that can go wrong once a process exists is a
//! [`ShellError`] and is only raised after the child has been waited on.

use thiserror::Error;

use crate::command::ExitCode;

/// Malformed argument list for a command descriptor or pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Only one filter is allowed")]
    DuplicateFilter,

    #[error("Only one range is allowed")]
    DuplicateRange,

    #[error("invalid range: {lower}..{upper}")]
    InvalidRange { lower: usize, upper: usize },

    #[error("left over arguments: {0}")]
    LeftOverArguments(String),

    #[error("last argument should be a map of meta options: {0}")]
    ExpectedOptions(String),

    #[error("command arg should be a flag or a string: {0}")]
    BadArgument(String),

    #[error("stage `{0}` asks for captured output, which a pipeline stage cannot provide")]
    CaptureInPipeline(String),
}

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("<#BadStatus: {0}>")]
    BadStatus(ExitCode),

    #[error("no objectifier registered as `{0}`")]
    UnknownObjectifier(String),

    #[error("pipe length less than 2 (got {0})")]
    PipelineTooShort(usize),

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShellError {
    /// Exit status carried by a [`ShellError::BadStatus`].
    pub fn status(&self) -> Option<ExitCode> {
        match self {
            ShellError::BadStatus(status) => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShellError>;
