//! A small embeddable engine for running external commands.
//!
//! Commands are described by a name and a list of [`Arg`]s: strings are
//! passed verbatim, flags render as `-name`, and an optional filter, line
//! range and trailing [`Options`] map control what happens to captured
//! output. A [`CommandDescriptor`] validates all of that before anything is
//! spawned.
//!
//! A [`Session`] runs descriptors as child processes, either one at a time
//! (optionally capturing stdout and turning it into a [`Value`] through a
//! named objectifier) or chained into a [`Pipeline`] connected by OS pipes.
//! The [`Interpreter`] is a line-oriented front-end on top of a session.

mod builtin;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod env;
pub mod errors;
mod interpreter;
pub mod lexer;
pub mod logging;
mod lookup;
pub mod objectifier;
pub mod parser;
pub mod pipeline;
mod runner;
mod session;

pub use command::{Arg, ExitCode, Objectify, OptionValue, Options};
pub use config::{Config, Invocation};
pub use descriptor::CommandDescriptor;
pub use errors::{Result, ShellError, SyntaxError};
pub use interpreter::Interpreter;
pub use objectifier::{ObjectifierRegistry, Value};
pub use pipeline::{Pipeline, PipelineStatuses};
pub use runner::ProcessResult;
pub use session::Session;
