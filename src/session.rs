use std::process::Stdio;

use tracing::info;

use crate::command::{Arg, Options};
use crate::config::Config;
use crate::descriptor::CommandDescriptor;
use crate::env::Environment;
use crate::errors::Result;
use crate::objectifier::{ObjectifierRegistry, Value};
use crate::pipeline::{Pipeline, PipelineStatuses};
use crate::runner::{Launcher, ProcessResult};

/// Execution context for commands and pipelines.
///
/// A session owns the [`Environment`] children are started in, the launch
/// [`Config`] and the [`ObjectifierRegistry`] used to turn captured output
/// into values. Nothing is process-global.
///
/// Example
/// ```
/// use shell_exec::{Arg, Session, Value};
/// let session = Session::default();
/// let value = session
///     .run_with("printf", vec![Arg::from("'a\\nb\\n'")], |_| {})
///     .unwrap();
/// assert_eq!(value, Some(Value::Lines(vec!["a".into(), "b".into()])));
/// ```
#[derive(Debug)]
pub struct Session {
    env: Environment,
    config: Config,
    objectifiers: ObjectifierRegistry,
}

impl Session {
    /// Session over the current process environment with the stock objectifiers.
    pub fn new(config: Config) -> Self {
        Self::with_parts(Environment::new(), config, ObjectifierRegistry::default())
    }

    /// Session from explicitly built parts.
    pub fn with_parts(env: Environment, config: Config, objectifiers: ObjectifierRegistry) -> Self {
        info!(?config, "session started");
        Self {
            env,
            config,
            objectifiers,
        }
    }

    /// Environment children are started in.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Mutable environment, e.g. to change variables or the working directory.
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Launch configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Objectifiers available to this session.
    pub fn objectifiers(&self) -> &ObjectifierRegistry {
        &self.objectifiers
    }

    /// Add a named objectifier, visible to every later command of this session.
    pub fn register_objectifier<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<String>) -> Value + 'static,
    {
        self.objectifiers.register(name, f);
    }

    /// Build a descriptor. Construction errors surface here, before any spawn.
    pub fn command(&self, name: &str, args: Vec<Arg>) -> Result<CommandDescriptor> {
        Ok(CommandDescriptor::build(name, args)?)
    }

    /// Build a capturing descriptor; see [`CommandDescriptor::build_with`].
    pub fn command_with<F>(&self, name: &str, args: Vec<Arg>, configure: F) -> Result<CommandDescriptor>
    where
        F: FnOnce(&mut Options),
    {
        Ok(CommandDescriptor::build_with(name, args, configure)?)
    }

    /// Run one command and wait for it.
    ///
    /// Returns `None` when output is not captured, the objectified output
    /// otherwise. A non-zero exit status is an error.
    pub fn exec(&self, descriptor: &CommandDescriptor) -> Result<Option<Value>> {
        self.spawn_and_wait(descriptor)?
            .into_value(descriptor, &self.objectifiers)
    }

    /// Like [`Session::exec`] but hands back the raw process record.
    pub fn spawn_and_wait(&self, descriptor: &CommandDescriptor) -> Result<ProcessResult> {
        self.launcher().run(descriptor)
    }

    /// Build and [`exec`](Session::exec) a command in one step.
    pub fn run(&self, name: &str, args: Vec<Arg>) -> Result<Option<Value>> {
        self.exec(&self.command(name, args)?)
    }

    /// Build and [`exec`](Session::exec) a capturing command in one step.
    pub fn run_with<F>(&self, name: &str, args: Vec<Arg>, configure: F) -> Result<Option<Value>>
    where
        F: FnOnce(&mut Options),
    {
        self.exec(&self.command_with(name, args, configure)?)
    }

    /// Build and run a pipeline on the inherited stdin/stdout.
    pub fn pipe(&self, stages: Vec<CommandDescriptor>) -> Result<PipelineStatuses> {
        self.exec_pipeline(&Pipeline::new(stages)?)
    }

    /// Run a validated pipeline on the inherited stdin/stdout.
    pub fn exec_pipeline(&self, pipeline: &Pipeline) -> Result<PipelineStatuses> {
        self.exec_pipeline_with_io(pipeline, Stdio::inherit(), Stdio::inherit())
    }

    /// Run a pipeline whose head reads `stdin` and whose tail writes `stdout`.
    pub fn exec_pipeline_with_io(
        &self,
        pipeline: &Pipeline,
        stdin: Stdio,
        stdout: Stdio,
    ) -> Result<PipelineStatuses> {
        self.launcher().run_pipeline(pipeline, stdin, stdout)
    }

    fn launcher(&self) -> Launcher<'_> {
        Launcher {
            config: &self.config,
            env: &self.env,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::errors::{ShellError, SyntaxError};
    use regex::Regex;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn success_without_capture_returns_nothing() {
        let session = Session::default();
        assert_eq!(session.run("true", vec![]).unwrap(), None);
    }

    #[test]
    fn non_zero_status_is_reported_exactly() {
        let session = Session::default();
        let err = session.run("exit 3", vec![]).unwrap_err();
        assert_eq!(err.status(), Some(3));

        let err = session.run_with("exit 5", vec![], |_| {}).unwrap_err();
        assert_eq!(err.status(), Some(5));
    }

    #[test]
    fn plain_capture_returns_lines() {
        let session = Session::default();
        let value = session
            .run_with("printf", vec!["'a\\nb\\nc\\n'".into()], |_| {})
            .unwrap();
        assert_eq!(value, Some(Value::Lines(lines(&["a", "b", "c"]))));
    }

    #[test]
    fn named_objectifier_and_filter() {
        let session = Session::default();
        let re = Regex::new("^b").unwrap();
        let value = session
            .run_with(
                "printf",
                vec!["'a\\nba\\nbb\\nc\\n'".into(), re.into()],
                |opts| {
                    opts.objectify_as("count");
                },
            )
            .unwrap();
        assert_eq!(value, Some(Value::Int(2)));
    }

    #[test]
    fn range_selects_captured_lines() {
        let session = Session::default();
        let value = session
            .run_with("printf", vec!["'a\\nb\\nc\\n'".into(), Arg::from(1usize..=2)], |_| {})
            .unwrap();
        assert_eq!(value, Some(Value::Lines(lines(&["b", "c"]))));
    }

    #[test]
    fn unknown_objectifier_fails_after_running() {
        let session = Session::default();
        let descriptor = session
            .command_with("echo", vec!["x".into()], |opts| {
                opts.objectify_as("no_such_thing");
            })
            .unwrap();
        let err = session.exec(&descriptor).unwrap_err();
        assert!(matches!(err, ShellError::UnknownObjectifier(ref n) if n == "no_such_thing"));
    }

    #[test]
    fn registered_objectifier_is_used() {
        let mut session = Session::default();
        session.register_objectifier("joined", |lines| Value::Text(lines.join("+")));
        let value = session
            .run_with("printf", vec!["'x\\ny\\n'".into()], |opts| {
                opts.objectify_as("joined");
            })
            .unwrap();
        assert_eq!(value, Some(Value::Text("x+y".into())));
    }

    #[test]
    fn construction_errors_come_first() {
        let session = Session::default();
        let err = session
            .run("touch", vec!["/should/never/exist".into(), Arg::Index(1), Arg::Index(2)])
            .unwrap_err();
        assert!(matches!(err, ShellError::Syntax(SyntaxError::DuplicateRange)));
    }

    #[test]
    fn children_start_in_session_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = Session::default();
        session.env_mut().current_dir = tmp.path().to_path_buf();
        let value = session.run_with("pwd", vec![], |_| {}).unwrap();
        let expected = std::fs::canonicalize(tmp.path()).unwrap();
        match value {
            Some(Value::Lines(out)) => {
                assert_eq!(std::fs::canonicalize(&out[0]).unwrap(), expected)
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn pipeline_needs_two_stages() {
        let session = Session::default();
        let only = session.command("true", vec![]).unwrap();
        let err = session.pipe(vec![only]).unwrap_err();
        assert!(matches!(err, ShellError::PipelineTooShort(1)));
    }
}
