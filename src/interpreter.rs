use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use tracing::debug;

use crate::builtin::run_builtin;
use crate::command::ExitCode;
use crate::descriptor::CommandDescriptor;
use crate::errors::ShellError;
use crate::lexer;
use crate::parser::{self, Call};
use crate::session::Session;

/// Line-oriented front-end over a [`Session`].
///
/// Each line is a call (`ls :l`) or a pipeline of calls (`ls | wc :l`).
/// Captured values are printed, status failures are reported and turned
/// into the line's exit code.
pub struct Interpreter {
    session: Session,
}

impl Interpreter {
    /// Front-end over `session`.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The underlying session, mutably.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run one line, printing values to `stdout`.
    ///
    /// Status failures become the returned exit code; syntax and other
    /// errors are returned as errors.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write) -> Result<ExitCode> {
        let tokens = lexer::split_into_tokens(line)?;
        let mut calls = parser::construct_calls(tokens)?;
        debug!(calls = calls.len(), "parsed line");

        if calls.len() > 1 {
            let stages = calls
                .into_iter()
                .map(describe)
                .collect::<crate::errors::Result<Vec<_>>>()?;
            let statuses = self.session.pipe(stages)?;
            if !statuses.all_succeeded() {
                eprintln!("pipeline statuses: {:?}", statuses.statuses());
            }
            return Ok(statuses.tail());
        }
        match calls.pop() {
            Some(call) => self.execute_call(call, stdout),
            None => Ok(0),
        }
    }

    fn execute_call(&mut self, call: Call, stdout: &mut dyn Write) -> Result<ExitCode> {
        let descriptor = describe(call)?;
        let argv = descriptor.argv();
        let args: Vec<&str> = argv.iter().map(String::as_str).collect();
        if let Some(code) = run_builtin(&mut self.session, descriptor.exe(), &args, stdout) {
            return code;
        }

        match self.session.exec(&descriptor) {
            Ok(Some(value)) => {
                writeln!(stdout, "{value}")?;
                Ok(0)
            }
            Ok(None) => Ok(0),
            Err(ShellError::BadStatus(status)) => {
                eprintln!("{}", ShellError::BadStatus(status));
                Ok(status)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Interactive loop with line editing and history.
    pub fn repl(&mut self) -> Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        while !self.session.env().should_exit() {
            match rl.readline("> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(err) = self.execute_line(&line, &mut stdout) {
                        eprintln!("{err:#}");
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(self.session.env().exit_code.unwrap_or(0))
    }
}

fn describe(call: Call) -> crate::errors::Result<CommandDescriptor> {
    let descriptor = match call.block {
        Some(block) => CommandDescriptor::build_with(call.name, call.args, |opts| block.apply(opts))?,
        None => CommandDescriptor::build(call.name, call.args)?,
    };
    Ok(descriptor)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn run(interp: &mut Interpreter, line: &str) -> (ExitCode, String) {
        let mut out = Vec::new();
        let code = interp.execute_line(line, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn captured_value_is_printed() {
        let mut interp = Interpreter::new(Session::default());
        let (code, out) = run(&mut interp, r#"printf '"a\nb\n"' {}"#);
        assert_eq!(code, 0);
        assert_eq!(out, "[\"a\", \"b\"]\n");
    }

    #[test]
    fn block_selects_objectifier() {
        let mut interp = Interpreter::new(Session::default());
        let (_, out) = run(&mut interp, r#"printf '"a\nb\nc\n"' @0..1 {objectify=count}"#);
        assert_eq!(out, "2\n");
    }

    #[test]
    fn bad_status_becomes_exit_code() {
        let mut interp = Interpreter::new(Session::default());
        let (code, out) = run(&mut interp, "false");
        assert_eq!(code, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn syntax_errors_are_errors() {
        let mut interp = Interpreter::new(Session::default());
        let mut out = Vec::new();
        let err = interp.execute_line("ls @1 @2", &mut out).unwrap_err();
        assert!(err.to_string().contains("Only one range"), "{err}");
    }

    #[test]
    fn builtins_run_in_process() {
        let mut interp = Interpreter::new(Session::default());
        let (code, _) = run(&mut interp, "exit 4");
        assert_eq!(code, 4);
        assert!(interp.session().env().should_exit());
    }

    #[test]
    fn pipeline_reports_tail_status() {
        let mut interp = Interpreter::new(Session::default());
        let (code, _) = run(&mut interp, "true | false");
        assert_eq!(code, 1);
    }
}
