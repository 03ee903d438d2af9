use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::command::ExitCode;
use crate::session::Session;

/// Commands handled by the front-end itself instead of a child process.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and work on the
/// [`Session`] directly, so `cd` changes where later commands start.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    fn name() -> &'static str;

    /// Return value follows shell conventions: 0 for success, non-zero for error.
    fn execute(self, session: &mut Session, stdout: &mut dyn Write) -> Result<ExitCode>;
}

fn try_builtin<T: BuiltinCommand>(
    session: &mut Session,
    name: &str,
    args: &[&str],
    stdout: &mut dyn Write,
) -> Option<Result<ExitCode>> {
    if name != T::name() {
        return None;
    }
    Some(match T::from_args(&[name], args) {
        Ok(cmd) => cmd.execute(session, stdout),
        Err(EarlyExit { output, status }) => stdout
            .write_all(output.as_bytes())
            .map(|_| if status.is_err() { 1 } else { 0 })
            .map_err(Into::into),
    })
}

/// Run `name` as a builtin, or return `None` if there is no such builtin.
pub(crate) fn run_builtin(
    session: &mut Session,
    name: &str,
    args: &[&str],
    stdout: &mut dyn Write,
) -> Option<Result<ExitCode>> {
    try_builtin::<Cd>(session, name, args, stdout)
        .or_else(|| try_builtin::<Exit>(session, name, args, stdout))
        .or_else(|| try_builtin::<Objectifiers>(session, name, args, stdout))
}

#[derive(FromArgs)]
/// Change the directory later commands are started in.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, session: &mut Session, _stdout: &mut dyn Write) -> Result<ExitCode> {
        let env = session.env_mut();
        let home = || {
            env.get_var("HOME")
                .ok_or_else(|| anyhow::anyhow!("cd: no target and HOME not set"))
        };
        let target = match self.target.as_deref() {
            None | Some("") | Some("~") => PathBuf::from(home()?),
            Some(t) => match t.strip_prefix("~/") {
                Some(rest) => PathBuf::from(home()?).join(rest),
                None => PathBuf::from(t),
            },
        };

        let new_dir = env.current_dir.join(target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;
        if !canonical.is_dir() {
            anyhow::bail!("cd: not a directory: {}", canonical.display());
        }
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the interactive loop.
pub struct Exit {
    #[argh(positional, default = "0")]
    /// exit status to report, 0 when omitted.
    pub code: ExitCode,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, session: &mut Session, _stdout: &mut dyn Write) -> Result<ExitCode> {
        session.env_mut().exit_code = Some(self.code);
        Ok(self.code)
    }
}

#[derive(FromArgs)]
/// List the objectifiers known to this session.
pub struct Objectifiers {}

impl BuiltinCommand for Objectifiers {
    fn name() -> &'static str {
        "objectifiers"
    }

    fn execute(self, session: &mut Session, stdout: &mut dyn Write) -> Result<ExitCode> {
        for name in session.objectifiers().names() {
            writeln!(stdout, "{name}")?;
        }
        Ok(0)
    }
}
