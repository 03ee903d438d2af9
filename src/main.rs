use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use shell_exec::{Config, Interpreter, Invocation, Session, logging};

#[derive(FromArgs)]
/// Run external commands from a small call syntax, e.g. `ls :lh r/->/ {}`.
struct Args {
    #[argh(option, short = 'c')]
    /// run a single line and exit with its status.
    command: Option<String>,

    #[argh(switch)]
    /// spawn executables directly with an argument vector instead of through the shell.
    direct: bool,

    #[argh(option)]
    /// shell used to interpret command lines (default: $SHELL_EXEC_SHELL or /bin/sh).
    shell: Option<PathBuf>,

    #[argh(option)]
    /// log level: error, warn, info, debug or trace (default: $SHELL_EXEC_LOG or warn).
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    logging::init_logging(args.log_level.as_deref())?;

    let mut config = Config::from_env().context("invalid configuration")?;
    if args.direct {
        config.invocation = Invocation::Direct;
    }
    if let Some(shell) = args.shell {
        config.shell = shell;
    }

    let mut interpreter = Interpreter::new(Session::new(config));
    let code = match args.command {
        Some(line) => interpreter.execute_line(&line, &mut std::io::stdout())?,
        None => interpreter.repl()?,
    };
    std::process::exit(code)
}
