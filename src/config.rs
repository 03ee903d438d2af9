use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;

/// How a rendered command is turned into a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invocation {
    /// Hand the whole command line to `<shell> -c`. Arguments are not
    /// escaped, so the shell will interpret quotes, globs and redirections.
    #[default]
    Shell,
    /// Spawn the executable directly with an explicit argument vector.
    Direct,
}

impl FromStr for Invocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shell" | "sh" => Ok(Invocation::Shell),
            "direct" | "argv" => Ok(Invocation::Direct),
            other => Err(anyhow!("unknown invocation mode `{other}` (expected shell or direct)")),
        }
    }
}

/// Process launch settings of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub invocation: Invocation,
    /// Interpreter used in [`Invocation::Shell`] mode.
    pub shell: PathBuf,
}

impl Config {
    pub const SHELL_VAR: &'static str = "SHELL_EXEC_SHELL";
    pub const MODE_VAR: &'static str = "SHELL_EXEC_MODE";

    /// Defaults overridden by `SHELL_EXEC_SHELL` and `SHELL_EXEC_MODE`.
    ///
    /// An unparsable mode is an error rather than a silent fallback.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(shell) = lookup(Self::SHELL_VAR).filter(|s| !s.is_empty()) {
            config.shell = PathBuf::from(shell);
        }
        if let Some(mode) = lookup(Self::MODE_VAR) {
            config.invocation = mode.parse()?;
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            invocation: Invocation::Shell,
            shell: PathBuf::from("/bin/sh"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.invocation, Invocation::Shell);
    }

    #[test]
    fn env_overrides() {
        let config = Config::from_lookup(lookup(&[
            (Config::SHELL_VAR, "/usr/bin/bash"),
            (Config::MODE_VAR, "Direct"),
        ]))
        .unwrap();
        assert_eq!(config.shell, PathBuf::from("/usr/bin/bash"));
        assert_eq!(config.invocation, Invocation::Direct);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let err = Config::from_lookup(lookup(&[(Config::MODE_VAR, "fork")])).unwrap_err();
        assert!(err.to_string().contains("fork"));
    }
}
