use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

use crate::command::ExitCode;

/// Per-session view of the process environment handed to every child.
///
/// The environment contains:
/// - `vars`: variables visible to spawned commands (and used for `PATH` lookup).
/// - `current_dir`: the working directory commands are started in.
/// - `exit_code`: set once the front-end has been asked to stop.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub exit_code: Option<ExitCode>,
}

impl Environment {
    /// Snapshot the current process variables and working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            exit_code: None,
        }
    }

    /// Get the value of a variable, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set a variable for every later child.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Whether an exit was requested.
    pub fn should_exit(&self) -> bool {
        self.exit_code.is_some()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
