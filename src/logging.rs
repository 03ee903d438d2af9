//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `SHELL_EXEC_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `warn`
//!
//! Logs go to stderr so that command output on stdout stays untouched.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::fmt;

pub const LOG_VAR: &str = "SHELL_EXEC_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<&str>) -> Result<()> {
    let level = match cli_level {
        Some(s) => parse_level_str(s).ok_or_else(|| anyhow!("unknown log level `{s}`"))?,
        None => std::env::var(LOG_VAR)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::WARN),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_loosely() {
        assert_eq!(parse_level_str(" Debug "), Some(Level::DEBUG));
        assert_eq!(parse_level_str("warning"), Some(Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }
}
