//! Named transforms from captured output lines to a [`Value`].

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::errors::{Result, ShellError};

/// Result of objectifying captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Nil,
    Int(i64),
    Text(String),
    Lines(Vec<String>),
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Lines(lines) => {
                let quoted: Vec<String> = lines.iter().map(|l| format!("{l:?}")).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", inner.join(", "))
            }
        }
    }
}

/// A transform over captured lines.
pub type ObjectifierFn = Box<dyn Fn(Vec<String>) -> Value>;

/// Mapping from objectifier name to transform, owned by one session.
pub struct ObjectifierRegistry {
    entries: BTreeMap<String, ObjectifierFn>,
}

impl ObjectifierRegistry {
    pub const SPLIT_LINES: &'static str = "split_lines";

    /// A registry with no transforms at all.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register (or replace) a transform.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<String>) -> Value + 'static,
    {
        let name = name.into();
        debug!(%name, "registering objectifier");
        self.entries.insert(name, Box::new(f));
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Run the named transform. Unknown names fail here, not earlier.
    pub fn apply(&self, name: &str, lines: Vec<String>) -> Result<Value> {
        let f = self
            .entries
            .get(name)
            .ok_or_else(|| ShellError::UnknownObjectifier(name.to_owned()))?;
        Ok(f(lines))
    }
}

impl Default for ObjectifierRegistry {
    /// Registry with the stock transforms:
    /// - `split_lines`: the lines as they are
    /// - `count`: number of lines
    /// - `words`: each line split on whitespace
    /// - `first`, `last`: a single line, or nil
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Self::SPLIT_LINES, Value::Lines);
        registry.register("count", |lines| Value::Int(lines.len() as i64));
        registry.register("words", |lines| {
            Value::List(
                lines
                    .iter()
                    .map(|l| Value::Lines(l.split_whitespace().map(str::to_owned).collect()))
                    .collect(),
            )
        });
        registry.register("first", |lines| {
            lines.into_iter().next().map_or(Value::Nil, Value::Text)
        });
        registry.register("last", |lines| {
            lines.into_iter().next_back().map_or(Value::Nil, Value::Text)
        });
        registry
    }
}

impl fmt::Debug for ObjectifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Split raw output into lines, dropping the separators (`\n` or `\r\n`).
pub fn split_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(output)
        .lines()
        .map(str::to_owned)
        .collect()
}
