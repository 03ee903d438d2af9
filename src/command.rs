use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::process::ExitStatus;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Status reported by a shell when the executable could not be found.
pub const COMMAND_NOT_FOUND: ExitCode = 127;

/// One raw argument handed to a command, before classification.
///
/// The order of an argument list matters: positional strings and flags come
/// first, then at most one [`Filter`] and one index/range in any order, then an
/// optional trailing [`Options`] map.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Literal argument, rendered verbatim.
    Str(String),
    /// Symbolic flag, rendered as `-<name>`.
    Flag(String),
    /// Nested sequence of strings and flags, flattened in place.
    List(Vec<Arg>),
    /// Line filter applied to captured output.
    Filter(Filter),
    /// Single line index into captured output.
    Index(usize),
    /// Inclusive line range into captured output.
    Range { lower: usize, upper: usize },
    /// Trailing configuration map.
    Options(Options),
}

impl Arg {
    /// Shorthand for [`Arg::Flag`].
    pub fn flag(name: impl Into<String>) -> Self {
        Arg::Flag(name.into())
    }

    /// Nested list of arguments, flattened when the descriptor is built.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arg>,
    {
        Arg::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "{s:?}"),
            Arg::Flag(name) => write!(f, ":{name}"),
            Arg::List(items) => {
                let inner: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", inner.join(", "))
            }
            Arg::Filter(filter) => write!(f, "/{}/", filter.as_str()),
            Arg::Index(i) => write!(f, "{i}"),
            Arg::Range { lower, upper } => write!(f, "{lower}..{upper}"),
            Arg::Options(opts) => write!(f, "{opts}"),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_owned())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

impl From<Regex> for Arg {
    fn from(re: Regex) -> Self {
        Arg::Filter(Filter(re))
    }
}

impl From<usize> for Arg {
    fn from(i: usize) -> Self {
        Arg::Index(i)
    }
}

impl From<RangeInclusive<usize>> for Arg {
    fn from(r: RangeInclusive<usize>) -> Self {
        Arg::Range {
            lower: *r.start(),
            upper: *r.end(),
        }
    }
}

impl From<Options> for Arg {
    fn from(opts: Options) -> Self {
        Arg::Options(opts)
    }
}

impl From<Vec<Arg>> for Arg {
    fn from(items: Vec<Arg>) -> Self {
        Arg::List(items)
    }
}

/// Regex filter over captured lines. Two filters are equal when their
/// patterns are.
#[derive(Debug, Clone)]
pub struct Filter(pub Regex);

impl Filter {
    /// The regex source.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether `line` passes the filter.
    pub fn is_match(&self, line: &str) -> bool {
        self.0.is_match(line)
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Line selection over captured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Index(usize),
    /// Inclusive bounds, `upper >= lower` by construction.
    Range { lower: usize, upper: usize },
}

impl Selection {
    /// Keep only the selected lines. Out-of-bounds selections are clipped.
    pub fn apply(&self, lines: Vec<String>) -> Vec<String> {
        let (lower, upper) = match *self {
            Selection::Index(i) => (i, i),
            Selection::Range { lower, upper } => (lower, upper),
        };
        lines
            .into_iter()
            .skip(lower)
            .take(upper.saturating_sub(lower).saturating_add(1))
            .collect()
    }
}

/// Value of a meta option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// How captured output is turned into a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objectify {
    /// Plain list of lines.
    Lines,
    /// Run the lines through a registered objectifier.
    Named(String),
}

/// Meta options of a command.
///
/// This is a map, so setting a key twice keeps the last value and the order
/// in which different keys were set never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    pub const OBJECTIFY: &'static str = "objectify";

    /// An empty map: output is not captured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Whether no option has been set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Capture output as plain lines.
    pub fn objectify(&mut self) -> &mut Self {
        self.set(Self::OBJECTIFY, true)
    }

    /// Capture output and convert it with the named objectifier.
    pub fn objectify_as(&mut self, name: impl Into<String>) -> &mut Self {
        self.set(Self::OBJECTIFY, OptionValue::Text(name.into()))
    }

    /// Resolve the `objectify` option. `None` means output is not captured.
    pub fn capture(&self) -> Option<Objectify> {
        match self.get(Self::OBJECTIFY)? {
            OptionValue::Bool(true) => Some(Objectify::Lines),
            OptionValue::Bool(false) => None,
            OptionValue::Text(name) => Some(Objectify::Named(name.clone())),
        }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// Translate an exit status into a shell-style exit code.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}
