//! Validated, immutable description of one command invocation.
//!
//! A [`CommandDescriptor`] is built from a raw [`Arg`] list. Building it only
//! classifies and renders the arguments; nothing is spawned until the
//! descriptor is handed to a [`Session`](crate::Session).

use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::command::{Arg, Filter, Objectify, Options, Selection};
use crate::errors::SyntaxError;

/// A rendered positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Literal(String),
    Flag(String),
}

impl Word {
    /// Render as it appears on the command line: flags get a leading `-`,
    /// literals are used verbatim (no escaping).
    pub fn render(&self) -> String {
        match self {
            Word::Literal(s) => s.clone(),
            Word::Flag(name) => format!("-{name}"),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandDescriptor {
    exe: String,
    words: Vec<Word>,
    filter: Option<Filter>,
    selection: Option<Selection>,
    opts: Options,
    cmd: String,
}

impl CommandDescriptor {
    /// Build a descriptor from a command name and its raw arguments.
    pub fn build(exe: impl Into<String>, args: Vec<Arg>) -> Result<Self, SyntaxError> {
        Self::construct(exe.into(), args, None::<fn(&mut Options)>)
    }

    /// Build a descriptor and run a configuration callback over its options.
    ///
    /// Passing a callback at all turns on plain capture first, so an empty
    /// callback means "give me the lines"; the callback may then override it.
    pub fn build_with<F>(
        exe: impl Into<String>,
        args: Vec<Arg>,
        configure: F,
    ) -> Result<Self, SyntaxError>
    where
        F: FnOnce(&mut Options),
    {
        Self::construct(exe.into(), args, Some(configure))
    }

    fn construct<F>(exe: String, args: Vec<Arg>, configure: Option<F>) -> Result<Self, SyntaxError>
    where
        F: FnOnce(&mut Options),
    {
        let parsed = parse_args(args)?;
        let mut opts = parsed.opts;
        if let Some(configure) = configure {
            opts.objectify();
            configure(&mut opts);
        }

        let words = parsed
            .positional
            .into_iter()
            .map(|arg| match arg {
                Arg::Str(s) => Ok(Word::Literal(s)),
                Arg::Flag(name) => Ok(Word::Flag(name)),
                other => Err(SyntaxError::BadArgument(other.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cmd = build_command_string(&exe, &words);
        trace!(%cmd, "built command descriptor");
        Ok(Self {
            exe,
            words,
            filter: parsed.filter,
            selection: parsed.selection,
            opts,
            cmd,
        })
    }

    /// Name of the executable.
    pub fn exe(&self) -> &str {
        &self.exe
    }

    /// Flattened positional words.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Rendered arguments, without the executable.
    pub fn argv(&self) -> Vec<String> {
        self.words.iter().map(Word::render).collect()
    }

    /// The full command line, as handed to the system shell.
    pub fn command_line(&self) -> &str {
        &self.cmd
    }

    /// Regex filter over captured lines, if any.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Index or range over captured lines, if any.
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Meta options after the configuration callback ran.
    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Whether and how output should be captured.
    pub fn capture(&self) -> Option<Objectify> {
        self.opts.capture()
    }

    /// Apply the filter, then the line selection, to captured lines.
    pub fn select_lines(&self, lines: Vec<String>) -> Vec<String> {
        let lines = match &self.filter {
            Some(filter) => lines.into_iter().filter(|l| filter.is_match(l)).collect(),
            None => lines,
        };
        match self.selection {
            Some(selection) => selection.apply(lines),
            None => lines,
        }
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cmd)
    }
}

struct ParsedArgs {
    positional: Vec<Arg>,
    filter: Option<Filter>,
    selection: Option<Selection>,
    opts: Options,
}

fn parse_args(args: Vec<Arg>) -> Result<ParsedArgs, SyntaxError> {
    let mut args: VecDeque<Arg> = args.into();

    let mut positional = Vec::new();
    while let Some(Arg::Str(_) | Arg::Flag(_) | Arg::List(_)) = args.front() {
        if let Some(arg) = args.pop_front() {
            flatten_into(arg, &mut positional);
        }
    }

    let mut filter = None;
    let mut selection = None;
    loop {
        match args.front() {
            Some(Arg::Filter(_)) => {
                if filter.is_some() {
                    return Err(SyntaxError::DuplicateFilter);
                }
                if let Some(Arg::Filter(f)) = args.pop_front() {
                    filter = Some(f);
                }
            }
            Some(Arg::Index(i)) => {
                if selection.is_some() {
                    return Err(SyntaxError::DuplicateRange);
                }
                selection = Some(Selection::Index(*i));
                args.pop_front();
            }
            Some(Arg::Range { lower, upper }) => {
                if selection.is_some() {
                    return Err(SyntaxError::DuplicateRange);
                }
                let (lower, upper) = (*lower, *upper);
                if upper < lower {
                    return Err(SyntaxError::InvalidRange { lower, upper });
                }
                selection = Some(Selection::Range { lower, upper });
                args.pop_front();
            }
            _ => break,
        }
    }

    // meta options are optional
    let opts = match args.pop_front() {
        None => Options::new(),
        Some(Arg::Options(opts)) => opts,
        Some(other) => return Err(SyntaxError::ExpectedOptions(other.to_string())),
    };

    if !args.is_empty() {
        let left: Vec<String> = args.iter().map(ToString::to_string).collect();
        return Err(SyntaxError::LeftOverArguments(left.join(",")));
    }

    Ok(ParsedArgs {
        positional,
        filter,
        selection,
        opts,
    })
}

fn flatten_into(arg: Arg, out: &mut Vec<Arg>) {
    match arg {
        Arg::List(items) => items.into_iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other),
    }
}

fn build_command_string(exe: &str, words: &[Word]) -> String {
    if words.is_empty() {
        return exe.to_owned();
    }
    let rendered: Vec<String> = words.iter().map(Word::render).collect();
    format!("{} {}", exe, rendered.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn re(pattern: &str) -> Arg {
        Arg::from(Regex::new(pattern).unwrap())
    }

    #[test]
    fn renders_flags_and_literals() {
        let d = CommandDescriptor::build("ls", vec![Arg::flag("lh"), "~".into()]).unwrap();
        assert_eq!(d.command_line(), "ls -lh ~");
        assert_eq!(d.argv(), vec!["-lh".to_string(), "~".to_string()]);
        assert_eq!(d.capture(), None);
    }

    #[test]
    fn bare_command_has_no_trailing_space() {
        let d = CommandDescriptor::build("pwd", vec![]).unwrap();
        assert_eq!(d.command_line(), "pwd");
    }

    #[test]
    fn nested_lists_are_flattened_in_place() {
        let nested = CommandDescriptor::build(
            "ls",
            vec![
                "a".into(),
                Arg::list(vec![Arg::flag("l"), Arg::list(vec!["b"])]),
                "c".into(),
            ],
        )
        .unwrap();
        let flat = CommandDescriptor::build(
            "ls",
            vec!["a".into(), Arg::flag("l"), "b".into(), "c".into()],
        )
        .unwrap();
        assert_eq!(nested, flat);
        assert_eq!(nested.command_line(), "ls a -l b c");
    }

    #[test]
    fn filter_and_range_in_either_order() {
        let a = CommandDescriptor::build("ls", vec![re("x"), Arg::from(1usize..=2)]).unwrap();
        let b = CommandDescriptor::build("ls", vec![Arg::from(1usize..=2), re("x")]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.selection(), Some(Selection::Range { lower: 1, upper: 2 }));
        assert_eq!(a.filter().map(Filter::as_str), Some("x"));
    }

    #[test]
    fn duplicate_filter_is_rejected() {
        let err = CommandDescriptor::build("ls", vec![re("a"), Arg::Index(1), re("b")]).unwrap_err();
        assert_eq!(err, SyntaxError::DuplicateFilter);
    }

    #[test]
    fn duplicate_range_is_rejected() {
        let err = CommandDescriptor::build("ls", vec![Arg::Index(1), re("a"), Arg::from(0usize..=3)])
            .unwrap_err();
        assert_eq!(err, SyntaxError::DuplicateRange);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = CommandDescriptor::build("ls", vec![Arg::Range { lower: 3, upper: 1 }])
            .unwrap_err();
        assert_eq!(err, SyntaxError::InvalidRange { lower: 3, upper: 1 });
    }

    #[test]
    fn trailing_token_must_be_options() {
        let err = CommandDescriptor::build("ls", vec![Arg::Index(1), "late".into()]).unwrap_err();
        assert!(matches!(err, SyntaxError::ExpectedOptions(_)), "{err:?}");
    }

    #[test]
    fn only_one_trailing_options_map() {
        let err = CommandDescriptor::build(
            "ls",
            vec![Options::new().into(), Options::new().into()],
        )
        .unwrap_err();
        assert!(matches!(err, SyntaxError::LeftOverArguments(_)), "{err:?}");
    }

    #[test]
    fn non_word_inside_list_is_a_type_error() {
        let err = CommandDescriptor::build("ls", vec![Arg::list(vec![Arg::Index(1)])]).unwrap_err();
        assert_eq!(err, SyntaxError::BadArgument("1".into()));
    }

    #[test]
    fn options_map_enables_capture() {
        let mut opts = Options::new();
        opts.objectify_as("count");
        let d = CommandDescriptor::build("ls", vec![opts.into()]).unwrap();
        assert_eq!(d.capture(), Some(Objectify::Named("count".into())));
    }

    #[test]
    fn callback_turns_on_plain_capture() {
        let d = CommandDescriptor::build_with("ls", vec![], |_| {}).unwrap();
        assert_eq!(d.capture(), Some(Objectify::Lines));

        let d = CommandDescriptor::build_with("ls", vec![], |o| {
            o.objectify_as("words");
        })
        .unwrap();
        assert_eq!(d.capture(), Some(Objectify::Named("words".into())));
    }

    #[test]
    fn select_lines_filters_then_ranges() {
        let d = CommandDescriptor::build("ls", vec![re("^l"), Arg::from(1usize..=5)]).unwrap();
        let lines = ["la", "x", "lb", "lc"].iter().map(|s| s.to_string()).collect();
        assert_eq!(d.select_lines(lines), vec!["lb".to_string(), "lc".to_string()]);
    }

    #[test]
    fn rendering_is_deterministic() {
        let build = || CommandDescriptor::build("grep", vec![Arg::flag("i"), "x".into()]).unwrap();
        assert_eq!(build().command_line(), build().command_line());
        let d = build();
        assert_eq!(d.to_string(), d.command_line());
    }
}
