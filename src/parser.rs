//! Turns tokens from [`crate::lexer`] into calls the session can run.

use regex::Regex;
use thiserror::Error;

use crate::command::{Arg, OptionValue, Options};
use crate::lexer::Token;

/// One call: a command name, its raw arguments and an optional
/// configuration block.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
    pub block: Option<Block>,
}

/// Statements of a `{ ... }` block, applied in order to a command's options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block(Vec<(String, OptionValue)>);

impl Block {
    /// Parse `key=value` / `key value` / `key` statements separated by `;`.
    ///
    /// A bare key means `true`; `true`/`false` values are booleans.
    pub fn parse(body: &str) -> Self {
        let statements = body
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|stmt| {
                let split = stmt
                    .split_once('=')
                    .or_else(|| stmt.split_once(char::is_whitespace));
                let (key, value) = match split {
                    Some((key, value)) => {
                        let value = value.trim().trim_start_matches('=').trim();
                        (key.trim(), Some(value))
                    }
                    None => (stmt, None),
                };
                let value = match value {
                    None | Some("true") => OptionValue::Bool(true),
                    Some("false") => OptionValue::Bool(false),
                    Some(text) => OptionValue::Text(text.trim_start_matches(':').to_owned()),
                };
                (key.to_owned(), value)
            })
            .collect();
        Self(statements)
    }

    /// Set every statement on `opts`, later statements winning.
    pub fn apply(&self, opts: &mut Options) {
        for (key, value) in &self.0 {
            opts.set(key.clone(), value.clone());
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("empty command")]
    EmptyCommand,
    #[error("expected a command name, found {0:?}")]
    ExpectedName(Token),
    #[error("unexpected token {0:?}")]
    UnexpectedToken(Token),
    #[error("unmatched `[`")]
    UnfinishedList,
    #[error("unexpected `]`")]
    UnexpectedListClose,
    #[error("a {{...}} block must be the last thing in a command")]
    BlockNotLast,
    #[error("bad filter pattern: {0}")]
    BadFilter(String),
}

/// Split tokens on `|` and parse every segment into a [`Call`].
pub fn construct_calls(tokens: Vec<Token>) -> Result<Vec<Call>, ParsingError> {
    let mut calls = Vec::new();
    let mut segment = Vec::new();
    for token in tokens {
        if token == Token::Pipe {
            calls.push(parse_call(std::mem::take(&mut segment))?);
        } else {
            segment.push(token);
        }
    }
    if !segment.is_empty() || !calls.is_empty() {
        calls.push(parse_call(segment)?);
    }
    Ok(calls)
}

fn parse_call(tokens: Vec<Token>) -> Result<Call, ParsingError> {
    let mut tokens = tokens.into_iter();
    let name = match tokens.next() {
        Some(Token::Word(name) | Token::Quoted(name)) => name,
        Some(other) => return Err(ParsingError::ExpectedName(other)),
        None => return Err(ParsingError::EmptyCommand),
    };

    let mut args = Vec::new();
    let mut block = None;
    while let Some(token) = tokens.next() {
        if block.is_some() {
            return Err(ParsingError::BlockNotLast);
        }
        match token {
            Token::Block(body) => block = Some(Block::parse(&body)),
            Token::ListOpen => args.push(parse_list(&mut tokens)?),
            other => args.push(to_arg(other)?),
        }
    }
    Ok(Call { name, args, block })
}

fn parse_list(tokens: &mut impl Iterator<Item = Token>) -> Result<Arg, ParsingError> {
    let mut items = Vec::new();
    loop {
        match tokens.next() {
            Some(Token::ListClose) => return Ok(Arg::List(items)),
            Some(Token::ListOpen) => items.push(parse_list(tokens)?),
            Some(Token::Block(_)) => return Err(ParsingError::BlockNotLast),
            Some(other) => items.push(to_arg(other)?),
            None => return Err(ParsingError::UnfinishedList),
        }
    }
}

fn to_arg(token: Token) -> Result<Arg, ParsingError> {
    Ok(match token {
        Token::Word(s) | Token::Quoted(s) => Arg::Str(s),
        Token::Flag(name) => Arg::Flag(name),
        Token::Filter(pattern) => {
            let re = Regex::new(&pattern).map_err(|e| ParsingError::BadFilter(e.to_string()))?;
            Arg::from(re)
        }
        Token::Index(i) => Arg::Index(i),
        Token::Range(lower, upper) => Arg::Range { lower, upper },
        Token::ListClose => return Err(ParsingError::UnexpectedListClose),
        other @ (Token::ListOpen | Token::Block(_) | Token::Pipe) => {
            return Err(ParsingError::UnexpectedToken(other));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Objectify;
    use crate::lexer::split_into_tokens;

    fn parse(line: &str) -> Result<Vec<Call>, ParsingError> {
        construct_calls(split_into_tokens(line).unwrap())
    }

    #[test]
    fn single_call_with_everything() {
        let calls = parse("ls :lh [~ :a] r/->/ @1..2 {objectify=count}").unwrap();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.name, "ls");
        assert_eq!(call.args.len(), 4);
        assert_eq!(call.args[0], Arg::flag("lh"));
        assert_eq!(call.args[1], Arg::list(vec![Arg::from("~"), Arg::flag("a")]));
        assert_eq!(call.args[3], Arg::Range { lower: 1, upper: 2 });

        let mut opts = Options::new();
        call.block.as_ref().unwrap().apply(&mut opts);
        assert_eq!(opts.capture(), Some(Objectify::Named("count".into())));
    }

    #[test]
    fn pipeline_segments() {
        let calls = parse("echo a | cat | wc :l").unwrap();
        let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "cat", "wc"]);
        assert_eq!(calls[2].args, vec![Arg::flag("l")]);
    }

    #[test]
    fn empty_line_has_no_calls() {
        assert!(parse("   ").unwrap().is_empty());
        assert_eq!(parse("ls |").unwrap_err(), ParsingError::EmptyCommand);
    }

    #[test]
    fn block_must_be_last() {
        assert_eq!(parse("ls {} :l").unwrap_err(), ParsingError::BlockNotLast);
    }

    #[test]
    fn unbalanced_lists() {
        assert_eq!(parse("ls [a").unwrap_err(), ParsingError::UnfinishedList);
        assert_eq!(parse("ls a]").unwrap_err(), ParsingError::UnexpectedListClose);
    }

    #[test]
    fn bad_regex_is_reported() {
        assert!(matches!(parse("ls r/(/"), Err(ParsingError::BadFilter(_))));
    }

    #[test]
    fn block_statements() {
        let block = Block::parse("objectify; objectify :words ; in=file");
        let mut opts = Options::new();
        block.apply(&mut opts);
        assert_eq!(opts.capture(), Some(Objectify::Named("words".into())));
        assert_eq!(opts.get("in"), Some(&OptionValue::Text("file".into())));

        let mut opts = Options::new();
        Block::parse("objectify=false").apply(&mut opts);
        assert_eq!(opts.capture(), None);
    }

    #[test]
    fn spaces_around_equals_sign() {
        let mut opts = Options::new();
        Block::parse("objectify = count").apply(&mut opts);
        assert_eq!(opts.capture(), Some(Objectify::Named("count".into())));

        let mut opts = Options::new();
        Block::parse("in =  some file").apply(&mut opts);
        assert_eq!(opts.get("in"), Some(&OptionValue::Text("some file".into())));
    }
}
