//! Tokenizer for the line front-end's call syntax.
//!
//! This is not a shell grammar. A line is a sequence of calls separated by
//! `|`; each call is a name followed by arguments:
//!
//! - `word` or `"quoted words"`: literal string
//! - `:name`: flag, rendered as `-name`
//! - `[ ... ]`: nested list
//! - `r/pattern/`: line filter
//! - `@3`, `@1..4`: line index or inclusive range
//! - `{ ... }`: configuration block, e.g. `{}` or `{objectify=count}`

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// A quoted string; never reinterpreted as a flag or a range.
    Quoted(String),
    Flag(String),
    Filter(String),
    Index(usize),
    Range(usize, usize),
    Block(String),
    ListOpen,
    ListClose,
    Pipe,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexingError {
    #[error("closing quote not found")]
    UnfinishedQuote,
    #[error("closing `/` of filter not found")]
    UnfinishedFilter,
    #[error("closing `}}` of block not found")]
    UnfinishedBlock,
    #[error("bad line selector `{0}`")]
    BadSelector(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote(char),
    ReadingFilter,
    ReadingBlock(usize), // nesting depth
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    tokens: Vec<Token>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        Self {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexingError> {
        while let Some(&c) = self.input.get(self.pos) {
            self.pos += 1;
            match self.state {
                LexingState::Start => self.start(c),
                LexingState::ReadingWord => {
                    if c.is_whitespace() || matches!(c, '|' | '[' | ']' | '{') {
                        self.finish_word()?;
                        self.start(c);
                    } else {
                        self.buffer.push(c);
                        if self.buffer == "r/" {
                            self.buffer.clear();
                            self.state = LexingState::ReadingFilter;
                        }
                    }
                }
                LexingState::ReadingQuote(quote) => {
                    if c == quote {
                        let text = std::mem::take(&mut self.buffer);
                        self.tokens.push(Token::Quoted(text));
                        self.state = LexingState::Start;
                    } else if c == '\\'
                        && quote == '"'
                        && matches!(self.input.get(self.pos), Some('"' | '\\'))
                    {
                        self.buffer.push(self.input[self.pos]);
                        self.pos += 1;
                    } else {
                        self.buffer.push(c);
                    }
                }
                LexingState::ReadingFilter => match c {
                    '/' => {
                        let pattern = std::mem::take(&mut self.buffer);
                        self.tokens.push(Token::Filter(pattern));
                        self.state = LexingState::Start;
                    }
                    '\\' if self.input.get(self.pos) == Some(&'/') => {
                        self.pos += 1;
                        self.buffer.push('/');
                    }
                    _ => self.buffer.push(c),
                },
                LexingState::ReadingBlock(depth) => match c {
                    '{' => {
                        self.buffer.push(c);
                        self.state = LexingState::ReadingBlock(depth + 1);
                    }
                    '}' if depth == 0 => {
                        let body = std::mem::take(&mut self.buffer);
                        self.tokens.push(Token::Block(body.trim().to_owned()));
                        self.state = LexingState::Start;
                    }
                    '}' => {
                        self.buffer.push(c);
                        self.state = LexingState::ReadingBlock(depth - 1);
                    }
                    _ => self.buffer.push(c),
                },
            }
        }

        match self.state {
            LexingState::Start => {}
            LexingState::ReadingWord => self.finish_word()?,
            LexingState::ReadingQuote(_) => return Err(LexingError::UnfinishedQuote),
            LexingState::ReadingFilter => return Err(LexingError::UnfinishedFilter),
            LexingState::ReadingBlock(_) => return Err(LexingError::UnfinishedBlock),
        }
        Ok(self.tokens)
    }

    fn start(&mut self, c: char) {
        match c {
            c if c.is_whitespace() => {}
            '|' => self.tokens.push(Token::Pipe),
            '[' => self.tokens.push(Token::ListOpen),
            ']' => self.tokens.push(Token::ListClose),
            '{' => self.state = LexingState::ReadingBlock(0),
            '"' | '\'' => self.state = LexingState::ReadingQuote(c),
            _ => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn finish_word(&mut self) -> Result<(), LexingError> {
        let word = std::mem::take(&mut self.buffer);
        self.state = LexingState::Start;
        self.tokens.push(classify_word(word)?);
        Ok(())
    }
}

fn classify_word(word: String) -> Result<Token, LexingError> {
    if let Some(name) = word.strip_prefix(':').filter(|n| !n.is_empty()) {
        return Ok(Token::Flag(name.to_owned()));
    }
    if let Some(selector) = word.strip_prefix('@') {
        let bad = || LexingError::BadSelector(word.clone());
        return match selector.split_once("..") {
            Some((lower, upper)) => Ok(Token::Range(
                lower.parse().map_err(|_| bad())?,
                upper.parse().map_err(|_| bad())?,
            )),
            None => Ok(Token::Index(selector.parse().map_err(|_| bad())?)),
        };
    }
    Ok(Token::Word(word))
}

/// Split a line into tokens.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line).run()
}
