//! Parser for the primary selector language.

use std::fmt;

use super::slice::Slice;
use super::tokenizer::Token;
use crate::error::SyntaxError;

/// Which keys a selector scans for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Full scan.
    All,
    /// One prefix scan per entry, in order. Never empty.
    Prefixes(Vec<String>),
}

/// A parsed primary selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub target: Target,
    pub slice: Option<Slice>,
}

impl Default for Selector {
    fn default() -> Self {
        Self::all()
    }
}

impl Selector {
    pub fn all() -> Self {
        Self {
            target: Target::All,
            slice: None,
        }
    }

    /// Build a prefix selector. An empty list selects everything.
    pub fn from_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        let target = if prefixes.is_empty() {
            Target::All
        } else {
            Target::Prefixes(prefixes)
        };
        Self {
            target,
            slice: None,
        }
    }

    pub fn with_slice(mut self, slice: Slice) -> Self {
        self.slice = Some(slice);
        self
    }

    pub fn is_all(&self) -> bool {
        matches!(self.target, Target::All)
    }

    /// Prefixes to scan; empty when the selector matches everything.
    pub fn prefixes(&self) -> &[String] {
        match &self.target {
            Target::All => &[],
            Target::Prefixes(p) => p,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::All => write!(f, "*")?,
            Target::Prefixes(p) => write!(f, "{}", p.join(" | "))?,
        }
        if let Some(slice) = &self.slice {
            write!(f, "{slice}")?;
        }
        Ok(())
    }
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// primaryfilter := (all | words) slice?
    pub(crate) fn parse_selector(mut self) -> Result<Selector, SyntaxError> {
        let mut selector = match self.peek() {
            None => return Ok(Selector::all()),
            Some(Token::All) => {
                self.advance();
                Selector::all()
            }
            // A bare slice implies all.
            Some(Token::LeftBracket) => Selector::all(),
            Some(_) => Selector::from_prefixes(self.parse_words()?),
        };

        if self.matches(&Token::LeftBracket) {
            selector.slice = Some(self.parse_slice_body()?);
        }

        self.expect_end()?;
        Ok(selector)
    }

    /// A `[from:to]` with nothing before or after it.
    pub(crate) fn parse_standalone_slice(mut self) -> Result<Slice, SyntaxError> {
        if !self.matches(&Token::LeftBracket) {
            return Err(SyntaxError::unexpected("'['", self.found()));
        }
        let slice = self.parse_slice_body()?;
        self.expect_end()?;
        Ok(slice)
    }

    /// words := word ("|" word)*
    fn parse_words(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut words = vec![self.parse_word()?];
        while self.matches(&Token::Or) {
            words.push(self.parse_word()?);
        }
        Ok(words)
    }

    fn parse_word(&mut self) -> Result<String, SyntaxError> {
        match self.peek() {
            Some(Token::Word(w)) | Some(Token::Integer(w)) => {
                let word = w.clone();
                self.advance();
                Ok(word)
            }
            _ => Err(SyntaxError::unexpected("a word", self.found())),
        }
    }

    /// Everything after the opening bracket: int? ":" int? "]"
    fn parse_slice_body(&mut self) -> Result<Slice, SyntaxError> {
        let from = self.parse_bound()?;

        if !self.matches(&Token::Colon) {
            return Err(SyntaxError::unexpected("':' in slice", self.found()));
        }

        let to = self.parse_bound()?;

        if !self.matches(&Token::RightBracket) {
            return Err(SyntaxError::unexpected("']' in slice", self.found()));
        }

        Ok(Slice::new(from, to))
    }

    /// An optional integer bound. Anything word-like in bound position is an
    /// error rather than an open end.
    fn parse_bound(&mut self) -> Result<Option<usize>, SyntaxError> {
        let text = match self.peek() {
            Some(Token::Integer(n)) | Some(Token::Word(n)) => n.clone(),
            _ => return Ok(None),
        };
        self.advance();

        text.parse::<usize>()
            .map(Some)
            .map_err(|_| SyntaxError::InvalidBound(text))
    }

    fn expect_end(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(SyntaxError::TrailingTokens(t.to_string())),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) {
        if self.current < self.tokens.len() {
            self.current += 1;
        }
    }

    fn matches(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn found(&self) -> String {
        self.peek()
            .map(ToString::to_string)
            .unwrap_or_else(|| "end of input".to_string())
    }
}
