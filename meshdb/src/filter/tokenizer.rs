//! Single pass tokenizer for the filter language.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Accumulated run of ordinary characters.
    Name,
    /// `(`, `)` or `*`.
    Symbol,
    /// `AND` (from `,`) or `OR` (from `|`).
    Logical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn name(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Name,
            text: text.into(),
        }
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Symbol,
            text: text.into(),
        }
    }

    pub fn logical(text: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Logical,
            text: text.into(),
        }
    }

    pub(crate) fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.text)
    }
}

pub const AND: &str = "AND";
pub const OR: &str = "OR";

/// Turn a raw filter string into a flat token stream.
///
/// Nothing is rejected here: anything that isn't a special character or
/// whitespace becomes part of a name.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in input.chars() {
        let special = match c {
            '(' | ')' | '*' => Some(Token::symbol(c)),
            ',' => Some(Token::logical(AND)),
            '|' => Some(Token::logical(OR)),
            _ => None,
        };

        if let Some(token) = special {
            flush(&mut current, &mut tokens);
            tokens.push(token);
        } else if c.is_whitespace() {
            flush(&mut current, &mut tokens);
        } else {
            current.push(c);
        }
    }
    flush(&mut current, &mut tokens);

    tokens
}

fn flush(current: &mut String, tokens: &mut Vec<Token>) {
    if !current.is_empty() {
        tokens.push(Token::name(std::mem::take(current)));
    }
}
