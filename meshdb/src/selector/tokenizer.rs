//! Tokenizer for the primary selector language.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `*` or `@`
    All,
    /// Run of ordinary characters (a key prefix).
    Word(String),
    /// Run of ASCII digits.
    Integer(String),
    /// `|`
    Or,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `:`
    Colon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::All => write!(f, "'*'"),
            Token::Word(w) => write!(f, "word '{w}'"),
            Token::Integer(n) => write!(f, "integer {n}"),
            Token::Or => write!(f, "'|'"),
            Token::LeftBracket => write!(f, "'['"),
            Token::RightBracket => write!(f, "']'"),
            Token::Colon => write!(f, "':'"),
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, '*' | '@' | '|' | '[' | ']' | ':')
}

/// Split a selector string into tokens. Whitespace only separates.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if is_special(c) {
            chars.next();
            tokens.push(match c {
                // normalize(@) -> *
                '*' | '@' => Token::All,
                '|' => Token::Or,
                '[' => Token::LeftBracket,
                ']' => Token::RightBracket,
                _ => Token::Colon,
            });
            continue;
        }

        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || is_special(c) {
                break;
            }
            word.push(c);
            chars.next();
        }

        if word.chars().all(|c| c.is_ascii_digit()) {
            tokens.push(Token::Integer(word));
        } else {
            tokens.push(Token::Word(word));
        }
    }

    tokens
}
