//! Filter expression language applied to a device's attribute set.
//!
//! # Syntax Overview
//!
//! ```text
//! expression := factor ( ("|" | ",") factor )*
//! factor     := "!"? ( name | "(" expression ")" )
//! name       := "*"? WORD "*"?
//! ```
//!
//! - `|` is OR, `,` is AND. There is no precedence: operators fold left, so
//!   `a | b, c` means `(a | b), c`. Use parentheses to group otherwise.
//! - `foo*` matches any attribute starting with `foo`, `*foo` any attribute
//!   ending with it, `*foo*` any attribute containing it. A bare `foo` must
//!   match an attribute exactly.
//! - `!` (standalone, followed by whitespace) negates the next factor.
//!
//! Input is lower-cased before tokenizing; attribute sets are lower-cased too.

mod ast;
mod parser;
mod tokenizer;

pub use ast::{Expr, MatchMode};
pub use parser::Parser;
pub use tokenizer::{tokenize, Token, TokenKind};

use crate::Result;

/// Parse a `--filter` string.
///
/// Returns `Ok(None)` for empty (or all-whitespace) input, which means
/// "accept everything": callers should skip filtering entirely.
pub fn parse_filter(input: &str) -> Result<Option<Expr>> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return Ok(None);
    }

    let tokens = tokenize(&input);
    if tokens.is_empty() {
        return Ok(None);
    }

    let expr = Parser::new(tokens).parse()?;
    Ok(Some(expr))
}

#[cfg(test)]
mod tests;
