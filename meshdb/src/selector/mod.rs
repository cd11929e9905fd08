//! Primary selector language: which devices to pull out of the index.
//!
//! # Syntax Overview
//!
//! ```text
//! primaryfilter := (all | words) slice?
//! all           := "*" | "@" | <empty>
//! words         := word ("|" word)*
//! slice         := "[" int? ":" int? "]"
//! ```
//!
//! - `@` is a shell-safe spelling of `*`; empty input also selects everything.
//! - Each word is a key prefix; the index is scanned once per prefix, in the
//!   order given.
//! - The slice is applied after filtering and sorting, with half-open
//!   `[from:to]` semantics and an upper bound clamped to the result length.

mod parser;
mod slice;
mod tokenizer;

pub use parser::{Selector, Target};
pub use slice::Slice;
pub use tokenizer::{tokenize, Token};

use crate::Result;

/// Parse the positional selector argument.
pub fn parse_selector(input: &str) -> Result<Selector> {
    let tokens = tokenize(input);
    let selector = parser::Parser::new(tokens).parse_selector()?;
    Ok(selector)
}

/// Parse a standalone `[from:to]` slice (the `--slice` flag).
///
/// Returns `Ok(None)` for empty input.
pub fn parse_slice(input: &str) -> Result<Option<Slice>> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Ok(None);
    }
    let slice = parser::Parser::new(tokens).parse_standalone_slice()?;
    Ok(Some(slice))
}
