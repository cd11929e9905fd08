//! Half-open `[from:to]` ranges over result lists.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub from: Option<usize>,
    pub to: Option<usize>,
}

impl Slice {
    pub fn new(from: Option<usize>, to: Option<usize>) -> Self {
        Self { from, to }
    }

    /// True when at least one bound is present; `[:]` is not defined.
    pub fn is_defined(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Resolve against a list length. Both bounds clamp to `len`, and a
    /// `from` past `to` collapses to an empty range.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let to = self.to.unwrap_or(len).min(len);
        let from = self.from.unwrap_or(0).min(to);
        from..to
    }

    /// Borrow the selected window of `items`.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        if let Some(to) = self.to {
            if to > items.len() {
                tracing::warn!(
                    upper = to,
                    len = items.len(),
                    "upper bound on slice is larger than results; clamping"
                );
            }
        }
        &items[self.bounds(items.len())]
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if let Some(from) = self.from {
            write!(f, "{from}")?;
        }
        write!(f, ":")?;
        if let Some(to) = self.to {
            write!(f, "{to}")?;
        }
        write!(f, "]")
    }
}
