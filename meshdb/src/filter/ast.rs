//! Filter AST and its evaluator.

use std::collections::HashSet;
use std::fmt;

/// How a text node compares its value against the attribute set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// `foo`
    Equal,
    /// `foo*`
    StartsWith,
    /// `*foo`
    EndsWith,
    /// `*foo*`
    Contains,
}

impl MatchMode {
    /// Combine the wildcard flags found around a name.
    pub fn from_wildcards(leading: bool, trailing: bool) -> Self {
        match (leading, trailing) {
            (false, false) => Self::Equal,
            (false, true) => Self::StartsWith,
            (true, false) => Self::EndsWith,
            (true, true) => Self::Contains,
        }
    }
}

/// A parsed filter expression. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Text { value: String, mode: MatchMode },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
    Negate(Box<Expr>),
}

impl Expr {
    pub fn text(value: impl Into<String>, mode: MatchMode) -> Self {
        Self::Text {
            value: value.into(),
            mode,
        }
    }

    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Self, right: Self) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    pub fn paren(inner: Self) -> Self {
        Self::Paren(Box::new(inner))
    }

    pub fn negate(inner: Self) -> Self {
        Self::Negate(Box::new(inner))
    }

    /// Evaluate against one entity's attribute set.
    pub fn eval(&self, attrs: &HashSet<String>) -> bool {
        match self {
            Self::Text { value, mode } => match mode {
                MatchMode::Equal => attrs.contains(value),
                // Attribute sets are small; a linear scan is fine.
                MatchMode::StartsWith => attrs.iter().any(|a| a.starts_with(value.as_str())),
                MatchMode::EndsWith => attrs.iter().any(|a| a.ends_with(value.as_str())),
                MatchMode::Contains => attrs.iter().any(|a| a.contains(value.as_str())),
            },
            Self::And(left, right) => left.eval(attrs) && right.eval(attrs),
            Self::Or(left, right) => left.eval(attrs) || right.eval(attrs),
            Self::Paren(inner) => inner.eval(attrs),
            Self::Negate(inner) => !inner.eval(attrs),
        }
    }

    /// Indented tree rendering, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match self {
            Self::Text { value, mode } => {
                out.push_str(&format!("{pad}- Text({mode:?}): {value}\n"));
            }
            Self::And(left, right) => {
                out.push_str(&format!("{pad}- AND\n"));
                left.dump_into(out, indent + 1);
                right.dump_into(out, indent + 1);
            }
            Self::Or(left, right) => {
                out.push_str(&format!("{pad}- OR\n"));
                left.dump_into(out, indent + 1);
                right.dump_into(out, indent + 1);
            }
            Self::Paren(inner) => {
                out.push_str(&format!("{pad}- Parentheses\n"));
                inner.dump_into(out, indent + 1);
            }
            Self::Negate(inner) => {
                out.push_str(&format!("{pad}- NOT\n"));
                inner.dump_into(out, indent + 1);
            }
        }
    }
}

/// Renders back into filter syntax. For any tree built by the parser,
/// re-parsing the output yields the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { value, mode } => match mode {
                MatchMode::Equal => write!(f, "{value}"),
                MatchMode::StartsWith => write!(f, "{value}*"),
                MatchMode::EndsWith => write!(f, "*{value}"),
                MatchMode::Contains => write!(f, "*{value}*"),
            },
            Self::And(left, right) => write!(f, "{left}, {right}"),
            Self::Or(left, right) => write!(f, "{left} | {right}"),
            Self::Paren(inner) => write!(f, "({inner})"),
            // The negation marker is only recognized as a standalone name.
            Self::Negate(inner) => write!(f, "! {inner}"),
        }
    }
}
