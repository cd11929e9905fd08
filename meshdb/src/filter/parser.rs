//! Recursive descent parser for the filter language.

use super::ast::{Expr, MatchMode};
use super::tokenizer::{Token, TokenKind, AND, OR};
use crate::error::SyntaxError;

const NEGATE: &str = "!";
const WILDCARD: &str = "*";

/// Parser over a token stream produced by [`tokenize`](super::tokenize).
pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, idx: 0 }
    }

    /// Parse the whole stream into one expression.
    pub fn parse(mut self) -> Result<Expr, SyntaxError> {
        self.check_parens()?;

        let expr = self.parse_expression()?;

        if let Some(next) = self.peek() {
            return Err(SyntaxError::TrailingTokens(next.text.clone()));
        }
        Ok(expr)
    }

    /// Cheap balance check before any parsing happens.
    fn check_parens(&self) -> Result<(), SyntaxError> {
        let count = |text: &str| {
            self.tokens
                .iter()
                .filter(|t| t.is(TokenKind::Symbol, text))
                .count()
        };
        if count("(") != count(")") {
            return Err(SyntaxError::ImbalancedParens);
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn peek_is(&self, kind: TokenKind, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(kind, text))
    }

    fn found(&self) -> String {
        self.peek()
            .map(|t| t.text.clone())
            .unwrap_or_else(|| "end of input".to_string())
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.idx).cloned();
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    /// expression := factor ( ("|" | ",") factor )*
    ///
    /// Folds left: every new operator takes the whole expression so far as its
    /// left child.
    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let mut node = self.parse_factor()?;

        loop {
            if self.peek_is(TokenKind::Logical, OR) {
                self.advance();
                let right = self.parse_factor()?;
                node = Expr::or(node, right);
            } else if self.peek_is(TokenKind::Logical, AND) {
                self.advance();
                let right = self.parse_factor()?;
                node = Expr::and(node, right);
            } else {
                break;
            }
        }

        Ok(node)
    }

    /// factor := "!"? ( name | "(" expression ")" )
    fn parse_factor(&mut self) -> Result<Expr, SyntaxError> {
        let negate = self.peek_is(TokenKind::Name, NEGATE);
        if negate {
            self.advance();
        }

        let node = if self.peek_is(TokenKind::Symbol, "(") {
            self.advance();
            let inner = self.parse_expression()?;
            if !self.peek_is(TokenKind::Symbol, ")") {
                return Err(SyntaxError::unexpected("')'", self.found()));
            }
            self.advance();
            Expr::paren(inner)
        } else {
            self.parse_name()?
        };

        Ok(if negate { Expr::negate(node) } else { node })
    }

    /// name := "*"? WORD "*"?
    fn parse_name(&mut self) -> Result<Expr, SyntaxError> {
        let leading = self.peek_is(TokenKind::Symbol, WILDCARD);
        if leading {
            self.advance();
        }

        let value = match self.peek() {
            Some(t) if t.kind == TokenKind::Name => t.text.clone(),
            _ => return Err(SyntaxError::unexpected("a name", self.found())),
        };
        self.advance();

        let trailing = self.peek_is(TokenKind::Symbol, WILDCARD);
        if trailing {
            self.advance();
        }

        Ok(Expr::text(value, MatchMode::from_wildcards(leading, trailing)))
    }
}
