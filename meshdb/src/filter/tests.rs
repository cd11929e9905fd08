//! Tests for the filter tokenizer, parser and evaluator.

use std::collections::HashSet;

use super::*;
use crate::error::SyntaxError;
use crate::Error;

fn attrs(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn parse(input: &str) -> Expr {
    parse_filter(input).unwrap().expect("non-empty filter")
}

fn syntax_err(input: &str) -> SyntaxError {
    match parse_filter(input) {
        Err(Error::Syntax(e)) => e,
        other => panic!("expected syntax error for {input:?}, got {other:?}"),
    }
}

#[test]
fn test_tokenize_symbols_and_logicals() {
    let tokens = tokenize("(foo | bar), *baz*");
    assert_eq!(
        tokens,
        vec![
            Token::symbol("("),
            Token::name("foo"),
            Token::logical("OR"),
            Token::name("bar"),
            Token::symbol(")"),
            Token::logical("AND"),
            Token::symbol("*"),
            Token::name("baz"),
            Token::symbol("*"),
        ]
    );
}

#[test]
fn test_tokenize_whitespace_only_separates() {
    let tokens = tokenize("  foo   bar\t");
    assert_eq!(tokens, vec![Token::name("foo"), Token::name("bar")]);
}

#[test]
fn test_tokenize_keeps_unusual_characters_in_names() {
    let tokens = tokenize("user@gmail.com,+exit");
    assert_eq!(
        tokens,
        vec![
            Token::name("user@gmail.com"),
            Token::logical("AND"),
            Token::name("+exit"),
        ]
    );
}

#[test]
fn test_tokenize_empty() {
    assert!(tokenize("").is_empty());
    assert!(tokenize("   ").is_empty());
}

#[test]
fn test_empty_filter_is_none() {
    assert!(parse_filter("").unwrap().is_none());
    assert!(parse_filter("   ").unwrap().is_none());
}

#[test]
fn test_parse_single_name() {
    assert_eq!(parse("foo"), Expr::text("foo", MatchMode::Equal));
}

#[test]
fn test_parse_lowercases_input() {
    assert_eq!(parse("Linux"), Expr::text("linux", MatchMode::Equal));
}

#[test]
fn test_parse_wildcards() {
    assert_eq!(parse("foo*"), Expr::text("foo", MatchMode::StartsWith));
    assert_eq!(parse("*foo"), Expr::text("foo", MatchMode::EndsWith));
    assert_eq!(parse("*foo*"), Expr::text("foo", MatchMode::Contains));
}

#[test]
fn test_parse_left_fold() {
    let expected = Expr::and(
        Expr::or(
            Expr::text("foo", MatchMode::Equal),
            Expr::text("bar", MatchMode::Equal),
        ),
        Expr::text("baz", MatchMode::Equal),
    );
    assert_eq!(parse("foo | bar , baz"), expected);
}

#[test]
fn test_left_fold_differs_from_precedence_grouping() {
    // With only "foo" present, (foo | bar), baz is false while
    // foo | (bar, baz) is true.
    let set = attrs(&["foo"]);
    let folded = parse("foo | bar , baz");
    let grouped = parse("foo | (bar , baz)");

    assert!(!folded.eval(&set));
    assert!(grouped.eval(&set));
}

#[test]
fn test_parse_parens_and_negation() {
    let expected = Expr::and(
        Expr::paren(Expr::or(
            Expr::text("foo", MatchMode::Equal),
            Expr::text("bar", MatchMode::Equal),
        )),
        Expr::negate(Expr::text("baz", MatchMode::Equal)),
    );
    assert_eq!(parse("(foo | bar), ! baz"), expected);
}

#[test]
fn test_negate_group() {
    let expr = parse("! (linux | windows)");
    assert!(expr.eval(&attrs(&["macos"])));
    assert!(!expr.eval(&attrs(&["linux"])));
}

#[test]
fn test_imbalanced_parens() {
    assert_eq!(syntax_err("(hello, world"), SyntaxError::ImbalancedParens);
    assert_eq!(syntax_err("hello)"), SyntaxError::ImbalancedParens);
}

#[test]
fn test_trailing_tokens() {
    assert!(matches!(
        syntax_err("how are you doing?"),
        SyntaxError::TrailingTokens(_)
    ));
}

#[test]
fn test_missing_operand() {
    assert!(matches!(
        syntax_err("foo |"),
        SyntaxError::Unexpected { expected: "a name", .. }
    ));
    assert!(matches!(
        syntax_err(", foo"),
        SyntaxError::Unexpected { expected: "a name", .. }
    ));
    assert!(matches!(
        syntax_err("()"),
        SyntaxError::Unexpected { expected: "a name", .. }
    ));
}

#[test]
fn test_missing_close_paren() {
    // Balanced overall, but the first group is never closed before the next
    // one opens.
    assert!(matches!(
        syntax_err("(foo (bar))"),
        SyntaxError::Unexpected { expected: "')'", .. }
    ));
}

#[test]
fn test_eval_wildcard_modes() {
    let set = attrs(&["foobar"]);
    assert!(parse("foo*").eval(&set));
    assert!(parse("*bar").eval(&set));
    assert!(parse("*oob*").eval(&set));
    assert!(parse("foobar").eval(&set));
    assert!(!parse("baz").eval(&set));
    assert!(!parse("bar*").eval(&set));
    assert!(!parse("*foo").eval(&set));
}

#[test]
fn test_eval_text_modes_direct() {
    let cases = [
        ("foo", "foo", MatchMode::Equal, true),
        ("foo", "bar", MatchMode::Equal, false),
        ("foo", "foobar", MatchMode::StartsWith, true),
        ("foo", "doobar", MatchMode::StartsWith, false),
        ("foo", "poofoo", MatchMode::EndsWith, true),
        ("foo", "doodoo", MatchMode::EndsWith, false),
        ("foo", "goofoodie", MatchMode::Contains, true),
        ("foo", "goooodie", MatchMode::Contains, false),
    ];

    for (value, attr, mode, expected) in cases {
        let node = Expr::text(value, mode);
        assert_eq!(node.eval(&attrs(&[attr])), expected, "{value} {mode:?} {attr}");
    }
}

#[test]
fn test_eval_boolean_nodes() {
    let and = Expr::and(
        Expr::text("foo", MatchMode::Equal),
        Expr::text("bar", MatchMode::Equal),
    );
    assert!(and.eval(&attrs(&["foo", "bar"])));
    assert!(!and.eval(&attrs(&["bar"])));

    let or = Expr::or(
        Expr::text("foo", MatchMode::Equal),
        Expr::text("bar", MatchMode::Equal),
    );
    assert!(or.eval(&attrs(&["foo"])));
    assert!(or.eval(&attrs(&["bar"])));
    assert!(!or.eval(&attrs(&["baz"])));

    let paren = Expr::paren(Expr::text("foo", MatchMode::Equal));
    assert!(paren.eval(&attrs(&["foo"])));

    let negated = Expr::negate(Expr::text("foo", MatchMode::Equal));
    assert!(!negated.eval(&attrs(&["foo"])));
}

#[test]
fn test_display_reparses_to_same_tree() {
    let inputs = [
        "foo",
        "*foo*",
        "foo | bar , baz",
        "(foo | bar), ! baz",
        "! (a, b*) | *c",
        "x, (y | (z, ! w))",
    ];

    for input in inputs {
        let ast = parse(input);
        let rendered = ast.to_string();
        assert_eq!(parse(&rendered), ast, "{input} -> {rendered}");
    }
}

#[test]
fn test_dump_tree() {
    let dump = parse("(foo | bar), ! baz").dump();
    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(
        lines,
        vec![
            "- AND",
            "  - Parentheses",
            "    - OR",
            "      - Text(Equal): foo",
            "      - Text(Equal): bar",
            "  - NOT",
            "    - Text(Equal): baz",
        ]
    );
}
