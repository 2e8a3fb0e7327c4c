//! DM lexer tests

use super::lex;
use crate::frontend::core::lexer::{TokenKind, TokenValue};
use crate::frontend::dm::lexer::parse_number;

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != TokenKind::DmWhitespace)
        .collect()
}

#[test]
fn test_keywords_and_operators() {
    assert_eq!(
        kinds("var/x = 1 ** 2"),
        vec![
            TokenKind::DmVar,
            TokenKind::DmSlash,
            TokenKind::DmIdentifier,
            TokenKind::DmEquals,
            TokenKind::DmInteger,
            TokenKind::DmStarStar,
            TokenKind::DmInteger,
        ]
    );
    assert_eq!(kinds("call_ext")[0], TokenKind::DmCall);
    assert_eq!(kinds("a <> b")[1], TokenKind::DmExclamationEquals);
}

#[test]
fn test_indentation_blocks() {
    assert_eq!(
        kinds("a\n\tb\nc"),
        vec![
            TokenKind::DmIdentifier,
            TokenKind::Newline,
            TokenKind::DmIndent,
            TokenKind::DmIdentifier,
            TokenKind::DmDedent,
            TokenKind::Newline,
            TokenKind::DmIdentifier,
        ]
    );
}

#[test]
fn test_dedents_at_end_of_source() {
    let found = kinds("a\n\tb\n\t\tc");
    let dedents = found.iter().filter(|k| **k == TokenKind::DmDedent).count();
    let indents = found.iter().filter(|k| **k == TokenKind::DmIndent).count();
    assert_eq!(indents, 2);
    assert_eq!(dedents, 2);
}

#[test]
fn test_inconsistent_dedent_is_an_error() {
    let tokens = lex("a\n\t\tb\n\tc");
    let errors: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].as_str(), Some("Invalid indentation"));
}

#[test]
fn test_brackets_suppress_indentation() {
    let found = kinds("f(a,\n\tb)");
    assert!(!found.contains(&TokenKind::DmIndent));
    assert!(found.contains(&TokenKind::Newline));
}

#[test]
fn test_compound_punctuators() {
    assert_eq!(
        kinds("a?.b ?[1] ..() ..."),
        vec![
            TokenKind::DmIdentifier,
            TokenKind::DmQuestionPeriod,
            TokenKind::DmIdentifier,
            TokenKind::DmQuestionLeftBracket,
            TokenKind::DmInteger,
            TokenKind::DmRightBracket,
            TokenKind::DmSuperProc,
            TokenKind::DmLeftParenthesis,
            TokenKind::DmRightParenthesis,
            TokenKind::DmIndeterminateArgs,
        ]
    );
}

#[test]
fn test_closing_brace_ends_statement() {
    assert_eq!(
        kinds("{a}"),
        vec![
            TokenKind::DmLeftCurlyBracket,
            TokenKind::DmIdentifier,
            TokenKind::DmRightCurlyBracket,
            TokenKind::Newline,
        ]
    );
}

#[test]
fn test_string_kinds() {
    assert_eq!(
        kinds("\"a\" 'b.dmi' @\"c\""),
        vec![
            TokenKind::DmConstantString,
            TokenKind::DmResource,
            TokenKind::DmRawString,
        ]
    );
}

#[test]
fn test_number_decoding() {
    assert_eq!(
        parse_number("12"),
        Some((TokenKind::DmInteger, TokenValue::Int(12)))
    );
    assert_eq!(
        parse_number("0xFF"),
        Some((TokenKind::DmInteger, TokenValue::Int(255)))
    );
    assert_eq!(
        parse_number("1.5"),
        Some((TokenKind::DmFloat, TokenValue::Float(1.5)))
    );
    assert_eq!(
        parse_number("1e3"),
        Some((TokenKind::DmFloat, TokenValue::Float(1000.0)))
    );
    assert_eq!(
        parse_number("1.#INF"),
        Some((TokenKind::DmFloat, TokenValue::Float(f32::INFINITY)))
    );
    assert!(matches!(
        parse_number("1#IND"),
        Some((TokenKind::DmFloat, TokenValue::Float(v))) if v.is_nan()
    ));
    assert_eq!(parse_number("1x"), None);
}

#[test]
fn test_upstream_errors_pass_through() {
    let tokens = lex("a \"unterminated");
    assert_eq!(
        tokens.iter().filter(|t| t.kind == TokenKind::Error).count(),
        1
    );
}
