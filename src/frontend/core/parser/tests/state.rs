//! ParserState unit tests

use std::sync::Arc;

use quickcheck::{quickcheck, TestResult};

use crate::frontend::core::lexer::{Token, TokenKind, TokenListLexer};
use crate::frontend::core::parser::{ParseResult, ParserState};
use crate::util::diagnostic::{DiagnosticSink, ErrorLevel, WarningCode};
use crate::util::span::Location;

fn loc(column: u32) -> Location {
    Location::new(Arc::from("state.dm"), 1, column)
}

/// Identifiers `t0`, `t1`, ... followed by EOF
fn identifiers(count: usize) -> Vec<Token> {
    (0..count)
        .map(|i| Token::simple(TokenKind::DmIdentifier, format!("t{}", i), loc(i as u32 + 1)))
        .collect()
}

fn state(tokens: Vec<Token>) -> (ParserState<TokenListLexer>, DiagnosticSink) {
    let sink = DiagnosticSink::with_defaults();
    (ParserState::new(TokenListLexer::new(tokens), sink.clone()), sink)
}

fn remaining(state: &mut ParserState<TokenListLexer>) -> Vec<String> {
    let mut out = Vec::new();
    while !state.at_end() {
        out.push(state.bump().text);
    }
    out
}

#[test]
fn test_advance_stops_at_eof() {
    let (mut state, _) = state(identifiers(2));
    assert_eq!(state.current().text, "t0");
    assert_eq!(state.advance().text, "t1");
    assert!(state.advance().kind == TokenKind::EndOfFile);
    assert!(state.advance().kind == TokenKind::EndOfFile);
    assert!(state.at_end());
}

#[test]
fn test_peek_does_not_consume() {
    let (mut state, _) = state(identifiers(3));
    assert_eq!(state.peek_nth(2).text, "t2");
    assert_eq!(state.peek_nth(10).kind, TokenKind::EndOfFile);
    assert_eq!(state.current().text, "t0");
}

#[test]
fn test_check_and_consume() {
    let mut tokens = identifiers(1);
    tokens.push(Token::simple(TokenKind::DmComma, ",", loc(2)));
    let (mut state, sink) = state(tokens);

    assert!(!state.check(TokenKind::DmComma));
    assert!(state.check(TokenKind::DmIdentifier));
    assert_eq!(
        state.check_any(&[TokenKind::DmSemicolon, TokenKind::DmComma]).map(|t| t.kind),
        Some(TokenKind::DmComma)
    );
    assert!(sink.is_empty());

    assert!(!state.consume(TokenKind::DmRightParenthesis, "Expected ')'"));
    let records = sink.diagnostics();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].code, WarningCode::BadToken);
    assert_eq!(records[0].message, "Expected ')'");
}

#[test]
fn test_unread_restores_previous_token() {
    let (mut state, _) = state(identifiers(3));
    state.advance();
    state.unread();
    assert_eq!(state.current().text, "t0");
    assert_eq!(remaining(&mut state), vec!["t0", "t1", "t2"]);
}

#[test]
fn test_nested_checkpoints() {
    let (mut state, _) = state(identifiers(6));
    let outer = state.checkpoint();
    state.advance();
    let inner = state.checkpoint();
    state.advance();
    state.advance();
    state.commit(inner);
    assert_eq!(state.current().text, "t3");

    // Rolling back the outer checkpoint rewinds past the committed tokens
    state.rollback(outer);
    assert_eq!(state.current().text, "t0");
    assert_eq!(state.open_checkpoints(), 0);
}

#[test]
fn test_attempt_rewinds_on_failure() {
    let (mut state, _) = state(identifiers(4));
    let failed: Option<()> = state.attempt(|p| {
        p.advance();
        p.advance();
        Ok(None)
    });
    assert!(failed.is_none());
    assert_eq!(state.current().text, "t0");

    let aborted: Option<()> = state.attempt(|p| {
        p.advance();
        Err(p.error("nope"))
    });
    assert!(aborted.is_none());
    assert_eq!(state.current().text, "t0");

    let taken = state.attempt(|p| -> ParseResult<Option<String>> { Ok(Some(p.bump().text)) });
    assert_eq!(taken.as_deref(), Some("t0"));
    assert_eq!(state.current().text, "t1");
}

#[test]
fn test_diagnostic_tokens_are_routed_once() {
    let tokens = vec![
        Token::simple(TokenKind::DmIdentifier, "a", loc(1)),
        Token::error(loc(2), "Expected '\"' to end string"),
        Token::warning(loc(3), "Suspicious"),
        Token::simple(TokenKind::DmIdentifier, "b", loc(4)),
    ];
    let (mut state, sink) = state(tokens);

    let checkpoint = state.checkpoint();
    state.advance();
    assert_eq!(state.current().text, "b");
    state.rollback(checkpoint);
    state.advance();
    assert_eq!(state.current().text, "b");

    let records = sink.diagnostics();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].level, ErrorLevel::Error);
    assert_eq!(records[0].code, WarningCode::BadToken);
    assert_eq!(records[0].location, loc(2));
    assert_eq!(records[0].message, "Expected '\"' to end string");
    assert_eq!(records[1].level, ErrorLevel::Warning);
    assert_eq!(records[1].location, loc(3));
    assert_eq!(records[1].message, "Suspicious");
}

#[test]
fn test_error_records_and_aborts() {
    let (mut state, sink) = state(identifiers(1));
    let abort = state.error("Expected end of object statement");
    assert_eq!(abort.location, loc(1));
    assert_eq!(sink.error_count(), 1);
}

#[test]
fn test_missing_bracket_quiets_until_top_level_newline() {
    let kinds = [
        (TokenKind::DmLeftParenthesis, "("),
        (TokenKind::DmIdentifier, "a"),
        (TokenKind::Newline, "\n"),
        (TokenKind::DmIdentifier, "b"),
        (TokenKind::DmRightParenthesis, ")"),
        (TokenKind::Newline, "\n"),
        (TokenKind::DmIdentifier, "c"),
    ];
    let tokens = kinds
        .iter()
        .enumerate()
        .map(|(i, (kind, text))| Token::simple(*kind, *text, loc(i as u32 + 1)))
        .collect();
    let (mut state, sink) = state(tokens);

    state.advance();
    assert!(!state.consume(TokenKind::DmRightParenthesis, "Expected ')'"));
    assert!(state.is_recovering());
    assert!(state.emit(WarningCode::BadToken, "cascade"));
    let abort = state.error("Expected an expression");
    assert_eq!(abort.message, "Expected an expression");

    // A newline inside the brackets is not a boundary
    state.advance();
    assert_eq!(state.current_kind(), TokenKind::Newline);
    assert!(!state.at_boundary());
    assert!(state.is_recovering());

    state.advance();
    state.advance();
    state.advance();
    assert!(state.at_boundary());
    assert!(!state.is_recovering());
    state.emit(WarningCode::BadToken, "next statement");

    let messages: Vec<_> = sink.diagnostics().into_iter().map(|d| d.message).collect();
    assert_eq!(messages, vec!["Expected ')'", "next statement"]);
}

#[test]
fn test_abort_inside_brackets_starts_recovery() {
    let tokens = vec![
        Token::simple(TokenKind::DmLeftBracket, "[", loc(1)),
        Token::simple(TokenKind::DmComma, ",", loc(2)),
    ];
    let (mut state, sink) = state(tokens);
    let _ = state.error("at top level");
    assert!(!state.is_recovering());

    state.advance();
    let _ = state.error("Expected an expression");
    assert!(state.is_recovering());
    state.emit(WarningCode::BadToken, "cascade");
    assert_eq!(sink.error_count(), 2);
}

#[test]
fn test_checkpoint_idempotence() {
    fn prop(
        len: u8,
        before: u8,
        consumed: u8,
    ) -> TestResult {
        let len = (len % 32) as usize;
        if len == 0 {
            return TestResult::discard();
        }
        let (mut state, _) = state(identifiers(len));
        for _ in 0..(before as usize % len) {
            state.advance();
        }
        let expected_current = state.current().clone();
        let expected_rest = {
            let (mut reference, _) = self::state(identifiers(len));
            for _ in 0..(before as usize % len) {
                reference.advance();
            }
            remaining(&mut reference)
        };

        let checkpoint = state.checkpoint();
        for _ in 0..consumed {
            state.advance();
        }
        state.rollback(checkpoint);

        TestResult::from_bool(
            state.current() == &expected_current && remaining(&mut state) == expected_rest,
        )
    }
    quickcheck(prop as fn(u8, u8, u8) -> TestResult);
}
