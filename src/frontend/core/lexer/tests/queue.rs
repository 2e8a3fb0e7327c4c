//! Pending queue tests

use std::collections::VecDeque;

use super::{tok, Token, TokenKind};
use crate::frontend::core::lexer::Lexer;

/// Produces a scripted sequence of "units"; each unit may expand to several
/// tokens, the first of which is returned and the rest queued.
struct ScriptedLexer {
    units: VecDeque<Vec<Token>>,
    pending: VecDeque<Token>,
}

impl ScriptedLexer {
    fn new(units: Vec<Vec<Token>>) -> Self {
        Self {
            units: units.into(),
            pending: VecDeque::new(),
        }
    }
}

impl Lexer for ScriptedLexer {
    fn parse_next_token(&mut self) -> Token {
        let Some(mut unit) = self.units.pop_front() else {
            return tok(TokenKind::EndOfFile, "", 99);
        };
        let last = unit.pop().unwrap();
        self.pending.extend(unit);
        last
    }

    fn pending_queue(&mut self) -> &mut VecDeque<Token> {
        &mut self.pending
    }
}

fn kinds(lexer: &mut impl Lexer) -> Vec<TokenKind> {
    let mut out = Vec::new();
    loop {
        let token = lexer.next_token();
        out.push(token.kind);
        if token.kind == TokenKind::EndOfFile {
            return out;
        }
    }
}

#[test]
fn test_skip_tokens_are_dropped() {
    let mut lexer = ScriptedLexer::new(vec![
        vec![tok(TokenKind::Skip, " ", 1)],
        vec![tok(TokenKind::DmIdentifier, "a", 2)],
        vec![tok(TokenKind::Skip, " ", 3)],
        vec![tok(TokenKind::Skip, " ", 4)],
        vec![tok(TokenKind::DmPlus, "+", 5)],
    ]);
    assert_eq!(
        kinds(&mut lexer),
        vec![TokenKind::DmIdentifier, TokenKind::DmPlus, TokenKind::EndOfFile]
    );
}

#[test]
fn test_queued_tokens_come_first() {
    let mut lexer = ScriptedLexer::new(vec![vec![
        tok(TokenKind::DmStringBegin, "\"a[", 1),
        tok(TokenKind::DmIdentifier, "x", 4),
        tok(TokenKind::DmStringEnd, "]\"", 5),
    ]]);
    assert_eq!(
        kinds(&mut lexer),
        vec![
            TokenKind::DmStringBegin,
            TokenKind::DmIdentifier,
            TokenKind::DmStringEnd,
            TokenKind::EndOfFile
        ]
    );
}

#[test]
fn test_queue_drains_before_parsing_again() {
    let mut lexer = ScriptedLexer::new(vec![
        vec![
            tok(TokenKind::Newline, "\n", 1),
            tok(TokenKind::DmIndent, "", 2),
        ],
        vec![tok(TokenKind::DmVar, "var", 3)],
    ]);
    assert_eq!(lexer.next_token().kind, TokenKind::Newline);
    assert_eq!(lexer.next_token().kind, TokenKind::DmIndent);
    assert_eq!(lexer.next_token().kind, TokenKind::DmVar);
}
