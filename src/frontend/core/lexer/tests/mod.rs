//! Lexer framework tests
//!
//! - queue: pending-queue ordering and skip handling
//! - cursor: layered lexing over an upstream token stream

mod queue;

use std::sync::Arc;

use super::{Token, TokenKind};
use crate::util::span::Location;

fn loc(column: u32) -> Location {
    Location::new(Arc::from("test.dm"), 1, column)
}

fn tok(
    kind: TokenKind,
    text: &str,
    column: u32,
) -> Token {
    Token::simple(kind, text, loc(column))
}
