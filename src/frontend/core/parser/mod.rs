//! Parser framework
//!
//! Every grammar in the crate drives a [`ParserState`]: a buffered cursor
//! over one lexer with single-token pushback and nestable checkpoints.
//! Productions return [`ParseResult`]; a recoverable problem is recorded in
//! the sink and answered with a placeholder, while a [`ParseAbort`] unwinds
//! to the nearest statement boundary.

pub mod parser_state;
#[cfg(test)]
mod tests;

pub use parser_state::{Checkpoint, ParseAbort, ParseResult, ParserState};
