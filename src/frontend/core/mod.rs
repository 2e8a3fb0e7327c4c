//! Grammar-independent lexing and parsing machinery

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Token, TokenCursor, TokenKind, TokenListLexer, TokenValue, Tokens};
pub use parser::{Checkpoint, ParseAbort, ParseResult, ParserState};
