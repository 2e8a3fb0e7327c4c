//! NTSL lexer, layered on preprocessor tokens

use std::collections::VecDeque;

use crate::frontend::core::lexer::{Lexer, Token, TokenCursor, TokenKind, TokenValue};
use crate::util::span::Location;

use TokenKind::*;

fn keyword(text: &str) -> Option<TokenKind> {
    match text {
        "def" => Some(NtslDef),
        "return" => Some(NtslReturn),
        _ => None,
    }
}

/// Converts preprocessor tokens into NTSL tokens. NTSL is not
/// whitespace-sensitive, so newlines and whitespace become `Skip`.
pub struct NtslLexer<I: Iterator<Item = Token>> {
    cursor: TokenCursor<I>,
    pending: VecDeque<Token>,
}

impl<I: Iterator<Item = Token>> NtslLexer<I> {
    pub fn new(
        source: I,
        start: Location,
    ) -> Self {
        let mut lexer = Self {
            cursor: TokenCursor::new(source, start),
            pending: VecDeque::new(),
        };
        lexer.cursor.advance(&mut lexer.pending);
        lexer
    }

    fn lex_token(
        &self,
        token: Token,
    ) -> Token {
        let location = token.location.clone();
        match token.kind {
            Newline | PreprocWhitespace => Token::simple(Skip, " ", location),
            PreprocPunctuatorLeftParenthesis => Token::simple(NtslLeftParenthesis, token.text, location),
            PreprocPunctuatorRightParenthesis => Token::simple(NtslRightParenthesis, token.text, location),
            PreprocPunctuatorComma => Token::simple(NtslComma, ",", location),
            PreprocPunctuatorSemicolon => Token::simple(NtslSemicolon, ";", location),
            PreprocConstantString => Token::new(NtslString, token.text, location, token.value),
            PreprocPunctuator => {
                let kind = match token.text.as_str() {
                    "{" => NtslLeftCurlyBracket,
                    "}" => NtslRightCurlyBracket,
                    "$" => NtslVarIdentifierPrefix,
                    "=" => NtslEquals,
                    "+" => NtslAdd,
                    other => return Token::error(location, format!("Invalid punctuator token '{}'", other)),
                };
                Token::simple(kind, token.text, location)
            }
            PreprocIdentifier => {
                let kind = keyword(&token.text).unwrap_or(NtslIdentifier);
                Token::simple(kind, token.text, location)
            }
            PreprocNumber => match token.text.parse::<f32>() {
                Ok(value) => Token::new(NtslNumber, token.text, location, TokenValue::Float(value)),
                Err(_) => Token::error(location, "Invalid number"),
            },
            NtslEndFile | EndOfFile => token,
            other => Token::error(location, format!("Invalid token {}", other)),
        }
    }
}

impl<I: Iterator<Item = Token>> Lexer for NtslLexer<I> {
    fn parse_next_token(&mut self) -> Token {
        let Some(token) = self.cursor.take() else {
            return Token::eof(self.cursor.location().clone());
        };
        self.cursor.advance(&mut self.pending);
        self.lex_token(token)
    }

    fn pending_queue(&mut self) -> &mut VecDeque<Token> {
        &mut self.pending
    }
}
