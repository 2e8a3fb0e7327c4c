//! Pull-based lexer framework
//!
//! Every lexer in the crate implements [`Lexer`]: it produces one token per
//! call to `parse_next_token` and may stash extra tokens in its pending queue
//! when one unit of input expands to several tokens. Callers only ever use
//! `next_token`, which drains the queue first and drops `Skip` tokens.
//!
//! Lexers can be stacked. A lexer reading another stage's tokens wraps them
//! in a [`TokenCursor`], which forwards upstream `Error`/`Warning` tokens
//! untouched.

pub mod tokens;

use std::collections::VecDeque;

pub use tokens::{Token, TokenKind, TokenValue};

use crate::util::span::Location;

/// A single-use token producer
pub trait Lexer {
    /// Produce one token. Extra tokens may be pushed onto `pending_queue`.
    fn parse_next_token(&mut self) -> Token;

    /// Tokens already produced but not yet returned
    fn pending_queue(&mut self) -> &mut VecDeque<Token>;

    /// Next non-skippable token, in production order
    fn next_token(&mut self) -> Token {
        if let Some(token) = self.pending_queue().pop_front() {
            return token;
        }

        let mut token = self.parse_next_token();
        while token.kind == TokenKind::Skip {
            token = self.parse_next_token();
        }

        // Tokens queued while producing `token` were produced before it
        let queue = self.pending_queue();
        match queue.pop_front() {
            Some(front) => {
                queue.push_back(token);
                front
            }
            None => token,
        }
    }

    /// Iterate tokens up to, not including, the end of file
    fn into_tokens(self) -> Tokens<Self>
    where
        Self: Sized,
    {
        Tokens {
            lexer: self,
            done: false,
        }
    }
}

/// Iterator adapter returned by [`Lexer::into_tokens`]
pub struct Tokens<L: Lexer> {
    lexer: L,
    done: bool,
}

impl<L: Lexer> Tokens<L> {
    pub fn lexer(&self) -> &L {
        &self.lexer
    }
}

impl<L: Lexer> Iterator for Tokens<L> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let token = self.lexer.next_token();
        if token.kind == TokenKind::EndOfFile {
            self.done = true;
            return None;
        }
        Some(token)
    }
}

/// Cursor over an upstream token stream, for layered lexers.
///
/// Holds one current token. Upstream diagnostic tokens never become current;
/// `advance` moves them onto the caller's pending queue instead.
pub struct TokenCursor<I: Iterator<Item = Token>> {
    source: I,
    current: Option<Token>,
    location: Location,
    at_end: bool,
}

impl<I: Iterator<Item = Token>> TokenCursor<I> {
    pub fn new(
        source: I,
        start: Location,
    ) -> Self {
        Self {
            source,
            current: None,
            location: start,
            at_end: false,
        }
    }

    /// Step to the next upstream token
    pub fn advance(
        &mut self,
        pending: &mut VecDeque<Token>,
    ) -> Option<&Token> {
        loop {
            match self.source.next() {
                Some(token) if token.kind.is_diagnostic() => pending.push_back(token),
                Some(token) => {
                    self.location = token.location.clone();
                    self.current = Some(token);
                    break;
                }
                None => {
                    self.current = None;
                    self.at_end = true;
                    break;
                }
            }
        }
        self.current.as_ref()
    }

    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    #[inline]
    pub fn current_kind(&self) -> Option<TokenKind> {
        self.current.as_ref().map(|t| t.kind)
    }

    /// Take ownership of the current token, leaving the cursor empty until
    /// the next `advance`
    #[inline]
    pub fn take(&mut self) -> Option<Token> {
        self.current.take()
    }

    /// Location of the current token, or of the last one seen
    #[inline]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.at_end
    }
}

/// Lexer over tokens that already exist, ending in EOF when they run out
pub struct TokenListLexer {
    tokens: std::vec::IntoIter<Token>,
    pending: VecDeque<Token>,
    end: Location,
}

impl TokenListLexer {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens
            .last()
            .map(|t| t.location.clone())
            .unwrap_or(Location::UNKNOWN);
        Self {
            tokens: tokens.into_iter(),
            pending: VecDeque::new(),
            end,
        }
    }
}

impl Lexer for TokenListLexer {
    fn parse_next_token(&mut self) -> Token {
        match self.tokens.next() {
            Some(token) => token,
            None => Token::eof(self.end.clone()),
        }
    }

    fn pending_queue(&mut self) -> &mut VecDeque<Token> {
        &mut self.pending
    }
}

#[cfg(test)]
mod tests;
