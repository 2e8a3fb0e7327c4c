//! Parser state and error handling
//!
//! Tokens pulled from the lexer are kept in an arena so that a checkpoint is
//! just a saved cursor. Diagnostic tokens are reported when they are pulled
//! and never enter the arena, so rolling back cannot report them twice.
//!
//! A missing `)` or `]` leaves the lexer inside brackets, where layout is
//! not tracked, so everything up to the next line break outside brackets
//! belongs to the broken construct. The state records bracket depth per
//! token and stays quiet until the cursor reaches such a line break.

use crate::frontend::core::lexer::{Lexer, Token, TokenKind};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;

/// Unwinds the current construct to the nearest statement boundary.
///
/// The diagnostic describing the problem has already been recorded by the
/// time this is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{location}: {message}")]
pub struct ParseAbort {
    pub location: Location,
    pub message: String,
}

pub type ParseResult<T> = Result<T, ParseAbort>;

/// Saved parser position.
///
/// Must be handed back to either [`ParserState::rollback`] or
/// [`ParserState::commit`].
#[must_use = "a checkpoint must be rolled back or committed"]
#[derive(Debug)]
pub struct Checkpoint {
    pos: usize,
}

/// Token buffer and cursor shared by every recursive-descent parser
pub struct ParserState<L: Lexer> {
    lexer: L,
    tokens: Vec<Token>,
    /// Always a valid index into `tokens`
    pos: usize,
    sink: DiagnosticSink,
    can_unread: bool,
    open_checkpoints: usize,
    /// Bracket depth at which each token in `tokens` was lexed
    depths: Vec<usize>,
    depth: usize,
    /// Parser diagnostics are dropped until the next top-level boundary
    recovering: bool,
}

impl<L: Lexer> ParserState<L> {
    pub fn new(
        lexer: L,
        sink: DiagnosticSink,
    ) -> Self {
        let mut state = Self {
            lexer,
            tokens: Vec::new(),
            pos: 0,
            sink,
            can_unread: false,
            open_checkpoints: 0,
            depths: Vec::new(),
            depth: 0,
            recovering: false,
        };
        state.pull();
        state
    }

    #[inline]
    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    #[inline]
    pub fn lexer(&self) -> &L {
        &self.lexer
    }

    /// Pull one non-diagnostic token from the lexer into the arena
    fn pull(&mut self) {
        if self
            .tokens
            .last()
            .is_some_and(|t| t.kind == TokenKind::EndOfFile)
        {
            return;
        }
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::Error => {
                    let message = token.value_or_text().to_string();
                    self.sink.emit(WarningCode::BadToken, token.location, message);
                }
                TokenKind::Warning => {
                    let message = token.value_or_text().to_string();
                    self.sink.forced_warning(token.location, message);
                }
                _ => {
                    self.depths.push(self.depth);
                    self.depth = match token.kind {
                        TokenKind::DmLeftParenthesis | TokenKind::DmLeftBracket | TokenKind::DmQuestionLeftBracket => {
                            self.depth + 1
                        }
                        TokenKind::DmRightParenthesis | TokenKind::DmRightBracket => self.depth.saturating_sub(1),
                        _ => self.depth,
                    };
                    self.tokens.push(token);
                    return;
                }
            }
        }
    }

    /// Make sure `tokens[index]` exists, or that the arena ends in EOF
    fn fill(
        &mut self,
        index: usize,
    ) {
        while self.tokens.len() <= index {
            let before = self.tokens.len();
            self.pull();
            if self.tokens.len() == before {
                break;
            }
        }
    }

    /// Current token, not consumed
    #[inline]
    pub fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    #[inline]
    pub fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.current().location.clone()
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.current_kind() == TokenKind::EndOfFile
    }

    /// Token `n` places after the current one. Past the end this is EOF.
    pub fn peek_nth(
        &mut self,
        n: usize,
    ) -> &Token {
        let index = self.pos + n;
        self.fill(index);
        let last = self.tokens.len() - 1;
        &self.tokens[index.min(last)]
    }

    /// Move to the next token and return it
    pub fn advance(&mut self) -> &Token {
        if self.current_kind() != TokenKind::EndOfFile {
            self.fill(self.pos + 1);
            if self.pos + 1 < self.tokens.len() {
                self.pos += 1;
            }
        }
        self.can_unread = true;
        if self.recovering && self.at_boundary() {
            self.recovering = false;
        }
        self.current()
    }

    /// A line break, block edge or EOF outside of every bracket
    pub fn at_boundary(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Newline
                | TokenKind::DmSemicolon
                | TokenKind::DmIndent
                | TokenKind::DmDedent
                | TokenKind::EndOfFile
        ) && self.depths.get(self.pos).copied().unwrap_or(0) == 0
    }

    /// Stop reporting parser diagnostics until the next boundary
    pub fn recover(&mut self) {
        if !self.at_boundary() {
            self.recovering = true;
        }
    }

    #[inline]
    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    /// Consume the current token and return it
    pub fn bump(&mut self) -> Token {
        let token = self.current().clone();
        self.advance();
        token
    }

    /// Push the previous token back, making it current again.
    ///
    /// Only one token may be unread between advances.
    pub fn unread(&mut self) {
        debug_assert!(self.can_unread, "only one token may be unread");
        if self.can_unread && self.pos > 0 {
            self.pos -= 1;
        }
        self.can_unread = false;
    }

    /// Consume the current token if it is `kind`
    pub fn check(
        &mut self,
        kind: TokenKind,
    ) -> bool {
        if self.current_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the current token if it is any of `kinds`, returning it
    pub fn check_any(
        &mut self,
        kinds: &[TokenKind],
    ) -> Option<Token> {
        if kinds.contains(&self.current_kind()) {
            Some(self.bump())
        } else {
            None
        }
    }

    /// Like `check`, but a mismatch records `BadToken` with `message`.
    ///
    /// A missing closing bracket also starts recovery.
    pub fn consume(
        &mut self,
        kind: TokenKind,
        message: &str,
    ) -> bool {
        if self.check(kind) {
            return true;
        }
        self.emit(WarningCode::BadToken, message);
        if matches!(kind, TokenKind::DmRightParenthesis | TokenKind::DmRightBracket) {
            self.recover();
        }
        false
    }

    /// Like `check_any`, but a mismatch records `BadToken` with `message`
    pub fn consume_any(
        &mut self,
        kinds: &[TokenKind],
        message: &str,
    ) -> Option<TokenKind> {
        match self.check_any(kinds) {
            Some(token) => Some(token.kind),
            None => {
                self.emit(WarningCode::BadToken, message);
                None
            }
        }
    }

    /// Record `code` at the current token. Returns true when it is an error.
    pub fn emit(
        &self,
        code: WarningCode,
        message: impl Into<String>,
    ) -> bool {
        self.emit_at(code, self.location(), message)
    }

    pub fn emit_at(
        &self,
        code: WarningCode,
        location: Location,
        message: impl Into<String>,
    ) -> bool {
        if self.recovering {
            return self.sink.level(code).is_error();
        }
        self.sink.emit(code, location, message)
    }

    pub fn warning(
        &self,
        location: Location,
        message: impl Into<String>,
    ) {
        self.sink.forced_warning(location, message);
    }

    /// Record a `BadToken` error and build the abort that unwinds the
    /// current construct. Inside brackets this also starts recovery.
    pub fn error(
        &mut self,
        message: impl Into<String>,
    ) -> ParseAbort {
        let message = message.into();
        let location = self.location();
        self.emit_at(WarningCode::BadToken, location.clone(), message.clone());
        if self.depths.get(self.pos).copied().unwrap_or(0) > 0 {
            self.recover();
        }
        ParseAbort { location, message }
    }

    /// Open a speculative parse
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint { pos: self.pos }
    }

    /// Rewind to exactly where `checkpoint` was opened
    pub fn rollback(
        &mut self,
        checkpoint: Checkpoint,
    ) {
        self.pos = checkpoint.pos;
        self.can_unread = false;
        self.close_checkpoint();
    }

    /// Keep everything consumed since `checkpoint` was opened
    pub fn commit(
        &mut self,
        checkpoint: Checkpoint,
    ) {
        debug_assert!(checkpoint.pos <= self.pos);
        self.close_checkpoint();
    }

    fn close_checkpoint(&mut self) {
        debug_assert!(self.open_checkpoints > 0);
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
    }

    /// Run `f` speculatively. `None` (or an abort) rewinds the cursor.
    pub fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<Option<T>>,
    ) -> Option<T> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(Some(value)) => {
                self.commit(checkpoint);
                Some(value)
            }
            _ => {
                self.rollback(checkpoint);
                None
            }
        }
    }

    /// Checkpoints opened and not yet closed
    #[inline]
    pub fn open_checkpoints(&self) -> usize {
        self.open_checkpoints
    }

    /// Index of the current token in the arena
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Tokens consumed since the cursor was at `start`
    pub fn consumed_since(
        &self,
        start: usize,
    ) -> &[Token] {
        &self.tokens[start.min(self.pos)..self.pos]
    }

    /// Skip tokens until one of `kinds` (or EOF) is current
    pub fn skip_until(
        &mut self,
        kinds: &[TokenKind],
    ) {
        while !self.at_end() && !kinds.contains(&self.current_kind()) {
            self.advance();
        }
    }
}
