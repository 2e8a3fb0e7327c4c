//! `#if` expression evaluation
//!
//! Works on DM tokens. Every value is an `f32`; a condition holds when the
//! result is non-zero. Precedence, loosest first:
//!
//! ```text
//! ||   &&   |   ^   &   == != ~= ~!   < <= > >=   + -   * / %   **   ! -
//! ```

use crate::frontend::core::lexer::{Token, TokenKind};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};

/// Preprocessor state visible to `#if`
pub trait IfContext {
    fn is_defined(
        &self,
        name: &str,
    ) -> bool;

    fn file_exists(
        &self,
        path: &str,
    ) -> bool;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IfExprError {
    #[error("Expected an expression")]
    MissingOperand,
    #[error("Token not accepted in preprocessor expression: {0}")]
    Unexpected(String),
    #[error("Expected ')' to close expression")]
    UnclosedParen,
}

type EvalResult = Result<f32, IfExprError>;

/// Evaluate an `#if` line. Whitespace and newline tokens are ignored.
pub fn evaluate(
    tokens: &[Token],
    context: &dyn IfContext,
    sink: &DiagnosticSink,
) -> EvalResult {
    let tokens: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t.kind, TokenKind::DmWhitespace | TokenKind::Newline))
        .collect();
    let mut evaluator = Evaluator {
        tokens,
        pos: 0,
        context,
        sink,
    };
    let value = evaluator.expression()?;
    match evaluator.current() {
        None => Ok(value),
        Some(token) => Err(IfExprError::Unexpected(token.printable_text())),
    }
}

struct Evaluator<'a> {
    tokens: Vec<&'a Token>,
    pos: usize,
    context: &'a dyn IfContext,
    sink: &'a DiagnosticSink,
}

fn truth(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl<'a> Evaluator<'a> {
    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).copied()
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn check(
        &mut self,
        kind: TokenKind,
    ) -> bool {
        if self.current_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume one of `kinds`, returning which
    fn check_any(
        &mut self,
        kinds: &[TokenKind],
    ) -> Option<TokenKind> {
        let kind = self.current_kind().filter(|k| kinds.contains(k))?;
        self.pos += 1;
        Some(kind)
    }

    fn expression(&mut self) -> EvalResult {
        self.or()
    }

    fn or(&mut self) -> EvalResult {
        let mut a = self.and()?;
        while self.check(TokenKind::DmBarBar) {
            let b = self.and()?;
            a = truth(a != 0.0 || b != 0.0);
        }
        Ok(a)
    }

    fn and(&mut self) -> EvalResult {
        let mut a = self.bit_or()?;
        while self.check(TokenKind::DmAndAnd) {
            let b = self.bit_or()?;
            a = truth(a != 0.0 && b != 0.0);
        }
        Ok(a)
    }

    fn bit_or(&mut self) -> EvalResult {
        let mut a = self.bit_xor()?;
        while self.check(TokenKind::DmBar) {
            let b = self.bit_xor()?;
            a = ((a as i32) | (b as i32)) as f32;
        }
        Ok(a)
    }

    fn bit_xor(&mut self) -> EvalResult {
        let mut a = self.bit_and()?;
        while self.check(TokenKind::DmXor) {
            let b = self.bit_and()?;
            a = ((a as i32) ^ (b as i32)) as f32;
        }
        Ok(a)
    }

    fn bit_and(&mut self) -> EvalResult {
        let mut a = self.comparison()?;
        while self.check(TokenKind::DmAnd) {
            let b = self.comparison()?;
            a = ((a as i32) & (b as i32)) as f32;
        }
        Ok(a)
    }

    fn comparison(&mut self) -> EvalResult {
        let mut a = self.relational()?;
        while let Some(op) = self.check_any(&[
            TokenKind::DmEqualsEquals,
            TokenKind::DmExclamationEquals,
            TokenKind::DmTildeEquals,
            TokenKind::DmTildeExclamation,
        ]) {
            let b = self.relational()?;
            a = match op {
                TokenKind::DmEqualsEquals | TokenKind::DmTildeEquals => truth(a == b),
                _ => truth(a != b),
            };
        }
        Ok(a)
    }

    fn relational(&mut self) -> EvalResult {
        let mut a = self.additive()?;
        while let Some(op) = self.check_any(&[
            TokenKind::DmLessThan,
            TokenKind::DmLessThanEquals,
            TokenKind::DmGreaterThan,
            TokenKind::DmGreaterThanEquals,
        ]) {
            let b = self.additive()?;
            a = match op {
                TokenKind::DmLessThan => truth(a < b),
                TokenKind::DmLessThanEquals => truth(a <= b),
                TokenKind::DmGreaterThan => truth(a > b),
                _ => truth(a >= b),
            };
        }
        Ok(a)
    }

    fn additive(&mut self) -> EvalResult {
        let mut a = self.multiplicative()?;
        while let Some(op) = self.check_any(&[TokenKind::DmPlus, TokenKind::DmMinus]) {
            let b = self.multiplicative()?;
            a = if op == TokenKind::DmPlus { a + b } else { a - b };
        }
        Ok(a)
    }

    fn multiplicative(&mut self) -> EvalResult {
        let mut a = self.power()?;
        while let Some(op) = self.check_any(&[TokenKind::DmStar, TokenKind::DmSlash, TokenKind::DmModulus]) {
            let b = self.power()?;
            a = match op {
                TokenKind::DmStar => a * b,
                TokenKind::DmSlash => a / b,
                _ => a % b,
            };
        }
        Ok(a)
    }

    fn power(&mut self) -> EvalResult {
        let a = self.unary()?;
        if self.check(TokenKind::DmStarStar) {
            // Right associative
            let b = self.power()?;
            return Ok(a.powf(b));
        }
        Ok(a)
    }

    fn unary(&mut self) -> EvalResult {
        if self.check(TokenKind::DmExclamation) {
            let value = self.unary()?;
            return Ok(truth(value == 0.0));
        }
        if self.check(TokenKind::DmMinus) {
            return Ok(-self.unary()?);
        }
        if self.check(TokenKind::DmPlus) {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> EvalResult {
        let Some(token) = self.current() else {
            return Err(IfExprError::MissingOperand);
        };
        match token.kind {
            TokenKind::DmLeftParenthesis => {
                self.pos += 1;
                let inner = self.expression()?;
                if !self.check(TokenKind::DmRightParenthesis) {
                    return Err(IfExprError::UnclosedParen);
                }
                Ok(inner)
            }
            TokenKind::DmInteger | TokenKind::DmFloat => {
                self.pos += 1;
                token
                    .as_float()
                    .ok_or_else(|| IfExprError::Unexpected(token.printable_text()))
            }
            TokenKind::DmNull => {
                self.pos += 1;
                Ok(0.0)
            }
            TokenKind::DmIdentifier if token.text == "defined" => {
                self.pos += 1;
                let name = self.call_argument(token, &[TokenKind::DmIdentifier])?;
                Ok(truth(self.context.is_defined(&name)))
            }
            TokenKind::DmIdentifier if token.text == "fexists" => {
                self.pos += 1;
                let path = self.call_argument(token, &[TokenKind::DmConstantString, TokenKind::DmRawString])?;
                Ok(truth(self.context.file_exists(&path)))
            }
            _ => Err(IfExprError::Unexpected(token.printable_text())),
        }
    }

    /// Argument of `defined(X)` or `fexists("X")`. The parentheses may be
    /// left off entirely.
    fn call_argument(
        &mut self,
        name: &Token,
        accepted: &[TokenKind],
    ) -> Result<String, IfExprError> {
        let parenthesized = self.check(TokenKind::DmLeftParenthesis);
        let argument = match self.current() {
            Some(token) if accepted.contains(&token.kind) => {
                self.pos += 1;
                token.value_or_text().to_string()
            }
            Some(token) => return Err(IfExprError::Unexpected(token.printable_text())),
            None => return Err(IfExprError::MissingOperand),
        };
        if parenthesized && !self.check(TokenKind::DmRightParenthesis) {
            self.sink.emit(
                WarningCode::DefinedMissingParen,
                name.location.clone(),
                format!("Missing ')' after {}(", name.text),
            );
        }
        Ok(argument)
    }
}
