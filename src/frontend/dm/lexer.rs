//! DM lexer: preprocessor tokens to DM tokens
//!
//! Layered on the preprocessor's output. Recognizes keywords and compound
//! punctuators, decodes numbers and turns leading whitespace into
//! `Indent`/`Dedent` tokens outside of brackets.

use std::collections::VecDeque;

use crate::frontend::core::lexer::{Lexer, Token, TokenCursor, TokenKind, TokenValue};
use crate::util::span::Location;

/// Maps an identifier to its keyword kind
pub fn keyword(text: &str) -> Option<TokenKind> {
    Some(match text {
        "null" => TokenKind::DmNull,
        "break" => TokenKind::DmBreak,
        "continue" => TokenKind::DmContinue,
        "if" => TokenKind::DmIf,
        "else" => TokenKind::DmElse,
        "for" => TokenKind::DmFor,
        "switch" => TokenKind::DmSwitch,
        "while" => TokenKind::DmWhile,
        "do" => TokenKind::DmDo,
        "var" => TokenKind::DmVar,
        "proc" => TokenKind::DmProc,
        "new" => TokenKind::DmNew,
        "del" => TokenKind::DmDel,
        "return" => TokenKind::DmReturn,
        "in" => TokenKind::DmIn,
        "to" => TokenKind::DmTo,
        "as" => TokenKind::DmAs,
        "set" => TokenKind::DmSet,
        "call" | "call_ext" => TokenKind::DmCall,
        "spawn" => TokenKind::DmSpawn,
        "goto" => TokenKind::DmGoto,
        "step" => TokenKind::DmStep,
        "try" => TokenKind::DmTry,
        "catch" => TokenKind::DmCatch,
        "throw" => TokenKind::DmThrow,
        _ => return None,
    })
}

fn punctuator(text: &str) -> Option<TokenKind> {
    Some(match text {
        "{" => TokenKind::DmLeftCurlyBracket,
        "/" => TokenKind::DmSlash,
        "/=" => TokenKind::DmSlashEquals,
        "=" => TokenKind::DmEquals,
        "==" => TokenKind::DmEqualsEquals,
        "!" => TokenKind::DmExclamation,
        "<>" | "!=" => TokenKind::DmExclamationEquals,
        "^" => TokenKind::DmXor,
        "^=" => TokenKind::DmXorEquals,
        "%" => TokenKind::DmModulus,
        "%=" => TokenKind::DmModulusEquals,
        "%%" => TokenKind::DmModulusModulus,
        "%%=" => TokenKind::DmModulusModulusEquals,
        "~" => TokenKind::DmTilde,
        "~=" => TokenKind::DmTildeEquals,
        "~!" => TokenKind::DmTildeExclamation,
        "&" => TokenKind::DmAnd,
        "&&" => TokenKind::DmAndAnd,
        "&&=" => TokenKind::DmAndAndEquals,
        "&=" => TokenKind::DmAndEquals,
        "+" => TokenKind::DmPlus,
        "++" => TokenKind::DmPlusPlus,
        "+=" => TokenKind::DmPlusEquals,
        "-" => TokenKind::DmMinus,
        "--" => TokenKind::DmMinusMinus,
        "-=" => TokenKind::DmMinusEquals,
        "*" => TokenKind::DmStar,
        "**" => TokenKind::DmStarStar,
        "*=" => TokenKind::DmStarEquals,
        "|" => TokenKind::DmBar,
        "||" => TokenKind::DmBarBar,
        "||=" => TokenKind::DmBarBarEquals,
        "|=" => TokenKind::DmBarEquals,
        "<" => TokenKind::DmLessThan,
        "<<" => TokenKind::DmLeftShift,
        "<=" => TokenKind::DmLessThanEquals,
        "<<=" => TokenKind::DmLeftShiftEquals,
        ">" => TokenKind::DmGreaterThan,
        ">>" => TokenKind::DmRightShift,
        ">=" => TokenKind::DmGreaterThanEquals,
        ">>=" => TokenKind::DmRightShiftEquals,
        ":=" => TokenKind::DmAssignInto,
        "[]" => TokenKind::DmDoubleSquareBracket,
        "[]=" => TokenKind::DmDoubleSquareBracketEquals,
        "::" => TokenKind::DmDoubleColon,
        _ => return None,
    })
}

/// Decode a number literal. `None` means the text is not a valid number.
pub fn parse_number(text: &str) -> Option<(TokenKind, TokenValue)> {
    match text {
        "1.#INF" | "1#INF" => return Some((TokenKind::DmFloat, TokenValue::Float(f32::INFINITY))),
        "1.#IND" | "1#IND" => return Some((TokenKind::DmFloat, TokenValue::Float(f32::NAN))),
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x") {
        if let Ok(value) = u32::from_str_radix(hex, 16) {
            return Some((TokenKind::DmInteger, TokenValue::Int(value as i32)));
        }
    }
    if let Ok(value) = text.parse::<i32>() {
        return Some((TokenKind::DmInteger, TokenValue::Int(value)));
    }
    text.parse::<f32>()
        .ok()
        .map(|value| (TokenKind::DmFloat, TokenValue::Float(value)))
}

/// Converts a preprocessor token stream into DM tokens
pub struct DmLexer<I: Iterator<Item = Token>> {
    cursor: TokenCursor<I>,
    pending: VecDeque<Token>,
    bracket_nesting: usize,
    indentation: Vec<usize>,
    track_indentation: bool,
    finished: bool,
}

impl<I: Iterator<Item = Token>> DmLexer<I> {
    pub fn new(
        source: I,
        start: Location,
    ) -> Self {
        let mut lexer = Self {
            cursor: TokenCursor::new(source, start),
            pending: VecDeque::new(),
            bracket_nesting: 0,
            indentation: vec![0],
            track_indentation: true,
            finished: false,
        };
        lexer.cursor.advance(&mut lexer.pending);
        lexer
    }

    /// Treat leading whitespace like any other whitespace
    pub fn without_indentation(mut self) -> Self {
        self.track_indentation = false;
        self
    }

    /// Current indentation width
    pub fn current_indentation(&self) -> usize {
        self.indentation.last().copied().unwrap_or(0)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        self.cursor.advance(&mut self.pending).map(|t| t.kind)
    }

    fn at_end_of_source(&self) -> bool {
        match self.cursor.current_kind() {
            None | Some(TokenKind::EndOfFile) => true,
            Some(_) => false,
        }
    }

    fn token(
        &self,
        kind: TokenKind,
        text: impl Into<String>,
        location: &Location,
    ) -> Token {
        Token::simple(kind, text, location.clone())
    }

    fn lex_newline(
        &mut self,
        newline: Token,
    ) -> Token {
        self.advance();
        if self.bracket_nesting > 0 || !self.track_indentation {
            return newline;
        }

        let current = self.current_indentation();
        let level = match self.cursor.current() {
            Some(t) if t.kind == TokenKind::PreprocWhitespace => {
                let width = t.text.chars().count();
                self.advance();
                width
            }
            _ => 0,
        };
        let location = newline.location.clone();

        if level > current {
            self.indentation.push(level);
            self.pending.push_back(newline);
            return self.token(TokenKind::DmIndent, "\t", &location);
        }
        if level < current {
            let token = if self.indentation.contains(&level) {
                newline
            } else {
                self.pending.push_back(newline);
                Token::error(location.clone(), "Invalid indentation")
            };
            loop {
                self.indentation.pop();
                self.pending
                    .push_back(self.token(TokenKind::DmDedent, "\r", &location));
                if level >= self.current_indentation() {
                    break;
                }
            }
            return token;
        }
        newline
    }

    fn lex_token(
        &mut self,
        token: Token,
    ) -> Token {
        let location = token.location.clone();
        match token.kind {
            TokenKind::PreprocWhitespace => {
                self.advance();
                self.token(TokenKind::DmWhitespace, token.text, &location)
            }
            TokenKind::PreprocPunctuatorLeftParenthesis => {
                self.bracket_nesting += 1;
                self.advance();
                self.token(TokenKind::DmLeftParenthesis, token.text, &location)
            }
            TokenKind::PreprocPunctuatorRightParenthesis => {
                self.bracket_nesting = self.bracket_nesting.saturating_sub(1);
                self.advance();
                self.token(TokenKind::DmRightParenthesis, token.text, &location)
            }
            TokenKind::PreprocPunctuatorLeftBracket => {
                self.bracket_nesting += 1;
                self.advance();
                self.token(TokenKind::DmLeftBracket, token.text, &location)
            }
            TokenKind::PreprocPunctuatorRightBracket => {
                self.bracket_nesting = self.bracket_nesting.saturating_sub(1);
                self.advance();
                self.token(TokenKind::DmRightBracket, token.text, &location)
            }
            TokenKind::PreprocPunctuatorComma => {
                self.advance();
                self.token(TokenKind::DmComma, token.text, &location)
            }
            TokenKind::PreprocPunctuatorColon => {
                self.advance();
                self.token(TokenKind::DmColon, token.text, &location)
            }
            TokenKind::PreprocPunctuatorSemicolon => {
                self.advance();
                self.token(TokenKind::DmSemicolon, token.text, &location)
            }
            TokenKind::PreprocPunctuatorQuestion => match self.advance() {
                Some(TokenKind::PreprocPunctuatorPeriod) => {
                    self.advance();
                    self.token(TokenKind::DmQuestionPeriod, "?.", &location)
                }
                Some(TokenKind::PreprocPunctuatorColon) => {
                    self.advance();
                    self.token(TokenKind::DmQuestionColon, "?:", &location)
                }
                Some(TokenKind::PreprocPunctuatorLeftBracket) => {
                    self.bracket_nesting += 1;
                    self.advance();
                    self.token(TokenKind::DmQuestionLeftBracket, "?[", &location)
                }
                _ => self.token(TokenKind::DmQuestion, "?", &location),
            },
            TokenKind::PreprocPunctuatorPeriod => match self.advance() {
                Some(TokenKind::PreprocPunctuatorPeriod) => {
                    if self.advance() == Some(TokenKind::PreprocPunctuatorPeriod) {
                        self.advance();
                        self.token(TokenKind::DmIndeterminateArgs, "...", &location)
                    } else {
                        self.token(TokenKind::DmSuperProc, "..", &location)
                    }
                }
                _ => self.token(TokenKind::DmPeriod, ".", &location),
            },
            TokenKind::PreprocPunctuator => {
                self.advance();
                let text = token.text.as_str();
                if text == "}" {
                    // A closing brace also ends the statement before it
                    self.pending
                        .push_back(self.token(TokenKind::DmRightCurlyBracket, "}", &location));
                    return self.token(TokenKind::Newline, "\n", &location);
                }
                match punctuator(text) {
                    Some(kind) => self.token(kind, text, &location),
                    None => Token::error(location, format!("Invalid punctuator token '{}'", text)),
                }
            }
            TokenKind::PreprocConstantString => {
                self.advance();
                let kind = match token.text.chars().next() {
                    Some('"') | Some('{') => TokenKind::DmConstantString,
                    Some('\'') => TokenKind::DmResource,
                    Some('@') => TokenKind::DmRawString,
                    _ => return Token::error(location, "Invalid string"),
                };
                Token::new(kind, token.text, location, token.value)
            }
            TokenKind::PreprocStringBegin => {
                self.advance();
                Token::new(TokenKind::DmStringBegin, token.text, location, token.value)
            }
            TokenKind::PreprocStringMiddle => {
                self.advance();
                Token::new(TokenKind::DmStringMiddle, token.text, location, token.value)
            }
            TokenKind::PreprocStringEnd => {
                self.advance();
                Token::new(TokenKind::DmStringEnd, token.text, location, token.value)
            }
            TokenKind::PreprocIdentifier => {
                // Escaped identifiers arrive as several adjacent tokens
                let mut text = token.text;
                while let Some(TokenKind::PreprocIdentifier | TokenKind::PreprocNumber) = self.advance() {
                    if let Some(next) = self.cursor.current() {
                        text.push_str(&next.text);
                    }
                }
                let kind = keyword(&text).unwrap_or(TokenKind::DmIdentifier);
                self.token(kind, text, &location)
            }
            TokenKind::PreprocNumber => {
                self.advance();
                match parse_number(&token.text) {
                    Some((kind, value)) => Token::new(kind, token.text, location, value),
                    None => Token::error(location, "Invalid number"),
                }
            }
            TokenKind::NtslStartFile | TokenKind::NtslEndFile => {
                self.advance();
                token
            }
            _ => {
                self.advance();
                Token::error(location, format!("Invalid token {}", token.printable_text()))
            }
        }
    }
}

impl<I: Iterator<Item = Token>> Lexer for DmLexer<I> {
    fn parse_next_token(&mut self) -> Token {
        if self.at_end_of_source() {
            let location = self.cursor.location().clone();
            if !self.finished {
                self.finished = true;
                while self.indentation.len() > 1 {
                    self.indentation.pop();
                    self.pending
                        .push_back(self.token(TokenKind::DmDedent, "\r", &location));
                }
            }
            return Token::eof(location);
        }

        let Some(token) = self.cursor.take() else {
            return Token::eof(self.cursor.location().clone());
        };
        if token.kind == TokenKind::Newline {
            return self.lex_newline(token);
        }
        self.lex_token(token)
    }

    fn pending_queue(&mut self) -> &mut VecDeque<Token> {
        &mut self.pending
    }
}

