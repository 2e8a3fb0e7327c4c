//! Preprocessor lexer: raw text to preprocessor tokens
//!
//! Strings containing `[expr]` are split into `StringBegin`, the tokens of
//! each embedded expression, `StringMiddle` and `StringEnd`. String segments
//! keep their escapes; decoding happens in the DM parser.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::frontend::core::lexer::{Lexer, Token, TokenKind, TokenValue};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;

/// Lexes one source file
pub struct PreprocessorLexer {
    /// Logical path of the file, used in locations and for relative includes
    file: Arc<str>,
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    pending: VecDeque<Token>,
    sink: DiagnosticSink,
}

impl PreprocessorLexer {
    pub fn new(
        file: impl Into<Arc<str>>,
        source: &str,
        sink: DiagnosticSink,
    ) -> Self {
        Self {
            file: file.into(),
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            pending: VecDeque::new(),
            sink,
        }
    }

    #[inline]
    pub fn file(&self) -> &Arc<str> {
        &self.file
    }

    #[inline]
    fn current(&self) -> char {
        self.chars.get(self.index).copied().unwrap_or('\0')
    }

    #[inline]
    fn peek(&self) -> char {
        self.chars.get(self.index + 1).copied().unwrap_or('\0')
    }

    #[inline]
    fn advance(&mut self) -> char {
        if self.index < self.chars.len() {
            self.index += 1;
            self.column += 1;
        }
        self.current()
    }

    #[inline]
    fn at_end_of_source(&self) -> bool {
        self.current() == '\0'
    }

    #[inline]
    fn at_line_end(&self) -> bool {
        matches!(self.current(), '\r' | '\n')
    }

    #[inline]
    fn location(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.column)
    }

    /// Consume one line ending (`\n`, `\r\n` or a lone `\r`) if present
    fn handle_line_end(&mut self) -> bool {
        let mut c = self.current();
        match c {
            '\r' | '\n' => {
                while c == '\r' {
                    c = self.advance();
                }
                if c == '\n' {
                    self.advance();
                }
                self.line += 1;
                self.column = 1;
                true
            }
            _ => false,
        }
    }

    fn punct(
        &mut self,
        kind: TokenKind,
        text: &str,
        location: Location,
    ) -> Token {
        for _ in 0..text.chars().count() {
            self.advance();
        }
        Token::simple(kind, text, location)
    }

    /// Longest match among `candidates`, which must all start with the
    /// current character
    fn operator(
        &mut self,
        candidates: &[&str],
        location: Location,
    ) -> Token {
        let rest: String = self.chars[self.index..]
            .iter()
            .take(3)
            .collect();
        let text = candidates
            .iter()
            .filter(|c| rest.starts_with(*c))
            .max_by_key(|c| c.len())
            .copied()
            .unwrap_or(candidates[0]);
        self.punct(TokenKind::PreprocPunctuator, text, location)
    }

    /// Lex one unit of input into `out`
    fn lex(
        &mut self,
        out: &mut Vec<Token>,
    ) {
        let location = self.location();
        let c = self.current();
        let token = match c {
            '\0' => Token::eof(location),
            '\r' | '\n' => {
                self.handle_line_end();
                Token::simple(TokenKind::Newline, "\n", location)
            }
            ' ' | '\t' => {
                let mut text = String::new();
                while matches!(self.current(), ' ' | '\t') {
                    text.push(self.current());
                    self.advance();
                }
                Token::simple(TokenKind::PreprocWhitespace, text, location)
            }
            '}' => self.punct(TokenKind::PreprocPunctuator, "}", location),
            ';' => self.punct(TokenKind::PreprocPunctuatorSemicolon, ";", location),
            '.' => self.punct(TokenKind::PreprocPunctuatorPeriod, ".", location),
            ',' => self.punct(TokenKind::PreprocPunctuatorComma, ",", location),
            '(' => self.punct(TokenKind::PreprocPunctuatorLeftParenthesis, "(", location),
            ')' => self.punct(TokenKind::PreprocPunctuatorRightParenthesis, ")", location),
            ']' => self.punct(TokenKind::PreprocPunctuatorRightBracket, "]", location),
            '?' => self.punct(TokenKind::PreprocPunctuatorQuestion, "?", location),
            '$' => self.punct(TokenKind::PreprocPunctuator, "$", location),
            ':' => match self.peek() {
                '=' => self.punct(TokenKind::PreprocPunctuator, ":=", location),
                ':' => self.punct(TokenKind::PreprocPunctuator, "::", location),
                _ => self.punct(TokenKind::PreprocPunctuatorColon, ":", location),
            },
            '[' => {
                if self.peek() == ']' {
                    self.operator(&["[]", "[]="], location)
                } else {
                    self.punct(TokenKind::PreprocPunctuatorLeftBracket, "[", location)
                }
            }
            '\\' => {
                let next = self.advance();
                if self.handle_line_end() {
                    Token::simple(TokenKind::PreprocLineSplice, "\\", location)
                } else {
                    // An escaped character is an identifier on its own
                    self.advance();
                    Token::simple(TokenKind::PreprocIdentifier, next.to_string(), location)
                }
            }
            '>' => self.operator(&[">", ">>", ">=", ">>="], location),
            '<' => self.operator(&["<", "<<", "<=", "<>", "<<="], location),
            '|' => self.operator(&["|", "||", "|=", "||="], location),
            '*' => self.operator(&["*", "**", "*="], location),
            '+' => self.operator(&["+", "++", "+="], location),
            '&' => self.operator(&["&", "&&", "&=", "&&="], location),
            '~' => self.operator(&["~", "~=", "~!"], location),
            '%' => self.operator(&["%", "%=", "%%", "%%="], location),
            '^' => self.operator(&["^", "^="], location),
            '!' => self.operator(&["!", "!="], location),
            '=' => self.operator(&["=", "=="], location),
            '-' => self.operator(&["-", "--", "-="], location),
            '/' => match self.peek() {
                '/' => {
                    self.skip_line_comment();
                    Token::simple(TokenKind::Skip, "", location)
                }
                '*' => match self.skip_block_comment() {
                    true => Token::simple(TokenKind::Skip, "", location),
                    false => Token::error(location, "Expected \"*/\" to end multiline comment"),
                },
                _ => self.operator(&["/", "/="], location),
            },
            '@' => self.lex_raw_string(location),
            '\'' | '"' => return self.lex_string(false, out),
            '{' => {
                if self.peek() == '"' {
                    self.advance();
                    return self.lex_string(true, out);
                }
                self.punct(TokenKind::PreprocPunctuator, "{", location)
            }
            '#' => self.lex_directive(location),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while self.current().is_ascii_alphanumeric() || self.current() == '_' {
                    text.push(self.current());
                    self.advance();
                }
                Token::simple(TokenKind::PreprocIdentifier, text, location)
            }
            c if c.is_ascii_digit() => self.lex_number(location),
            c => {
                self.advance();
                Token::error(location, format!("Unknown character: {}", c))
            }
        };
        out.push(token);
    }

    fn skip_line_comment(&mut self) {
        while !self.at_line_end() && !self.at_end_of_source() {
            if self.current() == '\\' {
                self.advance();
                if self.handle_line_end() {
                    // A spliced line continues the comment
                    while matches!(self.current(), ' ' | '\t') || self.handle_line_end() {
                        self.advance();
                    }
                    continue;
                }
            }
            self.advance();
        }
    }

    /// Returns false when the source ends inside the comment
    fn skip_block_comment(&mut self) -> bool {
        self.advance();
        self.advance();
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                '\0' => return false,
                '/' if self.peek() == '*' => {
                    depth += 1;
                    self.advance();
                    self.advance();
                }
                '/' if self.peek() == '/' => {
                    while !self.at_line_end() && !self.at_end_of_source() {
                        self.advance();
                    }
                }
                '*' if self.peek() == '/' => {
                    depth -= 1;
                    self.advance();
                    self.advance();
                }
                _ => {
                    if !self.handle_line_end() {
                        self.advance();
                    }
                }
            }
        }
        while matches!(self.current(), ' ' | '\t') {
            self.advance();
        }
        true
    }

    /// `@X...X` or `@{"..."}`; no escapes, no interpolation
    fn lex_raw_string(
        &mut self,
        location: Location,
    ) -> Token {
        let delimiter = self.advance();
        let mut text = String::from('@');
        text.push(delimiter);
        let mut c = self.advance();

        let is_long = delimiter == '{' && c == '"';
        if is_long {
            text.push(c);
            let mut can_terminate = false;
            loop {
                c = self.advance();
                if c == '\0' {
                    return Token::error(location, "Expected '}' to end long string");
                }
                if can_terminate && c == '}' {
                    break;
                }
                text.push(c);
                can_terminate = c == '"';
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                }
            }
            text.push('}');
            self.advance();
            let value: String = text.chars().skip(3).take(text.chars().count() - 5).collect();
            return Token::new(
                TokenKind::PreprocConstantString,
                text,
                location,
                TokenValue::Str(value),
            );
        }

        while c != delimiter && !self.at_line_end() && !self.at_end_of_source() {
            text.push(c);
            c = self.advance();
        }
        if c != delimiter {
            return Token::error(location, format!("Expected '{}' to end string", delimiter));
        }
        text.push(c);
        self.advance();
        let value: String = text.chars().skip(2).take(text.chars().count() - 3).collect();
        Token::new(
            TokenKind::PreprocConstantString,
            text,
            location,
            TokenValue::Str(value),
        )
    }

    /// Lex a quoted string starting at its terminator character.
    ///
    /// Pushes either one `ConstantString`, one `Error`, or the full
    /// `StringBegin ... StringEnd` sequence.
    fn lex_string(
        &mut self,
        is_long: bool,
        out: &mut Vec<Token>,
    ) {
        let mut location = self.location();
        let terminator = self.current();
        let opening = if is_long {
            format!("{{{}", terminator)
        } else {
            terminator.to_string()
        };
        let mut text = opening.clone();
        let mut value = String::new();
        let mut pieces: Vec<Token> = Vec::new();
        let mut closed = false;

        self.advance();
        while !(!is_long && self.at_line_end()) && !self.at_end_of_source() {
            let c = self.current();
            if c == '[' {
                text.push('[');
                let kind = if pieces.is_empty() {
                    TokenKind::PreprocStringBegin
                } else {
                    TokenKind::PreprocStringMiddle
                };
                pieces.push(Token::new(
                    kind,
                    std::mem::take(&mut text),
                    location.clone(),
                    TokenValue::Str(std::mem::take(&mut value)),
                ));
                self.advance();

                if !self.lex_interpolation(&mut pieces) {
                    out.push(Token::error(self.location(), "Expected ']' to end expression"));
                    return;
                }
                location = self.location();
                text.push(']');
                self.advance();
            } else if c == '\\' {
                self.advance();
                if self.at_line_end() {
                    // Splice: drop the backslash, the line end and leading whitespace
                    loop {
                        if self.handle_line_end() {
                            continue;
                        }
                        if matches!(self.current(), ' ' | '\t') {
                            self.advance();
                            continue;
                        }
                        break;
                    }
                } else if !self.at_end_of_source() {
                    text.push('\\');
                    text.push(self.current());
                    value.push('\\');
                    value.push(self.current());
                    self.advance();
                }
            } else if c == terminator {
                self.advance();
                if !is_long {
                    text.push(c);
                    closed = true;
                    break;
                }
                if self.current() == '}' {
                    text.push(c);
                    text.push('}');
                    self.advance();
                    closed = true;
                    break;
                }
                text.push(c);
                value.push(c);
            } else {
                text.push(c);
                value.push(c);
                if !self.handle_line_end() {
                    self.advance();
                } else {
                    text.pop();
                    value.pop();
                    text.push('\n');
                    value.push('\n');
                }
            }
        }

        if !closed {
            let message = if is_long {
                "Expected '}' to end long string".to_string()
            } else {
                format!("Expected '{}' to end string", terminator)
            };
            out.push(Token::error(location, message));
            return;
        }

        if pieces.is_empty() {
            out.push(Token::new(
                TokenKind::PreprocConstantString,
                text,
                location,
                TokenValue::Str(value),
            ));
        } else {
            out.extend(pieces);
            out.push(Token::new(
                TokenKind::PreprocStringEnd,
                text,
                location,
                TokenValue::Str(value),
            ));
        }
    }

    /// Lex tokens up to the `]` closing an interpolation. Returns false if
    /// the source ends first.
    fn lex_interpolation(
        &mut self,
        pieces: &mut Vec<Token>,
    ) -> bool {
        let mut nesting = 0usize;
        loop {
            if self.at_end_of_source() {
                return false;
            }
            if self.current() == ']' && nesting == 0 {
                return true;
            }
            let mut tokens = Vec::new();
            self.lex(&mut tokens);
            for token in tokens {
                match token.kind {
                    TokenKind::PreprocPunctuatorLeftBracket => nesting += 1,
                    TokenKind::PreprocPunctuatorRightBracket => nesting = nesting.saturating_sub(1),
                    TokenKind::Skip => continue,
                    TokenKind::EndOfFile => return false,
                    _ => {}
                }
                pieces.push(token);
            }
        }
    }

    fn lex_number(
        &mut self,
        location: Location,
    ) -> Token {
        let mut text = String::new();
        let mut c = self.current();
        text.push(c);
        loop {
            let mut next = self.advance();
            if matches!(c, 'e' | 'E') && matches!(next, '-' | '+') {
                text.push(next);
                next = self.advance();
            } else if c == '#' && next == 'I' {
                // 1.#INF and 1.#IND
                let n = self.advance();
                let last = self.advance();
                if n != 'N' || !matches!(last, 'F' | 'D') {
                    self.advance();
                    return Token::error(location, "Invalid number");
                }
                text.push_str("IN");
                text.push(last);
                next = self.advance();
            }
            c = next;
            if c.is_ascii_hexdigit() || matches!(c, '.' | 'x' | '#' | 'e' | 'E' | 'p' | 'P') {
                text.push(c);
            } else {
                break;
            }
        }
        Token::simple(TokenKind::PreprocNumber, text, location)
    }

    fn lex_directive(
        &mut self,
        location: Location,
    ) -> Token {
        let is_concat = self.advance() == '#';
        if is_concat {
            self.advance();
        }
        while matches!(self.current(), ' ' | '\t') {
            self.advance();
        }
        let mut name = String::new();
        while self.current().is_ascii_alphabetic() || self.current() == '_' {
            name.push(self.current());
            self.advance();
        }

        if name.is_empty() {
            return Token::simple(TokenKind::Skip, "", location);
        }
        if is_concat {
            return Token::new(
                TokenKind::PreprocTokenConcat,
                format!("##{}", name),
                location,
                TokenValue::Str(name),
            );
        }
        if let Some(token) = self.directive_keyword(&name, &location) {
            return token;
        }

        let lowered = name.to_ascii_lowercase();
        if directive_kind(&lowered).is_some() {
            self.sink.emit(
                WarningCode::MiscapitalizedDirective,
                location.clone(),
                format!(
                    "#{} is not a valid macro keyword. Did you mean '#{}'?",
                    name, lowered
                ),
            );
            if let Some(token) = self.directive_keyword(&lowered, &location) {
                return token;
            }
        }

        Token::new(
            TokenKind::PreprocParameterStringify,
            format!("#{}", name),
            location,
            TokenValue::Str(name),
        )
    }

    fn directive_keyword(
        &mut self,
        name: &str,
        location: &Location,
    ) -> Option<Token> {
        let kind = directive_kind(name)?;
        let text = match kind {
            TokenKind::PreprocWarning | TokenKind::PreprocError => {
                let mut rest = String::new();
                while !self.at_end_of_source() && !self.at_line_end() {
                    rest.push(self.current());
                    self.advance();
                }
                let prefix = if kind == TokenKind::PreprocError {
                    "#error"
                } else {
                    "#warn"
                };
                format!("{}{}", prefix, rest)
            }
            _ => format!("#{}", name),
        };
        Some(Token::simple(kind, text, location.clone()))
    }
}

fn directive_kind(name: &str) -> Option<TokenKind> {
    Some(match name {
        "warn" | "warning" => TokenKind::PreprocWarning,
        "error" => TokenKind::PreprocError,
        "include" => TokenKind::PreprocInclude,
        "define" => TokenKind::PreprocDefine,
        "undef" => TokenKind::PreprocUndefine,
        "if" => TokenKind::PreprocIf,
        "ifdef" => TokenKind::PreprocIfdef,
        "ifndef" => TokenKind::PreprocIfndef,
        "elif" => TokenKind::PreprocElif,
        "else" => TokenKind::PreprocElse,
        "endif" => TokenKind::PreprocEndIf,
        "pragma" => TokenKind::PreprocPragma,
        _ => return None,
    })
}

impl Lexer for PreprocessorLexer {
    fn parse_next_token(&mut self) -> Token {
        let mut tokens = Vec::with_capacity(1);
        self.lex(&mut tokens);
        let last = tokens
            .pop()
            .unwrap_or_else(|| Token::eof(self.location()));
        self.pending.extend(tokens);
        last
    }

    fn pending_queue(&mut self) -> &mut VecDeque<Token> {
        &mut self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> (Vec<Token>, DiagnosticSink) {
        let sink = DiagnosticSink::with_defaults();
        let mut lexer = PreprocessorLexer::new("test.dm", source, sink.clone());
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::EndOfFile {
                return (tokens, sink);
            }
            tokens.push(token);
        }
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_take_longest_match() {
        let (tokens, _) = lex_all("a<<=b");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "<<=", "b"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // x\nb /* y /* nested */ */c"),
            vec![
                TokenKind::PreprocIdentifier,
                TokenKind::PreprocWhitespace,
                TokenKind::Newline,
                TokenKind::PreprocIdentifier,
                TokenKind::PreprocWhitespace,
                TokenKind::PreprocIdentifier,
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (tokens, _) = lex_all("a /* never closed");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Error));
        assert_eq!(
            tokens.last().and_then(|t| t.as_str()),
            Some("Expected \"*/\" to end multiline comment")
        );
    }

    #[test]
    fn test_constant_string_keeps_escapes() {
        let (tokens, _) = lex_all(r#""a\"b\[c]""#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::PreprocConstantString);
        assert_eq!(tokens[0].as_str(), Some(r#"a\"b\[c]"#));
    }

    #[test]
    fn test_interpolated_string() {
        let (tokens, _) = lex_all(r#""x[a]y[b[1]]z""#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::PreprocStringBegin,
                TokenKind::PreprocIdentifier,
                TokenKind::PreprocStringMiddle,
                TokenKind::PreprocIdentifier,
                TokenKind::PreprocPunctuatorLeftBracket,
                TokenKind::PreprocNumber,
                TokenKind::PreprocPunctuatorRightBracket,
                TokenKind::PreprocStringEnd,
            ]
        );
        assert_eq!(tokens[0].as_str(), Some("x"));
        assert_eq!(tokens[2].as_str(), Some("y"));
        assert_eq!(tokens[7].as_str(), Some("z"));
    }

    #[test]
    fn test_unterminated_string_is_one_error() {
        let (tokens, _) = lex_all("\"abc\nfoo");
        let errors: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].as_str(), Some("Expected '\"' to end string"));
    }

    #[test]
    fn test_unterminated_interpolation() {
        let (tokens, _) = lex_all("\"abc[foo");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_str(), Some("Expected ']' to end expression"));
    }

    #[test]
    fn test_long_and_raw_strings() {
        let (tokens, _) = lex_all("{\"a\n\"b\"} @/x\"y/");
        assert_eq!(tokens[0].kind, TokenKind::PreprocConstantString);
        assert_eq!(tokens[0].as_str(), Some("a\n\"b"));
        assert_eq!(tokens[2].kind, TokenKind::PreprocConstantString);
        assert_eq!(tokens[2].as_str(), Some("x\"y"));
    }

    #[test]
    fn test_numbers() {
        let (tokens, _) = lex_all("1e-5 0x1F 1.#INF");
        let texts: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::PreprocNumber)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["1e-5", "0x1F", "1.#INF"]);
    }

    #[test]
    fn test_directives() {
        let (tokens, _) = lex_all("#define X\n#error oh no\n#x");
        assert_eq!(tokens[0].kind, TokenKind::PreprocDefine);
        let error = tokens.iter().find(|t| t.kind == TokenKind::PreprocError).unwrap();
        assert_eq!(error.text, "#error oh no");
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::PreprocParameterStringify));
    }

    #[test]
    fn test_miscapitalized_directive() {
        let (tokens, sink) = lex_all("#DEFINE X 1");
        assert_eq!(tokens[0].kind, TokenKind::PreprocDefine);
        let records = sink.diagnostics();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, WarningCode::MiscapitalizedDirective);
        assert_eq!(
            records[0].message,
            "#DEFINE is not a valid macro keyword. Did you mean '#define'?"
        );
    }

    #[test]
    fn test_line_splice_and_locations() {
        let (tokens, _) = lex_all("a\\\nb");
        assert_eq!(tokens[1].kind, TokenKind::PreprocLineSplice);
        assert_eq!(tokens[2].location.line, Some(2));
        assert_eq!(tokens[2].location.column, Some(1));
    }
}
