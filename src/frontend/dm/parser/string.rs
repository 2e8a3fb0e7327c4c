//! String literals: escapes, text macros and `[]` interpolation

use super::DmParser;
use crate::frontend::core::lexer::{Lexer, TokenKind};
use crate::frontend::core::parser::ParseResult;
use crate::frontend::dm::ast::{Expression, ExpressionKind};
use crate::util::diagnostic::WarningCode;
use crate::util::span::Location;
use crate::vm::string_format::FormatSuffix;

use TokenKind::*;

/// Text being decoded, with the markers written so far
#[derive(Debug, Default)]
struct FormattedText {
    value: String,
    has_markers: bool,
    /// Set by `\ref` and article macros, consumed by the next `[]`
    pending: Option<FormatSuffix>,
}

impl FormattedText {
    fn push_marker(
        &mut self,
        suffix: FormatSuffix,
    ) {
        self.value.push(suffix.encode());
        self.has_markers = true;
    }

    fn push_interpolation(&mut self) {
        let suffix = self.pending.take().unwrap_or(FormatSuffix::StringifyWithArticle);
        self.push_marker(suffix);
    }
}

impl<L: Lexer> DmParser<L> {
    /// A `DmConstantString`, or a `DmStringBegin ... DmStringEnd` run with
    /// the embedded expressions between its segments
    pub(crate) fn string_expression(&mut self) -> ParseResult<Expression> {
        let first = self.state.bump();
        let location = first.location.clone();
        let mut text = FormattedText::default();

        if first.kind != DmStringBegin {
            self.decode_segment(first.value_or_text(), &first.location, &mut text);
            return Ok(finish(location, text, Vec::new()));
        }

        let mut values = Vec::new();
        let mut segment = first;
        loop {
            self.decode_segment(segment.value_or_text(), &segment.location, &mut text);
            if segment.kind == DmStringEnd {
                break;
            }

            text.push_interpolation();
            self.whitespace();
            if matches!(self.state.current_kind(), DmStringMiddle | DmStringEnd) {
                // `[]` takes its value from a later argument of text()
                values.push(None);
            } else {
                values.push(self.expression()?);
                self.whitespace();
                if !matches!(self.state.current_kind(), DmStringMiddle | DmStringEnd) {
                    self.state
                        .emit(WarningCode::BadToken, "Expected end of embedded expression");
                    self.state.skip_until(&[DmStringMiddle, DmStringEnd]);
                    if self.state.at_end() {
                        break;
                    }
                }
            }
            segment = self.state.bump();
        }

        Ok(finish(location, text, values))
    }

    /// Decode one literal segment into `out`
    fn decode_segment(
        &self,
        segment: &str,
        location: &Location,
        out: &mut FormattedText,
    ) {
        let chars: Vec<char> = segment.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            i += 1;
            if c != '\\' {
                out.value.push(c);
                continue;
            }
            let Some(&escaped) = chars.get(i) else {
                self.state.emit_at(
                    WarningCode::BadToken,
                    location.clone(),
                    "Invalid escape sequence \"\\\"",
                );
                break;
            };

            if escaped.is_ascii_alphabetic() {
                let run: String = chars[i..].iter().take_while(|c| c.is_ascii_alphabetic()).collect();
                let consumed = self.decode_word_escape(&run, location, out);
                i += consumed.max(1);
                continue;
            }

            i += 1;
            match escaped {
                '"' | '\\' | '\'' | '[' | ']' | '{' | '}' | '<' | '>' | ' ' => out.value.push(escaped),
                '\n' => {
                    // Line continuation also swallows the next line's indentation
                    while matches!(chars.get(i), Some(' ' | '\t')) {
                        i += 1;
                    }
                }
                '.' if chars.get(i..i + 2) == Some(&['.', '.'][..]) => i += 2,
                other => {
                    self.state.emit_at(
                        WarningCode::BadToken,
                        location.clone(),
                        format!("Invalid escape sequence \"\\{}\"", other),
                    );
                }
            }
        }
    }

    /// Handle `\word...`, returning how many characters of `run` were used
    fn decode_word_escape(
        &self,
        run: &str,
        location: &Location,
        out: &mut FormattedText,
    ) -> usize {
        // Longest text macro that prefixes the run wins
        for len in (1..=run.len()).rev() {
            let name = &run[..len];
            if name == "ref" {
                out.pending = Some(FormatSuffix::ReferenceOfValue);
                return len;
            }
            if let Some(suffix) = FormatSuffix::from_macro(name) {
                if suffix.is_article() {
                    out.pending = Some(FormatSuffix::StringifyNoArticle);
                }
                out.push_marker(suffix);
                return len;
            }
        }

        match run.chars().next() {
            Some('n') => out.value.push('\n'),
            Some('t') => out.value.push('\t'),
            Some(other) => {
                self.state.emit_at(
                    WarningCode::BadToken,
                    location.clone(),
                    format!("Invalid escape sequence \"\\{}\"", other),
                );
            }
            None => {}
        }
        1
    }
}

fn finish(
    location: Location,
    text: FormattedText,
    values: Vec<Option<Expression>>,
) -> Expression {
    let kind = if text.has_markers {
        ExpressionKind::StringFormat {
            value: text.value,
            values,
        }
    } else {
        ExpressionKind::String(text.value)
    };
    Expression::new(location, kind)
}
