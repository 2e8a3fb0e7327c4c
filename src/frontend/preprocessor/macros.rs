//! Macro definitions and expansion

use super::lexer::PreprocessorLexer;
use crate::frontend::core::lexer::{Lexer, Token, TokenKind, TokenValue};
use crate::util::diagnostic::DiagnosticSink;
use crate::util::span::Location;

/// A `#define`d macro or one of the builtins
#[derive(Debug, Clone)]
pub enum Macro {
    /// User macro; `parameters` is `None` for object-like macros
    Text {
        parameters: Option<Vec<String>>,
        tokens: Vec<Token>,
    },
    /// `__LINE__`
    Line,
    /// `__FILE__`
    File,
    /// `DM_VERSION` and `DM_BUILD`
    Number(String),
}

impl Macro {
    pub fn text(
        parameters: Option<Vec<String>>,
        mut tokens: Vec<Token>,
    ) -> Self {
        // Whitespace directly before `##x` is dropped
        let mut i = 1;
        while i < tokens.len() {
            if tokens[i].kind == TokenKind::PreprocTokenConcat
                && tokens[i - 1].kind == TokenKind::PreprocWhitespace
            {
                tokens.remove(i - 1);
            } else {
                i += 1;
            }
        }
        Macro::Text { parameters, tokens }
    }

    /// Object-like macro whose body is `value` lexed as source text
    pub fn from_value(value: &str) -> Self {
        let mut lexer = PreprocessorLexer::new("<command line>", value, DiagnosticSink::with_defaults());
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::EndOfFile {
                break;
            }
            tokens.push(token);
        }
        Macro::text(None, tokens)
    }

    pub fn has_parameters(&self) -> bool {
        matches!(self, Macro::Text { parameters: Some(_), .. })
    }

    /// Tokens replacing `replacing`. `arguments` must be present when the
    /// macro has parameters.
    pub fn expand(
        &self,
        replacing: &Token,
        arguments: Option<&[Vec<Token>]>,
    ) -> Vec<Token> {
        let location = replacing.location.clone();
        match self {
            Macro::Line => {
                let line = location.line.unwrap_or(0);
                vec![Token::simple(TokenKind::PreprocNumber, line.to_string(), location)]
            }
            Macro::File => {
                let path = location.source_name().replace('\\', "\\\\");
                vec![Token::new(
                    TokenKind::PreprocConstantString,
                    format!("\"{}\"", path),
                    location,
                    TokenValue::Str(path),
                )]
            }
            Macro::Number(value) => {
                vec![Token::simple(TokenKind::PreprocNumber, value.clone(), location)]
            }
            Macro::Text {
                parameters: None,
                tokens,
            } => tokens.clone(),
            Macro::Text {
                parameters: Some(parameters),
                tokens,
            } => expand_function(parameters, tokens, arguments.unwrap_or(&[])),
        }
    }
}

fn expand_function(
    parameters: &[String],
    tokens: &[Token],
    arguments: &[Vec<Token>],
) -> Vec<Token> {
    let overflow = parameters
        .iter()
        .enumerate()
        .find_map(|(i, p)| p.strip_suffix("...").map(|name| (name, i)));

    let mut expanded: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let name = match token.kind {
            TokenKind::PreprocTokenConcat | TokenKind::PreprocParameterStringify => token.value_or_text(),
            _ => token.text.as_str(),
        };
        let index = parameters.iter().position(|p| p == name);

        match index {
            Some(index) if index < arguments.len() => {
                let argument = &arguments[index];
                if token.kind == TokenKind::PreprocParameterStringify {
                    let body: String = argument.iter().map(|t| t.text.as_str()).collect();
                    expanded.push(stringified(body));
                    continue;
                }
                for argument_token in argument {
                    let joins = matches!(
                        argument_token.kind,
                        TokenKind::PreprocIdentifier | TokenKind::PreprocNumber
                    ) && expanded
                        .last()
                        .is_some_and(|last| last.kind == TokenKind::PreprocIdentifier);
                    match expanded.last_mut() {
                        // An identifier followed by an identifier or number merges into one
                        Some(last) if joins => last.text.push_str(&argument_token.text),
                        _ => expanded.push(argument_token.clone()),
                    }
                }
            }
            _ => match overflow {
                Some((overflow_name, overflow_index)) if name == overflow_name || name == "__VA_ARGS__" => {
                    let rest = arguments.get(overflow_index..).unwrap_or(&[]);
                    for (i, argument) in rest.iter().enumerate() {
                        expanded.extend(argument.iter().cloned());
                        if i + 1 < rest.len() {
                            expanded.push(Token::simple(
                                TokenKind::PreprocPunctuatorComma,
                                ",",
                                Location::UNKNOWN,
                            ));
                        }
                    }
                }
                _ => match token.kind {
                    TokenKind::PreprocParameterStringify => expanded.push(stringified(name.to_string())),
                    TokenKind::PreprocTokenConcat => expanded.push(Token::simple(
                        TokenKind::PreprocIdentifier,
                        name,
                        Location::UNKNOWN,
                    )),
                    _ => expanded.push(token.clone()),
                },
            },
        }
    }
    expanded
}

/// `#x` becomes a raw string delimited by `#`, which cannot appear in an
/// expression
fn stringified(body: String) -> Token {
    Token::new(
        TokenKind::PreprocConstantString,
        format!("@#{}#", body),
        Location::UNKNOWN,
        TokenValue::Str(body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str) -> Token {
        Token::simple(TokenKind::PreprocIdentifier, text, Location::UNKNOWN)
    }

    fn punct(
        kind: TokenKind,
        text: &str,
    ) -> Token {
        Token::simple(kind, text, Location::UNKNOWN)
    }

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_object_macro() {
        let m = Macro::from_value("1 + 2");
        let out = m.expand(&ident("X"), None);
        assert_eq!(texts(&out), vec!["1", " ", "+", " ", "2"]);
        assert!(!m.has_parameters());
    }

    #[test]
    fn test_function_macro_substitutes_and_stringifies() {
        let m = Macro::text(
            Some(vec!["a".into(), "b".into()]),
            vec![
                Token::new(
                    TokenKind::PreprocParameterStringify,
                    "#a",
                    Location::UNKNOWN,
                    TokenValue::Str("a".into()),
                ),
                punct(TokenKind::PreprocPunctuator, "+"),
                ident("b"),
            ],
        );
        let out = m.expand(&ident("F"), Some(&[vec![ident("x"), ident("y")], vec![ident("z")]]));
        assert_eq!(out[0].kind, TokenKind::PreprocConstantString);
        assert_eq!(out[0].as_str(), Some("xy"));
        assert_eq!(texts(&out[1..]), vec!["+", "z"]);
    }

    #[test]
    fn test_concat_merges_identifiers() {
        let m = Macro::text(
            Some(vec!["n".into()]),
            vec![
                ident("prefix_"),
                punct(TokenKind::PreprocWhitespace, " "),
                Token::new(
                    TokenKind::PreprocTokenConcat,
                    "##n",
                    Location::UNKNOWN,
                    TokenValue::Str("n".into()),
                ),
            ],
        );
        let out = m.expand(&ident("F"), Some(&[vec![ident("name")]]));
        assert_eq!(texts(&out), vec!["prefix_name"]);
    }

    #[test]
    fn test_variadic_arguments() {
        let m = Macro::text(
            Some(vec!["first".into(), "...".into()]),
            vec![ident("__VA_ARGS__")],
        );
        let out = m.expand(
            &ident("F"),
            Some(&[vec![ident("a")], vec![ident("b")], vec![ident("c")]]),
        );
        assert_eq!(texts(&out), vec!["b", ",", "c"]);
    }

    #[test]
    fn test_builtins() {
        let at = Token::simple(
            TokenKind::PreprocIdentifier,
            "__LINE__",
            Location::new(std::sync::Arc::from("dir\\a.dm"), 7, 3),
        );
        assert_eq!(Macro::Line.expand(&at, None)[0].text, "7");
        assert_eq!(Macro::File.expand(&at, None)[0].as_str(), Some("dir\\\\a.dm"));
        assert_eq!(Macro::Number("514".into()).expand(&at, None)[0].text, "514");
    }
}
