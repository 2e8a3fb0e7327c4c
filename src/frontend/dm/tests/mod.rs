//! DM lexer and parser tests
//!
//! - lexer: keywords, layout tokens and number decoding
//! - parser: object declarations, proc statements, expressions and strings

mod lexer;

use std::sync::Arc;

use super::ast::File;
use super::lexer::DmLexer;
use crate::frontend::core::lexer::{Lexer, Token};
use crate::frontend::preprocessor::{MemoryLoader, Preprocessor, PreprocessorLexer};
use crate::util::diagnostic::DiagnosticSink;
use crate::util::span::Location;

/// DM tokens of `source`, without running directives
fn lex(source: &str) -> Vec<Token> {
    let sink = DiagnosticSink::with_defaults();
    let tokens = PreprocessorLexer::new("test.dm", source, sink).into_tokens();
    DmLexer::new(tokens, Location::in_source(Arc::from("test.dm")))
        .into_tokens()
        .collect()
}

/// Preprocess and parse `source` as `test.dm`
fn parse(source: &str) -> (File, DiagnosticSink) {
    let sink = DiagnosticSink::with_defaults();
    let loader = MemoryLoader::new().with_file("test.dm", source);
    let mut preprocessor = Preprocessor::new(Arc::new(loader), sink.clone());
    preprocessor.include_file("test.dm", None);
    let lexer = DmLexer::new(preprocessor, Location::in_source(Arc::from("test.dm")));
    let file = super::DmParser::new(lexer, sink.clone()).parse_file();
    (file, sink)
}

/// Like [`parse`], also telling whether the parser consumed all input
fn parse_to_end(source: &str) -> (File, DiagnosticSink, bool) {
    let sink = DiagnosticSink::with_defaults();
    let loader = MemoryLoader::new().with_file("test.dm", source);
    let mut preprocessor = Preprocessor::new(Arc::new(loader), sink.clone());
    preprocessor.include_file("test.dm", None);
    let lexer = DmLexer::new(preprocessor, Location::in_source(Arc::from("test.dm")));
    let mut parser = super::DmParser::new(lexer, sink.clone());
    let file = parser.parse_file();
    let at_end = parser.state.at_end();
    (file, sink, at_end)
}
