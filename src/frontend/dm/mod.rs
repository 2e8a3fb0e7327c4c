//! The DM language: lexer, paths, syntax tree and parser
//!
//! Source flows `Preprocessor -> DmLexer -> DmParser`. The lexer turns
//! preprocessor tokens into DM tokens with indentation made explicit; the
//! parser builds an [`ast::File`] and records every problem in the shared
//! [`DiagnosticSink`](crate::util::diagnostic::DiagnosticSink).

pub mod ast;
pub mod constant;
pub mod lexer;
pub mod parser;
pub mod path;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use constant::Constant;
pub use lexer::DmLexer;
pub use parser::DmParser;
pub use path::{DreamPath, PathKind};

use crate::frontend::core::lexer::Lexer;
use crate::frontend::preprocessor::PreprocessorLexer;
use crate::util::diagnostic::DiagnosticSink;
use crate::util::span::Location;

/// Parse a single DM source without running the preprocessor's directives
/// or includes
pub fn parse_snippet(
    name: &str,
    source: &str,
    sink: &DiagnosticSink,
) -> ast::File {
    let tokens = PreprocessorLexer::new(name, source, sink.clone()).into_tokens();
    let lexer = DmLexer::new(tokens, Location::in_source(Arc::from(name)));
    DmParser::new(lexer, sink.clone()).parse_file()
}
