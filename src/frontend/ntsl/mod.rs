//! NTSL, the small scripting language of programmable machines
//!
//! Its lexer sits on the preprocessor like the DM lexer does, and its parser
//! builds the same AST node kinds, so the rest of the compiler handles NTSL
//! procs without knowing where they came from.

pub mod lexer;
pub mod parser;
#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use lexer::NtslLexer;
pub use parser::{NtslFile, NtslParser, NtslProc};

use crate::frontend::preprocessor::{MemoryLoader, Preprocessor};
use crate::util::diagnostic::DiagnosticSink;
use crate::util::span::Location;

/// Preprocess and parse one script
pub fn parse_script(
    name: &str,
    text: &str,
    sink: DiagnosticSink,
) -> NtslFile {
    let mut preprocessor = Preprocessor::new(Arc::new(MemoryLoader::new()), sink.clone());
    preprocessor.push_source(name, text);
    let lexer = NtslLexer::new(preprocessor, Location::in_source(Arc::from(name)));
    NtslParser::new(lexer, sink).parse_file()
}
