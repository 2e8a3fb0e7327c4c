//! Frontend: source text to AST
//!
//! - [`core`] - lexer and parser machinery shared by every grammar
//! - [`preprocessor`] - macros, includes and conditional compilation
//! - [`dm`] - the DM lexer, AST and parser
//! - [`dmm`] - map files
//! - [`ntsl`] - NTSL scripts
//! - [`compiler`] - the driver running every stage down to the artifact
//!
//! Each stage pulls tokens from the one beneath it. Nothing here reads back
//! from a later stage.

pub mod compiler;
pub mod core;
pub mod dm;
pub mod dmm;
pub mod ntsl;
pub mod preprocessor;

pub use compiler::{CompileOptions, CompileOutput, Compiler};
