//! DM compiler
//!
//! Compiles DM source, with its preprocessor directives and included map
//! files, into a JSON artifact of stack-machine bytecode.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use dmcompiler::{compiler_for, CompileOptions, Result};
//! use dmcompiler::util::config::CompilerConfig;
//!
//! fn main() -> Result<()> {
//!     let config = CompilerConfig::default();
//!     let compiler = compiler_for(&[PathBuf::from("game.dme")], &config, CompileOptions::from_config(&config))?;
//!     let output = compiler.compile()?;
//!     println!("{} diagnostics", output.diagnostics().len());
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/dmcompiler")]
#![warn(rust_2018_idioms)]

// Public modules
pub mod frontend;
pub mod middle;
pub mod vm;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use frontend::{CompileOptions, CompileOutput, Compiler};
pub use thiserror::Error;

use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::middle::DreamCompiledJson;
use crate::util::config::CompilerConfig;
use crate::util::span::Location;

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compiler name
pub const NAME: &str = "DM Compiler";

/// A compiler over files on disk with the severities of `config`.
///
/// Pragma overrides that cannot be applied become forced warnings in the
/// compiler's sink rather than failing the run.
pub fn compiler_for(
    paths: &[PathBuf],
    config: &CompilerConfig,
    options: CompileOptions,
) -> Result<Compiler> {
    let (table, rejected) = config.severity_table();
    let compiler = Compiler::for_paths(paths, options, Arc::new(table))?;
    for error in rejected {
        debug!("Rejected pragma: {}", error);
        compiler.sink().forced_warning(Location::UNKNOWN, error.to_string());
    }
    Ok(compiler)
}

/// Listing of every proc in an artifact, or only the procs named `filter`
pub fn disassemble_artifact(
    artifact: &DreamCompiledJson,
    filter: Option<&str>,
) -> String {
    let strings: Vec<String> = artifact.strings.iter().cloned().collect();
    let mut out = String::new();

    for proc in &artifact.procs {
        if filter.is_some_and(|name| name != proc.name) {
            continue;
        }
        let owner = usize::try_from(proc.owning_type_id)
            .ok()
            .and_then(|id| artifact.types.get(id))
            .map(|ty| ty.path.as_str())
            .unwrap_or("?");
        let separator = if owner.ends_with('/') { "" } else { "/" };
        let _ = writeln!(
            out,
            "proc {}{}{} (max stack {})",
            owner, separator, proc.name, proc.max_stack_size
        );
        out.push_str(&vm::disassemble(&proc.bytecode, &strings));
        out.push('\n');
    }

    if let Some(init) = artifact.global_init_proc.as_ref().filter(|_| filter.is_none()) {
        let _ = writeln!(out, "global init (max stack {})", init.max_stack_size);
        out.push_str(&vm::disassemble(&init.bytecode, &strings));
    }
    out
}
