//! Diagnostics
//!
//! - [`codes`] - the stable `WarningCode` catalog, split by numeric range
//! - [`error`] - `Diagnostic` records and `ErrorLevel`
//! - [`sink`] - `SeverityTable` and the per-compilation `DiagnosticSink`
//! - [`emitter`] - text and JSON output
//!
//! ```
//! use dmcompiler::util::diagnostic::{DiagnosticSink, WarningCode};
//! use dmcompiler::util::span::Location;
//!
//! let sink = DiagnosticSink::with_defaults();
//! sink.emit(WarningCode::BadToken, Location::UNKNOWN, "Unexpected token");
//! assert!(sink.has_errors());
//! ```

pub mod codes;
pub mod emitter;
pub mod error;
pub mod sink;

pub use codes::{CodeRange, WarningCode, WarningCodeDefinition};
pub use emitter::{EmitterConfig, JsonEmitter, TextEmitter};
pub use error::{Diagnostic, ErrorLevel};
pub use sink::{DiagnosticSink, SeverityError, SeverityTable};
