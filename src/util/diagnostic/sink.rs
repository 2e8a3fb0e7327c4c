//! Severity configuration and the per-compilation diagnostics sink

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use super::codes::{WarningCode, WarningCodeDefinition};
use super::error::{Diagnostic, ErrorLevel};
use crate::util::span::Location;

/// Why a severity override was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeverityError {
    #[error("Warning {0} cannot be set - it must always be an error")]
    FatalClass(WarningCode),
    #[error("Warning '{0}' does not exist")]
    UnknownCode(String),
    #[error("Warnings can only be set to disabled, notice, warning, or error")]
    UnknownLevel(String),
}

/// Code to severity mapping.
///
/// Built once before any compilation starts and then shared read-only.
#[derive(Debug, Clone)]
pub struct SeverityTable {
    levels: HashMap<WarningCode, ErrorLevel>,
}

impl SeverityTable {
    /// Table holding every code's default level
    pub fn new() -> Self {
        let levels = WarningCodeDefinition::all()
            .iter()
            .map(|def| (def.code, def.default_level))
            .collect();
        Self { levels }
    }

    pub fn level(
        &self,
        code: WarningCode,
    ) -> ErrorLevel {
        self.levels
            .get(&code)
            .copied()
            .unwrap_or_else(|| code.default_level())
    }

    pub fn set(
        &mut self,
        code: WarningCode,
        level: ErrorLevel,
    ) -> Result<(), SeverityError> {
        if code.is_fatal_class() && level != ErrorLevel::Error {
            return Err(SeverityError::FatalClass(code));
        }
        self.levels.insert(code, level);
        Ok(())
    }

    /// Apply an override given as text, e.g. from a config file
    pub fn apply(
        &mut self,
        code: &str,
        level: &str,
    ) -> Result<(), SeverityError> {
        let code = WarningCode::parse(code).ok_or_else(|| SeverityError::UnknownCode(code.to_string()))?;
        let level = ErrorLevel::parse(level).ok_or_else(|| SeverityError::UnknownLevel(level.to_string()))?;
        self.set(code, level)
    }
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct SinkInner {
    base: Arc<SeverityTable>,
    /// `#pragma` overrides local to this compilation
    pragmas: Mutex<HashMap<WarningCode, ErrorLevel>>,
    records: Mutex<Vec<Diagnostic>>,
}

/// Collects diagnostics for one compilation.
///
/// Cloning is cheap and every clone appends to the same log, so the
/// preprocessor, lexers, parser and code generator can each hold one.
#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    inner: Arc<SinkInner>,
}

impl DiagnosticSink {
    pub fn new(severities: Arc<SeverityTable>) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                base: severities,
                pragmas: Mutex::new(HashMap::new()),
                records: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Sink over the default severity table
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SeverityTable::new()))
    }

    /// A fresh, empty log sharing this sink's base severity table
    pub fn fork(&self) -> Self {
        Self::new(self.inner.base.clone())
    }

    pub fn level(
        &self,
        code: WarningCode,
    ) -> ErrorLevel {
        if let Some(level) = self.inner.pragmas.lock().get(&code) {
            return *level;
        }
        self.inner.base.level(code)
    }

    /// Record a diagnostic at the code's configured level.
    ///
    /// Returns true when the code is currently an error.
    pub fn emit(
        &self,
        code: WarningCode,
        location: Location,
        message: impl Into<String>,
    ) -> bool {
        let level = self.level(code);
        if level != ErrorLevel::Disabled {
            self.push(Diagnostic::new(level, code, location, message));
        }
        level.is_error()
    }

    /// A warning that ignores severity configuration
    pub fn forced_warning(
        &self,
        location: Location,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(
            ErrorLevel::Warning,
            WarningCode::Unknown,
            location,
            message,
        ));
    }

    /// An error that ignores severity configuration
    pub fn forced_error(
        &self,
        location: Location,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(
            ErrorLevel::Error,
            WarningCode::Unknown,
            location,
            message,
        ));
    }

    /// Change a code's level for the rest of this compilation
    pub fn set_pragma(
        &self,
        code: WarningCode,
        level: ErrorLevel,
    ) -> Result<(), SeverityError> {
        if code.is_fatal_class() && level != ErrorLevel::Error {
            return Err(SeverityError::FatalClass(code));
        }
        self.inner.pragmas.lock().insert(code, level);
        Ok(())
    }

    fn push(
        &self,
        diagnostic: Diagnostic,
    ) {
        tracing::trace!("{}", diagnostic);
        self.inner.records.lock().push(diagnostic);
    }

    /// Snapshot of everything recorded so far, in emission order
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.records.lock().clone()
    }

    /// Append another sink's records to this one
    pub fn absorb(
        &self,
        other: &DiagnosticSink,
    ) {
        let records = other.diagnostics();
        self.inner.records.lock().extend(records);
    }

    pub fn count(
        &self,
        level: ErrorLevel,
    ) -> usize {
        self.inner
            .records
            .lock()
            .iter()
            .filter(|d| d.level == level)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.count(ErrorLevel::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(ErrorLevel::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.inner.records.lock().iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.inner.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_uses_configured_level() {
        let sink = DiagnosticSink::with_defaults();
        assert!(sink.emit(WarningCode::BadToken, Location::UNKNOWN, "bad"));
        assert!(!sink.emit(WarningCode::FileAlreadyIncluded, Location::UNKNOWN, "dup"));

        let records = sink.diagnostics();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, ErrorLevel::Error);
        assert_eq!(records[1].level, ErrorLevel::Warning);
    }

    #[test]
    fn test_disabled_codes_are_not_recorded() {
        let sink = DiagnosticSink::with_defaults();
        sink.emit(WarningCode::EmptyProc, Location::UNKNOWN, "empty");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_fatal_class_cannot_be_demoted() {
        let mut table = SeverityTable::new();
        assert_eq!(
            table.set(WarningCode::BadToken, ErrorLevel::Warning),
            Err(SeverityError::FatalClass(WarningCode::BadToken))
        );
        assert!(table.set(WarningCode::BadToken, ErrorLevel::Error).is_ok());

        let sink = DiagnosticSink::with_defaults();
        assert!(sink.set_pragma(WarningCode::BadExpression, ErrorLevel::Disabled).is_err());
    }

    #[test]
    fn test_pragma_is_local_to_sink() {
        let table = Arc::new(SeverityTable::new());
        let first = DiagnosticSink::new(table.clone());
        let second = DiagnosticSink::new(table);

        first
            .set_pragma(WarningCode::EmptyBlock, ErrorLevel::Error)
            .unwrap();
        assert_eq!(first.level(WarningCode::EmptyBlock), ErrorLevel::Error);
        assert_eq!(second.level(WarningCode::EmptyBlock), ErrorLevel::Notice);
    }

    #[test]
    fn test_apply_text_overrides() {
        let mut table = SeverityTable::new();
        table.apply("EmptyBlock", "warning").unwrap();
        table.apply("OD3205", "disabled").unwrap();
        assert_eq!(table.level(WarningCode::EmptyBlock), ErrorLevel::Warning);
        assert_eq!(table.level(WarningCode::ExtraToken), ErrorLevel::Disabled);
        assert!(matches!(
            table.apply("Nope", "error"),
            Err(SeverityError::UnknownCode(_))
        ));
        assert!(matches!(
            table.apply("EmptyBlock", "loud"),
            Err(SeverityError::UnknownLevel(_))
        ));
    }

    #[test]
    fn test_clones_share_records() {
        let sink = DiagnosticSink::with_defaults();
        let clone = sink.clone();
        clone.forced_error(Location::UNKNOWN, "boom");
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);

        let fork = sink.fork();
        assert!(fork.is_empty());
    }
}
