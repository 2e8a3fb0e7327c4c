//! Diagnostic records
//!
//! A `Diagnostic` is the only way user-source problems leave the compiler.
//! Its text form is fixed: `"{Level} OD{code:04} at {location}: {message}"`.

use serde::{Deserialize, Serialize};

use super::codes::WarningCode;
use crate::util::span::Location;

/// Severity of a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorLevel {
    /// Dropped on the floor
    Disabled,
    /// Recorded, shown only when notices are requested
    Notice,
    /// Always shown
    Warning,
    /// Always shown and fails the compilation
    Error,
}

impl ErrorLevel {
    /// Parse a level name as accepted by `#pragma` and config files
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "disabled" | "disable" => Some(ErrorLevel::Disabled),
            "notice" | "pedantic" | "info" => Some(ErrorLevel::Notice),
            "warning" | "warn" => Some(ErrorLevel::Warning),
            "error" | "err" => Some(ErrorLevel::Error),
            _ => None,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, ErrorLevel::Error)
    }
}

impl std::fmt::Display for ErrorLevel {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ErrorLevel::Disabled => write!(f, "Disabled"),
            ErrorLevel::Notice => write!(f, "Notice"),
            ErrorLevel::Warning => write!(f, "Warning"),
            ErrorLevel::Error => write!(f, "Error"),
        }
    }
}

/// One notice, warning or error
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: ErrorLevel,
    pub code: WarningCode,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        level: ErrorLevel,
        code: WarningCode,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            code,
            location,
            message: message.into(),
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.level.is_error()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        if self.level == ErrorLevel::Disabled {
            return Ok(());
        }
        write!(
            f,
            "{} {} at {}: {}",
            self.level, self.code, self.location, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_format_is_deterministic() {
        let diag = Diagnostic::new(
            ErrorLevel::Warning,
            WarningCode::FileAlreadyIncluded,
            Location::new(Arc::from("main.dme"), 3, 1),
            "File \"a.dm\" was already included",
        );
        assert_eq!(
            diag.to_string(),
            "Warning OD1000 at main.dme:3:1: File \"a.dm\" was already included"
        );
    }

    #[test]
    fn test_disabled_renders_empty() {
        let diag = Diagnostic::new(
            ErrorLevel::Disabled,
            WarningCode::EmptyProc,
            Location::UNKNOWN,
            "empty",
        );
        assert_eq!(diag.to_string(), "");
    }

    #[test]
    fn test_level_aliases() {
        assert_eq!(ErrorLevel::parse("disable"), Some(ErrorLevel::Disabled));
        assert_eq!(ErrorLevel::parse("pedantic"), Some(ErrorLevel::Notice));
        assert_eq!(ErrorLevel::parse("WARN"), Some(ErrorLevel::Warning));
        assert_eq!(ErrorLevel::parse("err"), Some(ErrorLevel::Error));
        assert_eq!(ErrorLevel::parse("loud"), None);
    }
}
