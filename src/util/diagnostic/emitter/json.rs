//! JSON rendering for tools

use serde::{Deserialize, Serialize};

use crate::util::diagnostic::{Diagnostic, ErrorLevel};

/// Serialized form of one diagnostic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JsonDiagnostic {
    pub level: ErrorLevel,
    /// `ODxxxx`
    pub code: String,
    pub name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

impl From<&Diagnostic> for JsonDiagnostic {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            level: diagnostic.level,
            code: diagnostic.code.to_string(),
            name: diagnostic.code.name().to_string(),
            file: diagnostic.location.source.as_deref().map(str::to_string),
            line: diagnostic.location.line,
            column: diagnostic.location.column,
            message: diagnostic.message.clone(),
        }
    }
}

/// Renders diagnostics as a JSON array
#[derive(Debug, Clone, Default)]
pub struct JsonEmitter {
    pub show_notices: bool,
}

impl JsonEmitter {
    pub fn new(show_notices: bool) -> Self {
        Self { show_notices }
    }

    pub fn render_all(
        &self,
        diagnostics: &[Diagnostic],
    ) -> serde_json::Result<String> {
        let records: Vec<JsonDiagnostic> = diagnostics
            .iter()
            .filter(|d| match d.level {
                ErrorLevel::Disabled => false,
                ErrorLevel::Notice => self.show_notices,
                _ => true,
            })
            .map(JsonDiagnostic::from)
            .collect();
        serde_json::to_string_pretty(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::diagnostic::WarningCode;
    use crate::util::span::Location;
    use std::sync::Arc;

    #[test]
    fn test_json_fields() {
        let diag = Diagnostic::new(
            ErrorLevel::Error,
            WarningCode::MissingIncludedFile,
            Location::new(Arc::from("a.dme"), 2, 1),
            "Could not find included file \"b.dm\"",
        );
        let json = JsonEmitter::new(false).render_all(&[diag]).unwrap();
        let parsed: Vec<JsonDiagnostic> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].code, "OD1001");
        assert_eq!(parsed[0].name, "MissingIncludedFile");
        assert_eq!(parsed[0].line, Some(2));
    }
}
