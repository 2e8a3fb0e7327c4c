//! Plain and colored text rendering

use owo_colors::OwoColorize;

use crate::util::diagnostic::{Diagnostic, ErrorLevel};

/// Emitter configuration
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Colorize the level label
    pub use_colors: bool,
    /// Show notice-level diagnostics
    pub show_notices: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            use_colors: false,
            show_notices: false,
        }
    }
}

/// Renders diagnostics one per line
#[derive(Debug, Clone, Default)]
pub struct TextEmitter {
    config: EmitterConfig,
}

impl TextEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self { config }
    }

    /// Whether a diagnostic would be printed at all
    pub fn is_visible(
        &self,
        diagnostic: &Diagnostic,
    ) -> bool {
        match diagnostic.level {
            ErrorLevel::Disabled => false,
            ErrorLevel::Notice => self.config.show_notices,
            ErrorLevel::Warning | ErrorLevel::Error => true,
        }
    }

    /// Render a single diagnostic, or `None` if it is filtered out
    pub fn render(
        &self,
        diagnostic: &Diagnostic,
    ) -> Option<String> {
        if !self.is_visible(diagnostic) {
            return None;
        }
        if !self.config.use_colors {
            return Some(diagnostic.to_string());
        }

        let label = diagnostic.level.to_string();
        let label = match diagnostic.level {
            ErrorLevel::Error => label.red().bold().to_string(),
            ErrorLevel::Warning => label.yellow().bold().to_string(),
            _ => label.cyan().to_string(),
        };
        Some(format!(
            "{} {} at {}: {}",
            label,
            diagnostic.code.bold(),
            diagnostic.location,
            diagnostic.message
        ))
    }

    /// Render every visible diagnostic, newline separated
    pub fn render_all(
        &self,
        diagnostics: &[Diagnostic],
    ) -> String {
        let mut output = String::new();
        for line in diagnostics.iter().filter_map(|d| self.render(d)) {
            output.push_str(&line);
            output.push('\n');
        }
        output
    }

    /// Final one-line summary
    pub fn summary(
        &self,
        diagnostics: &[Diagnostic],
    ) -> String {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics
            .iter()
            .filter(|d| d.level == ErrorLevel::Warning)
            .count();
        if errors > 0 {
            format!(
                "Compilation failed with {} errors and {} warnings",
                errors, warnings
            )
        } else {
            format!("Compilation succeeded with {} warnings", warnings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::diagnostic::WarningCode;
    use crate::util::span::Location;

    fn notice() -> Diagnostic {
        Diagnostic::new(
            ErrorLevel::Notice,
            WarningCode::EmptyBlock,
            Location::UNKNOWN,
            "Empty block detected",
        )
    }

    #[test]
    fn test_notices_hidden_by_default() {
        let emitter = TextEmitter::new();
        assert_eq!(emitter.render(&notice()), None);
    }

    #[test]
    fn test_notices_shown_on_request() {
        let emitter = TextEmitter::with_config(EmitterConfig {
            use_colors: false,
            show_notices: true,
        });
        assert_eq!(
            emitter.render(&notice()).as_deref(),
            Some("Notice OD3100 at <unknown>: Empty block detected")
        );
    }

    #[test]
    fn test_summary() {
        let emitter = TextEmitter::new();
        let error = Diagnostic::new(
            ErrorLevel::Error,
            WarningCode::BadToken,
            Location::UNKNOWN,
            "x",
        );
        assert_eq!(
            emitter.summary(&[error, notice()]),
            "Compilation failed with 1 errors and 0 warnings"
        );
    }
}
