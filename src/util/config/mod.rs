//! Compiler configuration
//!
//! A project may carry a `dmc.toml` next to its `.dme`:
//!
//! ```toml
//! [pragmas]
//! EmptyBlock = "warning"
//! OD3205 = "disabled"
//!
//! [defines]
//! DEBUG = "1"
//!
//! [output]
//! notices_as_warnings = false
//! json_diagnostics = false
//! pretty_artifact = true
//! ```
//!
//! CLI flags are applied on top of the loaded values.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::diagnostic::{SeverityError, SeverityTable};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CompilerConfig {
    /// Warning name or `ODxxxx` to level
    #[serde(default)]
    pub pragmas: IndexMap<String, String>,
    /// Macros defined before the first source line
    #[serde(default)]
    pub defines: IndexMap<String, String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Print notice-level diagnostics
    #[serde(default)]
    pub notices_as_warnings: bool,
    /// Emit diagnostics as JSON instead of text
    #[serde(default)]
    pub json_diagnostics: bool,
    /// Pretty-print the compiled artifact
    #[serde(default = "default_pretty")]
    pub pretty_artifact: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            notices_as_warnings: false,
            json_diagnostics: false,
            pretty_artifact: true,
        }
    }
}

/// Values exposed to source through builtin macros
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    #[serde(default = "default_dm_version")]
    pub dm_version: String,
    #[serde(default = "default_dm_build")]
    pub dm_build: String,
    /// Silence `UnimplementedAccess`
    #[serde(default)]
    pub suppress_unimplemented: bool,
}

fn default_dm_version() -> String {
    "514".to_string()
}

fn default_dm_build() -> String {
    "1584".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dm_version: default_dm_version(),
            dm_build: default_dm_build(),
            suppress_unimplemented: false,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration as TOML
    pub fn save(
        &self,
        path: &Path,
    ) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Build the process-wide severity table.
    ///
    /// Invalid overrides are skipped and returned so the caller can report them.
    pub fn severity_table(&self) -> (SeverityTable, Vec<SeverityError>) {
        let mut table = SeverityTable::new();
        let mut rejected = Vec::new();
        for (code, level) in &self.pragmas {
            if let Err(err) = table.apply(code, level) {
                rejected.push(err);
            }
        }
        (table, rejected)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Config serialize error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::diagnostic::{ErrorLevel, WarningCode};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CompilerConfig::from_toml("").unwrap();
        assert!(config.pragmas.is_empty());
        assert!(config.output.pretty_artifact);
        assert_eq!(config.build.dm_version, "514");
    }

    #[test]
    fn test_pragmas_feed_severity_table() {
        let config = CompilerConfig::from_toml(
            r#"
            [pragmas]
            EmptyBlock = "error"
            BadToken = "warning"
            Missing = "error"
            "#,
        )
        .unwrap();
        let (table, rejected) = config.severity_table();
        assert_eq!(table.level(WarningCode::EmptyBlock), ErrorLevel::Error);
        assert_eq!(table.level(WarningCode::BadToken), ErrorLevel::Error);
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dmc.toml");

        let mut config = CompilerConfig::default();
        config.defines.insert("DEBUG".to_string(), "1".to_string());
        config.output.json_diagnostics = true;
        config.save(&path).unwrap();

        let loaded = CompilerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
