//! Source location tracking

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A position in some named source.
///
/// Every token and AST node carries one. `Location::UNKNOWN` is used where a
/// construct has no meaningful origin (synthesized nodes, host defines).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// Source identifier, usually a path relative to the project root
    pub source: Option<Arc<str>>,
    /// Line number (1-indexed)
    pub line: Option<u32>,
    /// Column number (1-indexed)
    pub column: Option<u32>,
}

impl Location {
    /// The distinguished "nowhere" location
    pub const UNKNOWN: Location = Location {
        source: None,
        line: None,
        column: None,
    };

    /// Create a new location
    #[inline]
    pub fn new(
        source: Arc<str>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            source: Some(source),
            line: Some(line),
            column: Some(column),
        }
    }

    /// A location naming only a source, with no line information
    #[inline]
    pub fn in_source(source: Arc<str>) -> Self {
        Self {
            source: Some(source),
            line: None,
            column: None,
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.source.is_none()
    }

    /// Same source and line, different column
    pub fn with_column(
        &self,
        column: u32,
    ) -> Self {
        Self {
            source: self.source.clone(),
            line: self.line,
            column: Some(column),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or("<unknown>")
    }
}

impl PartialOrd for Location {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    /// Unknown sorts first; otherwise by source, then line, then column.
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.source
            .cmp(&other.source)
            .then(self.line.cmp(&other.line))
            .then(self.column.cmp(&other.column))
    }
}

impl fmt::Display for Location {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let Some(source) = &self.source else {
            return write!(f, "<unknown>");
        };

        write!(f, "{}", source)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// Value paired with the location it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub location: Location,
}

impl<T> Spanned<T> {
    #[inline]
    pub fn new(
        value: T,
        location: Location,
    ) -> Self {
        Self { value, location }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests;
