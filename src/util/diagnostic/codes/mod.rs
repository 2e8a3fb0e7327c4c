//! Warning code registry
//!
//! Every diagnostic carries one of these codes. Numbers are stable: a code is
//! never renumbered, and a retired number is never handed to a new meaning.
//!
//! | Range     | Meaning                                             |
//! |-----------|-----------------------------------------------------|
//! | 0000-0999 | fatal-class problems, always errors                 |
//! | 1000-1999 | preprocessor configuration                          |
//! | 2000-2999 | language behaviour configuration                    |
//! | 3000-3999 | style configuration                                 |
//! | 4000-4999 | reserved for execution-time configuration (unused)  |

pub mod od0xxx;
pub mod od1xxx;
pub mod od2xxx;
pub mod od3xxx;

use once_cell::sync::Lazy;

use crate::util::diagnostic::ErrorLevel;

/// Stable numeric diagnostic codes.
///
/// The discriminant is the code number, so the compiler itself rejects two
/// variants sharing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum WarningCode {
    // 0 - 999
    Unknown = 0,
    BadToken = 1,
    BadDirective = 10,
    BadExpression = 11,
    MissingExpression = 12,
    InvalidArgumentCount = 13,
    InvalidVarDefinition = 14,
    MissingBody = 15,
    BadLabel = 19,
    InvalidBytecode = 20,
    InvalidReference = 50,
    BadArgument = 100,
    InvalidArgumentKey = 101,
    ArglistOnlyArgument = 102,
    HardReservedKeyword = 200,
    ItemDoesntExist = 404,
    DanglingOverride = 405,
    StaticOverride = 406,
    FinalOverride = 407,
    IAmATeaPot = 418,
    HardConstContext = 500,
    WriteToConstant = 501,
    InvalidInclusion = 900,

    // 1000 - 1999
    FileAlreadyIncluded = 1000,
    MissingIncludedFile = 1001,
    InvalidWarningCode = 1002,
    InvalidFileDirDefine = 1003,
    MisplacedDirective = 1100,
    UndefineMissingDirective = 1101,
    DefinedMissingParen = 1150,
    ErrorDirective = 1200,
    WarningDirective = 1201,
    MiscapitalizedDirective = 1300,

    // 2000 - 2999
    SoftReservedKeyword = 2000,
    ScopeOperandNamedType = 2001,
    DuplicateVariable = 2100,
    DuplicateProcDefinition = 2101,
    PointlessParentCall = 2205,
    PointlessBuiltinCall = 2206,
    SuspiciousMatrixCall = 2207,
    FallbackBuiltinArgument = 2208,
    PointlessScopeOperator = 2209,
    PointlessPositionalArgument = 2210,
    ProcArgumentGlobal = 2211,
    AmbiguousVarStatic = 2212,
    MalformedRange = 2300,
    InvalidRange = 2301,
    InvalidSetStatement = 2302,
    InvalidOverride = 2303,
    InvalidIndexOperation = 2304,
    DanglingVarType = 2401,
    MissingInterpolatedExpression = 2500,
    AmbiguousResourcePath = 2600,
    UnsupportedTypeCheck = 2700,
    InvalidReturnType = 2701,
    InvalidVarType = 2702,
    ImplicitNullType = 2703,
    LostTypeInfo = 2704,
    UnimplementedAccess = 2800,
    UnsupportedAccess = 2801,

    // 3000 - 3999
    EmptyBlock = 3100,
    EmptyProc = 3101,
    UnsafeClientAccess = 3200,
    SuspiciousSwitchCase = 3201,
    AssignmentInConditional = 3202,
    PickWeightedSyntax = 3203,
    AmbiguousInOrder = 3204,
    ExtraToken = 3205,
    RuntimeSearchOperator = 3300,
}

impl WarningCode {
    #[inline]
    pub fn number(self) -> u16 {
        self as u16
    }

    /// Codes below 1000 can never be demoted from error
    #[inline]
    pub fn is_fatal_class(self) -> bool {
        self.number() < 1000
    }

    pub fn definition(self) -> &'static WarningCodeDefinition {
        // Unregistered codes fall back to Unknown's metadata.
        WarningCodeDefinition::all()
            .iter()
            .find(|d| d.code == self)
            .unwrap_or(&od0xxx::UNKNOWN_DEFINITION)
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn default_level(self) -> ErrorLevel {
        self.definition().default_level
    }

    pub fn from_number(number: u16) -> Option<Self> {
        WarningCodeDefinition::all()
            .iter()
            .find(|d| d.code.number() == number)
            .map(|d| d.code)
    }

    /// Look up a code by its variant name, its bare number, or `ODxxxx`
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(def) = WarningCodeDefinition::find_by_name(text) {
            return Some(def.code);
        }
        let digits = text
            .strip_prefix("OD")
            .or_else(|| text.strip_prefix("od"))
            .unwrap_or(text);
        digits.parse::<u16>().ok().and_then(Self::from_number)
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "OD{:04}", self.number())
    }
}

/// Numeric partition a code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRange {
    Fatal,        // 0-999
    Preprocessor, // 1000-1999
    Behavior,     // 2000-2999
    Style,        // 3000-3999
    Runtime,      // 4000-4999, reserved
}

impl CodeRange {
    pub const fn of(number: u16) -> Self {
        match number {
            0..=999 => CodeRange::Fatal,
            1000..=1999 => CodeRange::Preprocessor,
            2000..=2999 => CodeRange::Behavior,
            3000..=3999 => CodeRange::Style,
            _ => CodeRange::Runtime,
        }
    }
}

impl std::fmt::Display for CodeRange {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            CodeRange::Fatal => write!(f, "Fatal"),
            CodeRange::Preprocessor => write!(f, "Preprocessor"),
            CodeRange::Behavior => write!(f, "Behavior"),
            CodeRange::Style => write!(f, "Style"),
            CodeRange::Runtime => write!(f, "Runtime"),
        }
    }
}

/// Registry metadata for one code
#[derive(Debug, Clone, Copy)]
pub struct WarningCodeDefinition {
    pub code: WarningCode,
    /// Name accepted by `#pragma` and config files
    pub name: &'static str,
    pub range: CodeRange,
    pub default_level: ErrorLevel,
    pub summary: &'static str,
}

impl WarningCodeDefinition {
    pub(crate) const fn new(
        code: WarningCode,
        name: &'static str,
        default_level: ErrorLevel,
        summary: &'static str,
    ) -> Self {
        Self {
            code,
            name,
            range: CodeRange::of(code as u16),
            default_level,
            summary,
        }
    }
}

/// The full registry
static WARNING_CODES: Lazy<Vec<WarningCodeDefinition>> = Lazy::new(|| {
    let mut codes: Vec<WarningCodeDefinition> = Vec::new();

    codes.extend_from_slice(od0xxx::OD0XXX);
    codes.extend_from_slice(od1xxx::OD1XXX);
    codes.extend_from_slice(od2xxx::OD2XXX);
    codes.extend_from_slice(od3xxx::OD3XXX);

    codes
});

impl WarningCodeDefinition {
    pub fn find(code: WarningCode) -> Option<&'static Self> {
        WARNING_CODES.iter().find(|c| c.code == code)
    }

    pub fn find_by_name(name: &str) -> Option<&'static Self> {
        WARNING_CODES.iter().find(|c| c.name == name)
    }

    pub fn all() -> &'static [Self] {
        &WARNING_CODES
    }

    pub fn by_range(range: CodeRange) -> impl Iterator<Item = &'static Self> {
        WARNING_CODES.iter().filter(move |c| c.range == range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_numbers_are_unique() {
        let mut seen = HashSet::new();
        for def in WarningCodeDefinition::all() {
            assert!(
                seen.insert(def.code.number()),
                "code {} registered twice",
                def.code
            );
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for def in WarningCodeDefinition::all() {
            assert!(seen.insert(def.name), "name {} registered twice", def.name);
        }
    }

    #[test]
    fn test_ranges_match_numbers() {
        for def in WarningCodeDefinition::all() {
            assert_eq!(
                CodeRange::of(def.code.number()),
                def.range,
                "{} is filed under the wrong range",
                def.name
            );
        }
    }

    #[test]
    fn test_fatal_class_defaults_to_error() {
        for def in WarningCodeDefinition::by_range(CodeRange::Fatal) {
            assert_eq!(def.default_level, ErrorLevel::Error, "{}", def.name);
        }
    }

    #[test]
    fn test_runtime_range_is_empty() {
        assert_eq!(WarningCodeDefinition::by_range(CodeRange::Runtime).count(), 0);
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(WarningCode::parse("EmptyBlock"), Some(WarningCode::EmptyBlock));
        assert_eq!(WarningCode::parse("3100"), Some(WarningCode::EmptyBlock));
        assert_eq!(WarningCode::parse("OD3100"), Some(WarningCode::EmptyBlock));
        assert_eq!(WarningCode::parse("OD9999"), None);
        assert_eq!(WarningCode::parse("NotACode"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(WarningCode::BadToken.to_string(), "OD0001");
        assert_eq!(WarningCode::EmptyBlock.to_string(), "OD3100");
        assert_eq!(WarningCode::MiscapitalizedDirective.name(), "MiscapitalizedDirective");
    }
}
