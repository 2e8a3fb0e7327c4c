//! OD1xxx: preprocessor configuration

use super::{WarningCode, WarningCodeDefinition};
use crate::util::diagnostic::ErrorLevel;

/// OD1xxx list
pub static OD1XXX: &[WarningCodeDefinition] = &[
    WarningCodeDefinition::new(
        WarningCode::FileAlreadyIncluded,
        "FileAlreadyIncluded",
        ErrorLevel::Warning,
        "File was included more than once",
    ),
    WarningCodeDefinition::new(
        WarningCode::MissingIncludedFile,
        "MissingIncludedFile",
        ErrorLevel::Error,
        "Included file could not be found",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidWarningCode,
        "InvalidWarningCode",
        ErrorLevel::Warning,
        "#pragma names a code that does not exist",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidFileDirDefine,
        "InvalidFileDirDefine",
        ErrorLevel::Warning,
        "FILE_DIR points at something that is not a directory",
    ),
    WarningCodeDefinition::new(
        WarningCode::MisplacedDirective,
        "MisplacedDirective",
        ErrorLevel::Error,
        "Directive preceded by something other than whitespace",
    ),
    WarningCodeDefinition::new(
        WarningCode::UndefineMissingDirective,
        "UndefineMissingDirective",
        ErrorLevel::Warning,
        "#undef of a macro that is not defined",
    ),
    WarningCodeDefinition::new(
        WarningCode::DefinedMissingParen,
        "DefinedMissingParen",
        ErrorLevel::Error,
        "defined( without a closing paren",
    ),
    WarningCodeDefinition::new(
        WarningCode::ErrorDirective,
        "ErrorDirective",
        ErrorLevel::Error,
        "#error",
    ),
    WarningCodeDefinition::new(
        WarningCode::WarningDirective,
        "WarningDirective",
        ErrorLevel::Warning,
        "#warn",
    ),
    WarningCodeDefinition::new(
        WarningCode::MiscapitalizedDirective,
        "MiscapitalizedDirective",
        ErrorLevel::Warning,
        "Directive spelled with the wrong capitalization",
    ),
];
