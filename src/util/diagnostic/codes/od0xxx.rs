//! OD0xxx: fatal-class codes
//!
//! These cannot be demoted by `#pragma` or configuration.

use super::{WarningCode, WarningCodeDefinition};
use crate::util::diagnostic::ErrorLevel;

pub(crate) const UNKNOWN_DEFINITION: WarningCodeDefinition = WarningCodeDefinition::new(
    WarningCode::Unknown,
    "Unknown",
    ErrorLevel::Error,
    "Unclassified problem",
);

/// OD0xxx list
pub static OD0XXX: &[WarningCodeDefinition] = &[
    UNKNOWN_DEFINITION,
    WarningCodeDefinition::new(
        WarningCode::BadToken,
        "BadToken",
        ErrorLevel::Error,
        "Malformed or unexpected token",
    ),
    WarningCodeDefinition::new(
        WarningCode::BadDirective,
        "BadDirective",
        ErrorLevel::Error,
        "Malformed preprocessor directive",
    ),
    WarningCodeDefinition::new(
        WarningCode::BadExpression,
        "BadExpression",
        ErrorLevel::Error,
        "Expression cannot be compiled",
    ),
    WarningCodeDefinition::new(
        WarningCode::MissingExpression,
        "MissingExpression",
        ErrorLevel::Error,
        "An expression was required here",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidArgumentCount,
        "InvalidArgumentCount",
        ErrorLevel::Error,
        "Wrong number of arguments to a builtin",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidVarDefinition,
        "InvalidVarDefinition",
        ErrorLevel::Error,
        "Malformed var definition",
    ),
    WarningCodeDefinition::new(
        WarningCode::MissingBody,
        "MissingBody",
        ErrorLevel::Error,
        "Statement requires a body",
    ),
    WarningCodeDefinition::new(
        WarningCode::BadLabel,
        "BadLabel",
        ErrorLevel::Error,
        "Jump to a label that does not exist",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidBytecode,
        "InvalidBytecode",
        ErrorLevel::Error,
        "Generated bytecode failed verification",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidReference,
        "InvalidReference",
        ErrorLevel::Error,
        "Reference to something that cannot be resolved",
    ),
    WarningCodeDefinition::new(
        WarningCode::BadArgument,
        "BadArgument",
        ErrorLevel::Error,
        "Invalid argument",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidArgumentKey,
        "InvalidArgumentKey",
        ErrorLevel::Error,
        "Invalid named-argument key",
    ),
    WarningCodeDefinition::new(
        WarningCode::ArglistOnlyArgument,
        "ArglistOnlyArgument",
        ErrorLevel::Error,
        "arglist() must be the only argument",
    ),
    WarningCodeDefinition::new(
        WarningCode::HardReservedKeyword,
        "HardReservedKeyword",
        ErrorLevel::Error,
        "Keyword that can never be used as a name",
    ),
    WarningCodeDefinition::new(
        WarningCode::ItemDoesntExist,
        "ItemDoesntExist",
        ErrorLevel::Error,
        "Referenced type, var or proc does not exist",
    ),
    WarningCodeDefinition::new(
        WarningCode::DanglingOverride,
        "DanglingOverride",
        ErrorLevel::Error,
        "Override of a proc that was never defined",
    ),
    WarningCodeDefinition::new(
        WarningCode::StaticOverride,
        "StaticOverride",
        ErrorLevel::Error,
        "Override of a static var",
    ),
    WarningCodeDefinition::new(
        WarningCode::FinalOverride,
        "FinalOverride",
        ErrorLevel::Error,
        "Override of a final var or proc",
    ),
    WarningCodeDefinition::new(
        WarningCode::IAmATeaPot,
        "IAmATeaPot",
        ErrorLevel::Error,
        "Reserved",
    ),
    WarningCodeDefinition::new(
        WarningCode::HardConstContext,
        "HardConstContext",
        ErrorLevel::Error,
        "A constant value was required",
    ),
    WarningCodeDefinition::new(
        WarningCode::WriteToConstant,
        "WriteToConstant",
        ErrorLevel::Error,
        "Assignment to a const var",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidInclusion,
        "InvalidInclusion",
        ErrorLevel::Error,
        "#include target is not a string",
    ),
];
