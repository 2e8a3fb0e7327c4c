//! OD3xxx: style configuration

use super::{WarningCode, WarningCodeDefinition};
use crate::util::diagnostic::ErrorLevel;

/// OD3xxx list
pub static OD3XXX: &[WarningCodeDefinition] = &[
    WarningCodeDefinition::new(
        WarningCode::EmptyBlock,
        "EmptyBlock",
        ErrorLevel::Notice,
        "Block with no statements",
    ),
    WarningCodeDefinition::new(
        WarningCode::EmptyProc,
        "EmptyProc",
        ErrorLevel::Disabled,
        "Proc with no statements",
    ),
    WarningCodeDefinition::new(
        WarningCode::UnsafeClientAccess,
        "UnsafeClientAccess",
        ErrorLevel::Disabled,
        "Access through client without a null check",
    ),
    WarningCodeDefinition::new(
        WarningCode::SuspiciousSwitchCase,
        "SuspiciousSwitchCase",
        ErrorLevel::Warning,
        "else if inside a switch ends the switch",
    ),
    WarningCodeDefinition::new(
        WarningCode::AssignmentInConditional,
        "AssignmentInConditional",
        ErrorLevel::Warning,
        "Assignment used as a condition",
    ),
    WarningCodeDefinition::new(
        WarningCode::PickWeightedSyntax,
        "PickWeightedSyntax",
        ErrorLevel::Disabled,
        "Weighted pick() syntax",
    ),
    WarningCodeDefinition::new(
        WarningCode::AmbiguousInOrder,
        "AmbiguousInOrder",
        ErrorLevel::Warning,
        "in combined with another operator without parentheses",
    ),
    WarningCodeDefinition::new(
        WarningCode::ExtraToken,
        "ExtraToken",
        ErrorLevel::Warning,
        "Token that has no effect",
    ),
    WarningCodeDefinition::new(
        WarningCode::RuntimeSearchOperator,
        "RuntimeSearchOperator",
        ErrorLevel::Disabled,
        "Use of the : runtime search operator",
    ),
];
