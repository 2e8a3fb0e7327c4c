//! OD2xxx: language behaviour configuration

use super::{WarningCode, WarningCodeDefinition};
use crate::util::diagnostic::ErrorLevel;

/// OD2xxx list
pub static OD2XXX: &[WarningCodeDefinition] = &[
    WarningCodeDefinition::new(
        WarningCode::SoftReservedKeyword,
        "SoftReservedKeyword",
        ErrorLevel::Error,
        "Name that should be reserved, such as null or defined",
    ),
    WarningCodeDefinition::new(
        WarningCode::ScopeOperandNamedType,
        "ScopeOperandNamedType",
        ErrorLevel::Warning,
        "Scope operator used on a var named type or parent_type",
    ),
    WarningCodeDefinition::new(
        WarningCode::DuplicateVariable,
        "DuplicateVariable",
        ErrorLevel::Warning,
        "Variable defined twice",
    ),
    WarningCodeDefinition::new(
        WarningCode::DuplicateProcDefinition,
        "DuplicateProcDefinition",
        ErrorLevel::Error,
        "Proc defined twice on the same type",
    ),
    WarningCodeDefinition::new(
        WarningCode::PointlessParentCall,
        "PointlessParentCall",
        ErrorLevel::Warning,
        "..() with no parent proc",
    ),
    WarningCodeDefinition::new(
        WarningCode::PointlessBuiltinCall,
        "PointlessBuiltinCall",
        ErrorLevel::Warning,
        "issaved() or initial() with no effect",
    ),
    WarningCodeDefinition::new(
        WarningCode::SuspiciousMatrixCall,
        "SuspiciousMatrixCall",
        ErrorLevel::Warning,
        "matrix() called with unlikely arguments",
    ),
    WarningCodeDefinition::new(
        WarningCode::FallbackBuiltinArgument,
        "FallbackBuiltinArgument",
        ErrorLevel::Warning,
        "Builtin given a fallback argument",
    ),
    WarningCodeDefinition::new(
        WarningCode::PointlessScopeOperator,
        "PointlessScopeOperator",
        ErrorLevel::Warning,
        "Scope operator with no effect",
    ),
    WarningCodeDefinition::new(
        WarningCode::PointlessPositionalArgument,
        "PointlessPositionalArgument",
        ErrorLevel::Warning,
        "Positional argument that is ignored",
    ),
    WarningCodeDefinition::new(
        WarningCode::ProcArgumentGlobal,
        "ProcArgumentGlobal",
        ErrorLevel::Warning,
        "Proc argument path starting with / makes a global",
    ),
    WarningCodeDefinition::new(
        WarningCode::AmbiguousVarStatic,
        "AmbiguousVarStatic",
        ErrorLevel::Warning,
        "Static var shadowed by an instance var",
    ),
    WarningCodeDefinition::new(
        WarningCode::MalformedRange,
        "MalformedRange",
        ErrorLevel::Warning,
        "Range with an odd shape",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidRange,
        "InvalidRange",
        ErrorLevel::Error,
        "Range that cannot be evaluated",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidSetStatement,
        "InvalidSetStatement",
        ErrorLevel::Error,
        "Unknown or malformed set statement",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidOverride,
        "InvalidOverride",
        ErrorLevel::Warning,
        "Override that does not apply",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidIndexOperation,
        "InvalidIndexOperation",
        ErrorLevel::Warning,
        "Index into something that is not a list",
    ),
    WarningCodeDefinition::new(
        WarningCode::DanglingVarType,
        "DanglingVarType",
        ErrorLevel::Warning,
        "Var typed with a path that does not exist",
    ),
    WarningCodeDefinition::new(
        WarningCode::MissingInterpolatedExpression,
        "MissingInterpolatedExpression",
        ErrorLevel::Warning,
        "Text macro without the expression it applies to",
    ),
    WarningCodeDefinition::new(
        WarningCode::AmbiguousResourcePath,
        "AmbiguousResourcePath",
        ErrorLevel::Warning,
        "Resource path matches more than one file",
    ),
    WarningCodeDefinition::new(
        WarningCode::UnsupportedTypeCheck,
        "UnsupportedTypeCheck",
        ErrorLevel::Notice,
        "Static type check not supported here",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidReturnType,
        "InvalidReturnType",
        ErrorLevel::Notice,
        "Returned value does not match the declared type",
    ),
    WarningCodeDefinition::new(
        WarningCode::InvalidVarType,
        "InvalidVarType",
        ErrorLevel::Notice,
        "Assigned value does not match the declared type",
    ),
    WarningCodeDefinition::new(
        WarningCode::ImplicitNullType,
        "ImplicitNullType",
        ErrorLevel::Notice,
        "Null var not declared nullable",
    ),
    WarningCodeDefinition::new(
        WarningCode::LostTypeInfo,
        "LostTypeInfo",
        ErrorLevel::Notice,
        "Operation discarded static type information",
    ),
    WarningCodeDefinition::new(
        WarningCode::UnimplementedAccess,
        "UnimplementedAccess",
        ErrorLevel::Warning,
        "Use of something the compiler does not implement yet",
    ),
    WarningCodeDefinition::new(
        WarningCode::UnsupportedAccess,
        "UnsupportedAccess",
        ErrorLevel::Warning,
        "Use of something that will not be implemented",
    ),
];
