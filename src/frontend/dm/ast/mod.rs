//! DM abstract syntax tree
//!
//! Every grammar in the crate (DM, DMM cell definitions, NTSL) builds these
//! same node kinds, so code generation only ever sees this module.
//!
//! Nodes are closed sum types: [`Expression`] for values, [`ProcStatement`]
//! for proc bodies and [`Statement`] for object-level declarations. Each
//! carries its [`Location`]. [`Node`] is a borrowed view over all of them
//! used by generic walkers such as the tree printer.

pub mod expr;
pub mod stmt;
pub mod visit;

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::util::span::Location;

pub use expr::{
    AssignOp, BinaryOp, Builtin, CallParameter, Callable, DerefKind, DerefOp, Expression, ExpressionKind,
    NewTarget, PickValue, UnaryOp,
};
pub use stmt::{
    Block, DefinitionParameter, ObjectVarDefinition, ProcBlock, ProcDefinition, ProcStatement, ProcStatementKind,
    ProcVarDeclaration, Statement, StatementKind, SwitchCase, VarModifiers,
};
pub use visit::{print_tree, walk, Node};

/// A parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub location: Location,
    pub block: Block,
}

/// Value type flags from `as` clauses, e.g. `as num|text`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueType(u32);

impl ValueType {
    pub const ANYTHING: ValueType = ValueType(0x0);
    pub const NULL: ValueType = ValueType(0x1);
    pub const TEXT: ValueType = ValueType(0x2);
    pub const OBJ: ValueType = ValueType(0x4);
    pub const MOB: ValueType = ValueType(0x8);
    pub const TURF: ValueType = ValueType(0x10);
    pub const NUM: ValueType = ValueType(0x20);
    pub const MESSAGE: ValueType = ValueType(0x40);
    pub const AREA: ValueType = ValueType(0x80);
    pub const COLOR: ValueType = ValueType(0x100);
    pub const FILE: ValueType = ValueType(0x200);
    pub const COMMAND_TEXT: ValueType = ValueType(0x400);
    pub const SOUND: ValueType = ValueType(0x800);
    pub const ICON: ValueType = ValueType(0x1000);
    pub const INSTANCE: ValueType = ValueType(0x2000);
    pub const PATH: ValueType = ValueType(0x4000);
    pub const UNIMPLEMENTED: ValueType = ValueType(0x8000);
    pub const COMPILETIME_READONLY: ValueType = ValueType(0x10000);
    pub const NO_CONST_FOLD: ValueType = ValueType(0x20000);
    pub const UNSUPPORTED: ValueType = ValueType(0x40000);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn contains(
        self,
        other: ValueType,
    ) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flag named by an `as` keyword
    pub fn from_keyword(keyword: &str) -> Option<ValueType> {
        let flag = match keyword {
            "anything" => Self::ANYTHING,
            "null" => Self::NULL,
            "text" => Self::TEXT,
            "obj" => Self::OBJ,
            "mob" => Self::MOB,
            "turf" => Self::TURF,
            "num" => Self::NUM,
            "message" => Self::MESSAGE,
            "area" => Self::AREA,
            "color" => Self::COLOR,
            "file" => Self::FILE,
            "command_text" => Self::COMMAND_TEXT,
            "sound" => Self::SOUND,
            "icon" => Self::ICON,
            "opendream_unimplemented" => Self::UNIMPLEMENTED,
            "opendream_compiletimereadonly" => Self::COMPILETIME_READONLY,
            "opendream_noconstfold" => Self::NO_CONST_FOLD,
            "opendream_unsupported" => Self::UNSUPPORTED,
            _ => return None,
        };
        Some(flag)
    }
}

impl BitOr for ValueType {
    type Output = ValueType;

    fn bitor(
        self,
        rhs: ValueType,
    ) -> ValueType {
        ValueType(self.0 | rhs.0)
    }
}

impl BitOrAssign for ValueType {
    fn bitor_assign(
        &mut self,
        rhs: ValueType,
    ) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ValueType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        const NAMES: &[(ValueType, &str)] = &[
            (ValueType::NULL, "null"),
            (ValueType::TEXT, "text"),
            (ValueType::OBJ, "obj"),
            (ValueType::MOB, "mob"),
            (ValueType::TURF, "turf"),
            (ValueType::NUM, "num"),
            (ValueType::MESSAGE, "message"),
            (ValueType::AREA, "area"),
            (ValueType::COLOR, "color"),
            (ValueType::FILE, "file"),
            (ValueType::COMMAND_TEXT, "command_text"),
            (ValueType::SOUND, "sound"),
            (ValueType::ICON, "icon"),
            (ValueType::INSTANCE, "instance"),
            (ValueType::PATH, "path"),
        ];
        if self.0 == 0 {
            return f.write_str("anything");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "{:#x}", self.0)
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_flags() {
        let mut types = ValueType::NUM;
        types |= ValueType::TEXT;
        assert!(types.contains(ValueType::NUM));
        assert!(!types.contains(ValueType::MOB));
        assert_eq!(types.to_string(), "text|num");
        assert_eq!(ValueType::ANYTHING.to_string(), "anything");
        assert_eq!(ValueType::from_keyword("command_text"), Some(ValueType::COMMAND_TEXT));
        assert_eq!(ValueType::from_keyword("banana"), None);
    }
}
