//! Addressing modes
//!
//! Every readable or writable location in a proc is a [`DMReference`]:
//! one tag byte followed by that mode's own operand.

use std::fmt;

/// Tag byte of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReferenceType {
    Src = 0,
    SelfRef = 1,
    Usr = 2,
    Args = 3,
    World = 4,
    SuperProc = 5,
    ListIndex = 6,
    Argument = 7,
    Local = 8,
    Global = 9,
    GlobalProc = 10,
    Field = 11,
    SrcField = 12,
    SrcProc = 13,
    Callee = 14,
    Caller = 15,
    Invalid = 16,
}

impl TryFrom<u8> for ReferenceType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ReferenceType::*;
        Ok(match value {
            0 => Src,
            1 => SelfRef,
            2 => Usr,
            3 => Args,
            4 => World,
            5 => SuperProc,
            6 => ListIndex,
            7 => Argument,
            8 => Local,
            9 => Global,
            10 => GlobalProc,
            11 => Field,
            12 => SrcField,
            13 => SrcProc,
            14 => Callee,
            15 => Caller,
            16 => Invalid,
            other => return Err(other),
        })
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ReferenceType::SelfRef => f.write_str("Self"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// A storage location
///
/// Names are string-table indices; they are resolved against the type
/// hierarchy when the proc runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DMReference {
    /// The object the proc belongs to
    Src,
    /// The proc's return value
    SelfRef,
    Usr,
    Args,
    World,
    /// `..`
    SuperProc,
    /// Pops a list and an index
    ListIndex,
    Argument(u8),
    Local(u8),
    Global(i32),
    GlobalProc(i32),
    /// Field of the object popped from the stack
    Field(i32),
    SrcField(i32),
    SrcProc(i32),
    Callee,
    Caller,
    /// Stands in after a reported error
    Invalid,
}

impl DMReference {
    pub fn ref_type(&self) -> ReferenceType {
        match self {
            DMReference::Src => ReferenceType::Src,
            DMReference::SelfRef => ReferenceType::SelfRef,
            DMReference::Usr => ReferenceType::Usr,
            DMReference::Args => ReferenceType::Args,
            DMReference::World => ReferenceType::World,
            DMReference::SuperProc => ReferenceType::SuperProc,
            DMReference::ListIndex => ReferenceType::ListIndex,
            DMReference::Argument(_) => ReferenceType::Argument,
            DMReference::Local(_) => ReferenceType::Local,
            DMReference::Global(_) => ReferenceType::Global,
            DMReference::GlobalProc(_) => ReferenceType::GlobalProc,
            DMReference::Field(_) => ReferenceType::Field,
            DMReference::SrcField(_) => ReferenceType::SrcField,
            DMReference::SrcProc(_) => ReferenceType::SrcProc,
            DMReference::Callee => ReferenceType::Callee,
            DMReference::Caller => ReferenceType::Caller,
            DMReference::Invalid => ReferenceType::Invalid,
        }
    }

    /// Stack slots the reference consumes when an instruction resolves it
    pub fn stack_operands(&self) -> i32 {
        match self {
            DMReference::Field(_) => 1,
            DMReference::ListIndex => 2,
            _ => 0,
        }
    }

    /// String-table index carried by symbolic references
    pub fn string_id(&self) -> Option<i32> {
        match self {
            DMReference::Field(id) | DMReference::SrcField(id) | DMReference::SrcProc(id) => Some(*id),
            _ => None,
        }
    }

    /// Rendering with names looked up in `strings`
    pub fn display_with<'a>(
        &'a self,
        strings: &'a [String],
    ) -> impl fmt::Display + 'a {
        ReferenceDisplay {
            reference: self,
            strings,
        }
    }
}

struct ReferenceDisplay<'a> {
    reference: &'a DMReference,
    strings: &'a [String],
}

impl fmt::Display for ReferenceDisplay<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let kind = self.reference.ref_type();
        match self.reference.string_id() {
            Some(id) => match usize::try_from(id).ok().and_then(|i| self.strings.get(i)) {
                Some(name) => write!(f, "{}(\"{}\")", kind, name),
                None => write!(f, "{}(#{})", kind, id),
            },
            None => fmt::Display::fmt(self.reference, f),
        }
    }
}

impl fmt::Display for DMReference {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let kind = self.ref_type();
        match self {
            DMReference::Argument(index) | DMReference::Local(index) => write!(f, "{}({})", kind, index),
            DMReference::Global(index) | DMReference::GlobalProc(index) => write!(f, "{}({})", kind, index),
            DMReference::Field(id) | DMReference::SrcField(id) | DMReference::SrcProc(id) => {
                write!(f, "{}(#{})", kind, id)
            }
            _ => write!(f, "{}", kind),
        }
    }
}
