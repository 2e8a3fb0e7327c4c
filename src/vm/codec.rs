//! Bytecode encoding and decoding
//!
//! Layout of one instruction: the opcode byte, then each operand in the
//! order its [`OpcodeMetadata`](super::OpcodeMetadata) lists. Integers,
//! labels and string indices are little-endian `i32`, floats are `f32`,
//! argument types are one byte, references are a tag byte followed by
//! their own operand. Variable-args opcodes append `count` items after
//! the fixed operands.

use smallvec::SmallVec;
use thiserror::Error;

use super::opcode::{ArgKind, CallArgumentsType, DreamProcOpcode};
use super::reference::{DMReference, ReferenceType};

/// One decoded operand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    ArgType(CallArgumentsType),
    /// Any `i32` operand; the kind comes from the opcode's metadata
    Int(i32),
    /// Absolute byte offset
    Label(i32),
    Float(f32),
    /// String-table index, for strings and resource paths
    String(i32),
    Reference(DMReference),
}

impl Operand {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Operand::Int(value) | Operand::Label(value) | Operand::String(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&DMReference> {
        match self {
            Operand::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    fn matches(
        &self,
        kind: ArgKind,
    ) -> bool {
        match self {
            Operand::ArgType(_) => kind == ArgKind::ArgType,
            Operand::Int(_) => kind.is_int(),
            Operand::Label(_) => kind == ArgKind::Label,
            Operand::Float(_) => kind == ArgKind::Float,
            Operand::String(_) => matches!(kind, ArgKind::String | ArgKind::Resource),
            Operand::Reference(_) => kind == ArgKind::Reference,
        }
    }
}

pub type Operands = SmallVec<[Operand; 4]>;

/// A decoded instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset of the opcode
    pub offset: usize,
    pub opcode: DreamProcOpcode,
    pub args: Operands,
}

impl Instruction {
    /// Target of the instruction's label operand
    pub fn label(&self) -> Option<usize> {
        self.args.iter().find_map(|arg| match arg {
            Operand::Label(offset) => usize::try_from(*offset).ok(),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unexpected end of bytecode at offset {offset}")]
    Truncated { offset: usize },

    #[error("Unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("Unknown reference type {tag} at offset {offset}")]
    UnknownReference { offset: usize, tag: u8 },

    #[error("Unknown call argument type {value} at offset {offset}")]
    UnknownArgumentType { offset: usize, value: u8 },

    #[error("String index {index} out of range at offset {offset}")]
    StringOutOfRange { offset: usize, index: i32 },

    #[error("Negative operand count {count} at offset {offset}")]
    NegativeCount { offset: usize, count: i32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{opcode} expects {expected} operands, got {found}")]
    ArgumentCount {
        opcode: DreamProcOpcode,
        expected: usize,
        found: usize,
    },

    #[error("{opcode} operand {index} should be {expected:?}, got {found:?}")]
    ArgumentKind {
        opcode: DreamProcOpcode,
        index: usize,
        expected: ArgKind,
        found: Operand,
    },
}

/// Appends encoded instructions to a byte buffer
#[derive(Debug, Default, Clone)]
pub struct BytecodeWriter {
    bytes: Vec<u8>,
}

impl BytecodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_opcode(
        &mut self,
        opcode: DreamProcOpcode,
    ) {
        self.bytes.push(opcode as u8);
    }

    pub fn write_byte(
        &mut self,
        value: u8,
    ) {
        self.bytes.push(value);
    }

    pub fn write_int(
        &mut self,
        value: i32,
    ) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_float(
        &mut self,
        value: f32,
    ) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_reference(
        &mut self,
        reference: &DMReference,
    ) {
        self.write_byte(reference.ref_type() as u8);
        match reference {
            DMReference::Argument(index) | DMReference::Local(index) => self.write_byte(*index),
            DMReference::Global(value)
            | DMReference::GlobalProc(value)
            | DMReference::Field(value)
            | DMReference::SrcField(value)
            | DMReference::SrcProc(value) => self.write_int(*value),
            _ => {}
        }
    }

    pub fn write_operand(
        &mut self,
        operand: &Operand,
    ) {
        match operand {
            Operand::ArgType(value) => self.write_byte(*value as u8),
            Operand::Int(value) | Operand::Label(value) | Operand::String(value) => self.write_int(*value),
            Operand::Float(value) => self.write_float(*value),
            Operand::Reference(reference) => self.write_reference(reference),
        }
    }

    /// Overwrite the `i32` at `position`, for label fixups
    pub fn patch_int(
        &mut self,
        position: usize,
        value: i32,
    ) {
        if let Some(slot) = self.bytes.get_mut(position..position + 4) {
            slot.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Encode one instruction after checking its operands against the catalog
    pub fn encode(
        &mut self,
        opcode: DreamProcOpcode,
        args: &[Operand],
    ) -> Result<(), EncodeError> {
        check_operands(opcode, args)?;
        self.write_opcode(opcode);
        for arg in args {
            self.write_operand(arg);
        }
        Ok(())
    }
}

fn check_operands(
    opcode: DreamProcOpcode,
    args: &[Operand],
) -> Result<(), EncodeError> {
    let fixed = opcode.metadata().args;
    let item = opcode.variable_arg_kinds();

    let expected = if opcode.metadata().variable_args {
        let count = args
            .get(fixed.len().wrapping_sub(1))
            .and_then(Operand::as_int)
            .unwrap_or(0)
            .max(0) as usize;
        fixed.len() + count * item.len()
    } else {
        fixed.len()
    };
    if args.len() != expected {
        return Err(EncodeError::ArgumentCount {
            opcode,
            expected,
            found: args.len(),
        });
    }

    let kinds = fixed.iter().chain(item.iter().cycle());
    for (index, (arg, kind)) in args.iter().zip(kinds).enumerate() {
        if !arg.matches(*kind) {
            return Err(EncodeError::ArgumentKind {
                opcode,
                index,
                expected: *kind,
                found: *arg,
            });
        }
    }
    Ok(())
}

/// Sequential decoder over one proc's bytecode
pub struct BytecodeReader<'a> {
    bytes: &'a [u8],
    strings: &'a [String],
    offset: usize,
}

impl<'a> BytecodeReader<'a> {
    pub fn new(
        bytes: &'a [u8],
        strings: &'a [String],
    ) -> Self {
        Self {
            bytes,
            strings,
            offset: 0,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> bool {
        self.offset < self.bytes.len()
    }

    pub fn strings(&self) -> &'a [String] {
        self.strings
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.offset + N;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(DecodeError::Truncated { offset: self.offset })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.offset = end;
        Ok(out)
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_int(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    /// A string-table index, checked against the table
    pub fn read_string_id(&mut self) -> Result<i32, DecodeError> {
        let offset = self.offset;
        let index = self.read_int()?;
        if usize::try_from(index).map_or(true, |i| i >= self.strings.len()) {
            return Err(DecodeError::StringOutOfRange { offset, index });
        }
        Ok(index)
    }

    pub fn read_opcode(&mut self) -> Result<DreamProcOpcode, DecodeError> {
        let offset = self.offset;
        let byte = self.read_byte()?;
        DreamProcOpcode::try_from(byte).map_err(|byte| DecodeError::UnknownOpcode { offset, byte })
    }

    pub fn read_reference(&mut self) -> Result<DMReference, DecodeError> {
        let offset = self.offset;
        let tag = self.read_byte()?;
        let kind = ReferenceType::try_from(tag).map_err(|tag| DecodeError::UnknownReference { offset, tag })?;
        Ok(match kind {
            ReferenceType::Src => DMReference::Src,
            ReferenceType::SelfRef => DMReference::SelfRef,
            ReferenceType::Usr => DMReference::Usr,
            ReferenceType::Args => DMReference::Args,
            ReferenceType::World => DMReference::World,
            ReferenceType::SuperProc => DMReference::SuperProc,
            ReferenceType::ListIndex => DMReference::ListIndex,
            ReferenceType::Argument => DMReference::Argument(self.read_byte()?),
            ReferenceType::Local => DMReference::Local(self.read_byte()?),
            ReferenceType::Global => DMReference::Global(self.read_int()?),
            ReferenceType::GlobalProc => DMReference::GlobalProc(self.read_int()?),
            ReferenceType::Field => DMReference::Field(self.read_string_id()?),
            ReferenceType::SrcField => DMReference::SrcField(self.read_string_id()?),
            ReferenceType::SrcProc => DMReference::SrcProc(self.read_string_id()?),
            ReferenceType::Callee => DMReference::Callee,
            ReferenceType::Caller => DMReference::Caller,
            ReferenceType::Invalid => DMReference::Invalid,
        })
    }

    pub fn read_operand(
        &mut self,
        kind: ArgKind,
    ) -> Result<Operand, DecodeError> {
        Ok(match kind {
            ArgKind::ArgType => {
                let offset = self.offset;
                let value = self.read_byte()?;
                let arg_type = CallArgumentsType::try_from(value)
                    .map_err(|value| DecodeError::UnknownArgumentType { offset, value })?;
                Operand::ArgType(arg_type)
            }
            ArgKind::Label => Operand::Label(self.read_int()?),
            ArgKind::Float => Operand::Float(self.read_float()?),
            ArgKind::String | ArgKind::Resource => Operand::String(self.read_string_id()?),
            ArgKind::Reference => Operand::Reference(self.read_reference()?),
            _ => Operand::Int(self.read_int()?),
        })
    }

    /// Decode the instruction at the current offset
    pub fn read_instruction(&mut self) -> Result<Instruction, DecodeError> {
        let offset = self.offset;
        let opcode = self.read_opcode()?;
        let metadata = opcode.metadata();

        let mut args = Operands::new();
        for kind in metadata.args {
            args.push(self.read_operand(*kind)?);
        }

        if metadata.variable_args {
            let count_offset = self.offset;
            let count = args.last().and_then(Operand::as_int).unwrap_or(0);
            if count < 0 {
                return Err(DecodeError::NegativeCount {
                    offset: count_offset,
                    count,
                });
            }
            for _ in 0..count {
                for kind in opcode.variable_arg_kinds() {
                    args.push(self.read_operand(*kind)?);
                }
            }
        }

        Ok(Instruction { offset, opcode, args })
    }

    /// Decode every remaining instruction
    pub fn read_all(&mut self) -> Result<Vec<Instruction>, DecodeError> {
        let mut instructions = Vec::new();
        while self.remaining() {
            instructions.push(self.read_instruction()?);
        }
        Ok(instructions)
    }
}

impl Iterator for BytecodeReader<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.remaining() {
            return None;
        }
        let item = self.read_instruction();
        if item.is_err() {
            // Nothing after a malformed instruction can be trusted
            self.offset = self.bytes.len();
        }
        Some(item)
    }
}

/// Decode a whole proc
pub fn decode(
    bytes: &[u8],
    strings: &[String],
) -> Result<Vec<Instruction>, DecodeError> {
    BytecodeReader::new(bytes, strings).read_all()
}
