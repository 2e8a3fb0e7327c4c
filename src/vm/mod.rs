//! Bytecode target
//!
//! The instruction catalog, the reference model, the codec shared by the
//! compiler and the disassembler, and the marker encoding of formatted
//! strings.

pub mod codec;
pub mod disasm;
pub mod opcode;
pub mod reference;
pub mod string_format;

#[cfg(test)]
mod tests;

pub use codec::{decode, BytecodeReader, BytecodeWriter, DecodeError, EncodeError, Instruction, Operand, Operands};
pub use disasm::{disassemble, format_instruction};
pub use opcode::{
    opcodes_fingerprint, opcodes_version, ArgKind, CallArgumentsType, ControlFlow, DreamProcOpcode, OpcodeMetadata,
};
pub use reference::{DMReference, ReferenceType};
pub use string_format::FormatSuffix;
