//! Human-readable bytecode listing

use std::fmt::Write;

use super::codec::{BytecodeReader, Instruction, Operand};
use super::string_format;

fn quoted(
    strings: &[String],
    id: i32,
) -> String {
    match usize::try_from(id).ok().and_then(|i| strings.get(i)) {
        Some(text) => format!("{:?}", string_format::describe(text)),
        None => format!("#{}", id),
    }
}

/// One instruction as `offset  Opcode operand, operand`
pub fn format_instruction(
    instruction: &Instruction,
    strings: &[String],
) -> String {
    let mut line = format!("{:05}  {}", instruction.offset, instruction.opcode);
    for (index, arg) in instruction.args.iter().enumerate() {
        line.push_str(if index == 0 { " " } else { ", " });
        let _ = match arg {
            Operand::ArgType(kind) => write!(line, "{:?}", kind),
            Operand::Int(value) => write!(line, "{}", value),
            Operand::Label(offset) => write!(line, "-> {:05}", offset),
            Operand::Float(value) => write!(line, "{}", value),
            Operand::String(id) => write!(line, "{}", quoted(strings, *id)),
            Operand::Reference(reference) => write!(line, "{}", reference.display_with(strings)),
        };
    }
    line
}

/// Listing of a whole proc. A decode failure ends the listing with an
/// `error:` line instead of failing the whole call.
pub fn disassemble(
    bytes: &[u8],
    strings: &[String],
) -> String {
    let mut out = String::new();
    for item in BytecodeReader::new(bytes, strings) {
        match item {
            Ok(instruction) => {
                out.push_str(&format_instruction(&instruction, strings));
                out.push('\n');
            }
            Err(error) => {
                let _ = writeln!(out, "error: {}", error);
            }
        }
    }
    out
}
