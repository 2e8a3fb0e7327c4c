//! Stack verification
//!
//! Walks every path through a proc's bytecode and checks that the operand
//! stack depth at each instruction is the same whichever way it is reached
//! and never drops below zero. The peak depth becomes the proc's
//! `MaxStackSize`.

use hashbrown::HashMap;

use crate::vm::{decode, ArgKind, ControlFlow, DreamProcOpcode, Instruction, Operand};

use super::CodegenError;

/// Net stack change of one instruction, operands included
pub fn stack_effect(instruction: &Instruction) -> i32 {
    use DreamProcOpcode::*;

    let opcode = instruction.opcode;
    let metadata = opcode.metadata();
    let mut effect = metadata.stack_delta;

    for (kind, arg) in metadata.args.iter().zip(&instruction.args) {
        let value = arg.as_int().unwrap_or(0);
        match kind {
            ArgKind::ListSize => {
                let per_entry = if matches!(opcode, CreateAssociativeList | CreateStrictAssociativeList) {
                    2
                } else {
                    1
                };
                effect += 1 - per_entry * value;
            }
            ArgKind::FormatCount | ArgKind::ConcatCount => effect += 1 - value,
            ArgKind::PickCount => {
                let per_entry = if opcode == PickWeighted { 2 } else { 1 };
                effect += 1 - per_entry * value;
            }
            ArgKind::StackDelta => {
                effect += if opcode.call_consumes_owner() { -value } else { 1 - value };
            }
            ArgKind::Reference if !opcode.references_leave_stack() => {
                if let Operand::Reference(reference) = arg {
                    effect -= reference.stack_operands();
                }
            }
            _ => {}
        }
    }

    if metadata.variable_args {
        let count = instruction
            .args
            .get(metadata.args.len().wrapping_sub(1))
            .and_then(Operand::as_int)
            .unwrap_or(0);
        effect += match opcode {
            PushNRefs | PushNFloats | PushNStrings | PushNResources => count,
            PushNOfStringFloats => 2 * count,
            _ => 0,
        };
    }
    effect
}

/// Verify `bytecode` and return its peak stack depth
pub fn verify(
    bytecode: &[u8],
    strings: &[String],
) -> Result<i32, CodegenError> {
    let instructions = decode(bytecode, strings)?;
    let index_of: HashMap<usize, usize> = instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| (instruction.offset, index))
        .collect();

    let mut depths: Vec<Option<i32>> = vec![None; instructions.len()];
    let mut worklist: Vec<(usize, i32)> = Vec::new();
    let mut peak = 0;
    if !instructions.is_empty() {
        worklist.push((0, 0));
    }

    // Offset one past the last instruction; reaching it leaves the proc
    let end = bytecode.len();
    let target_index = |instruction: &Instruction| -> Result<Option<usize>, CodegenError> {
        let Some(target) = instruction.label() else {
            return Ok(None);
        };
        if target == end {
            return Ok(None);
        }
        index_of
            .get(&target)
            .copied()
            .map(Some)
            .ok_or(CodegenError::BadJumpTarget {
                offset: instruction.offset,
                target,
            })
    };

    while let Some((index, depth)) = worklist.pop() {
        let instruction = &instructions[index];
        match depths[index] {
            Some(expected) if expected == depth => continue,
            Some(expected) => {
                return Err(CodegenError::StackMismatch {
                    offset: instruction.offset,
                    expected,
                    found: depth,
                })
            }
            None => depths[index] = Some(depth),
        }

        let after = depth + stack_effect(instruction);
        if after < 0 {
            return Err(CodegenError::NegativeStack {
                offset: instruction.offset,
            });
        }
        peak = peak.max(depth).max(after);

        let next = (index + 1 < instructions.len()).then_some(index + 1);
        match instruction.opcode.control_flow() {
            ControlFlow::Next => worklist.extend(next.map(|next| (next, after))),
            ControlFlow::Exit => {}
            ControlFlow::Jump => {
                worklist.extend(target_index(instruction)?.map(|target| (target, after)));
            }
            ControlFlow::Branch { edge_delta } => {
                let taken = depth + edge_delta;
                if taken < 0 {
                    return Err(CodegenError::NegativeStack {
                        offset: instruction.offset,
                    });
                }
                peak = peak.max(taken);
                worklist.extend(target_index(instruction)?.map(|target| (target, taken)));
                worklist.extend(next.map(|next| (next, after)));
            }
        }
    }
    Ok(peak)
}
