//! Per-proc bytecode writer
//!
//! Wraps [`BytecodeWriter`] with forward labels, the local-variable scope
//! stack and the line table. Jumps are written with a zero placeholder and
//! recorded as pending; [`ProcWriter::resolve`] backfills every placeholder
//! once all labels are placed.

use std::sync::Arc;

use crate::middle::artifact::{LocalVariableJson, SourceInfoJson};
use crate::util::span::Location;
use crate::vm::{ArgKind, BytecodeWriter, DMReference, DreamProcOpcode, Operand};

use super::CodegenError;

/// Locals are addressed by one byte
pub const MAX_LOCALS: usize = 256;

/// A jump target, placed at most once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// Encoded width of an operand
fn operand_width(operand: &Operand) -> usize {
    match operand {
        Operand::ArgType(_) => 1,
        Operand::Int(_) | Operand::Label(_) | Operand::Float(_) | Operand::String(_) => 4,
        Operand::Reference(reference) => {
            1 + match reference {
                DMReference::Argument(_) | DMReference::Local(_) => 1,
                DMReference::Global(_)
                | DMReference::GlobalProc(_)
                | DMReference::Field(_)
                | DMReference::SrcField(_)
                | DMReference::SrcProc(_) => 4,
                _ => 0,
            }
        }
    }
}

/// Finished bytecode of one proc
#[derive(Debug, Clone, Default)]
pub struct ProcCode {
    pub bytecode: Vec<u8>,
    pub locals: Vec<LocalVariableJson>,
    pub source_info: Vec<SourceInfoJson>,
}

#[derive(Debug, Default)]
pub struct ProcWriter {
    code: BytecodeWriter,
    /// Byte offset of each placed label
    labels: Vec<Option<usize>>,
    /// Position of a label operand, and the label it refers to
    pending: Vec<(usize, Label)>,
    scopes: Vec<Vec<(String, u8)>>,
    local_count: usize,
    locals: Vec<LocalVariableJson>,
    source_info: Vec<SourceInfoJson>,
    last_source: Option<Arc<str>>,
    last_line: Option<u32>,
}

impl ProcWriter {
    pub fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
            ..Self::default()
        }
    }

    pub fn position(&self) -> usize {
        self.code.position()
    }

    pub fn bytes(&self) -> &[u8] {
        self.code.bytes()
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Place `label` at the current position
    pub fn mark(
        &mut self,
        label: Label,
    ) {
        if let Some(slot) = self.labels.get_mut(label.0) {
            *slot = Some(self.code.position());
        }
    }

    pub fn emit(
        &mut self,
        opcode: DreamProcOpcode,
        args: &[Operand],
    ) -> Result<(), CodegenError> {
        self.code.encode(opcode, args)?;
        Ok(())
    }

    /// Emit an instruction whose label operand targets `label`. `args` are
    /// the other operands; the label goes where the catalog puts it.
    pub fn emit_jump(
        &mut self,
        opcode: DreamProcOpcode,
        args: &[Operand],
        label: Label,
    ) -> Result<(), CodegenError> {
        let kinds = opcode.metadata().args;
        let index = kinds
            .iter()
            .position(|kind| *kind == ArgKind::Label)
            .ok_or(CodegenError::NotAJump(opcode))?;

        let mut operands: Vec<Operand> = Vec::with_capacity(args.len() + 1);
        operands.extend_from_slice(&args[..index.min(args.len())]);
        operands.push(Operand::Label(0));
        operands.extend_from_slice(&args[index.min(args.len())..]);

        let position = self.code.position() + 1 + operands[..index].iter().map(operand_width).sum::<usize>();
        self.code.encode(opcode, &operands)?;
        self.pending.push((position, label));
        Ok(())
    }

    /// Backfill every pending label operand
    pub fn resolve(&mut self) -> Result<(), CodegenError> {
        for (position, label) in std::mem::take(&mut self.pending) {
            let target = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or(CodegenError::UnresolvedLabel(label.0))?;
            self.code.patch_int(position, target as i32);
        }
        Ok(())
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Close the innermost scope, freeing its local slots
    pub fn exit_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        if !scope.is_empty() {
            self.local_count -= scope.len();
            self.locals.push(LocalVariableJson {
                offset: self.code.position() as i32,
                add: None,
                remove: Some(scope.len() as i32),
            });
        }
        if self.scopes.is_empty() {
            self.scopes.push(Vec::new());
        }
    }

    /// Declare a local in the innermost scope
    pub fn declare_local(
        &mut self,
        name: &str,
    ) -> Result<u8, CodegenError> {
        if self.local_count >= MAX_LOCALS {
            return Err(CodegenError::TooManyLocals(name.to_string()));
        }
        let id = self.local_count as u8;
        self.local_count += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name.to_string(), id));
        }
        self.locals.push(LocalVariableJson {
            offset: self.code.position() as i32,
            add: Some(name.to_string()),
            remove: None,
        });
        Ok(id)
    }

    pub fn is_declared_in_scope(
        &self,
        name: &str,
    ) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.iter().any(|(local, _)| local == name))
    }

    /// Innermost local named `name`
    pub fn local(
        &self,
        name: &str,
    ) -> Option<u8> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.iter().rev().find(|(local, _)| local == name).map(|(_, id)| *id))
    }

    /// Record that code from here on comes from `location`. `intern` maps a
    /// file name to its string id.
    pub fn set_location(
        &mut self,
        location: &Location,
        intern: impl FnOnce(&str) -> i32,
    ) {
        let Some(line) = location.line else {
            return;
        };
        let file_changed = location.source.is_some() && location.source != self.last_source;
        if !file_changed && self.last_line == Some(line) {
            return;
        }

        let file = if file_changed {
            self.last_source = location.source.clone();
            Some(intern(location.source_name()))
        } else {
            None
        };
        self.last_line = Some(line);

        let offset = self.code.position() as i32;
        // Nothing was emitted for the previous line
        if let Some(last) = self.source_info.last_mut() {
            if last.offset == offset {
                last.line = line as i32;
                if file.is_some() {
                    last.file = file;
                }
                return;
            }
        }
        self.source_info.push(SourceInfoJson {
            offset,
            file,
            line: line as i32,
        });
    }

    pub fn finish(mut self) -> Result<ProcCode, CodegenError> {
        self.resolve()?;
        Ok(ProcCode {
            bytecode: self.code.into_bytes(),
            locals: self.locals,
            source_info: self.source_info,
        })
    }
}
