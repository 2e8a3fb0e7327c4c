//! Statement lowering
//!
//! Statements leave the stack as they found it. Loops push a [`LoopFrame`]
//! that `break` and `continue` resolve against; `for` headers pick one of
//! the enumerator shapes before falling back to the C-style loop.

use crate::frontend::dm::ast::{
    BinaryOp, Expression, ExpressionKind, ProcBlock, ProcStatement, ProcStatementKind, ProcVarDeclaration,
    SwitchCase, ValueType, VarModifiers,
};
use crate::middle::objtree::DMVariable;
use crate::util::diagnostic::WarningCode;
use crate::util::span::Location;
use crate::vm::{DMReference, DreamProcOpcode, Operand};

use super::{CodegenResult, Label, LoopFrame, ProcBuilder};

/// How a `for` header iterates
enum ForShape<'e> {
    Range {
        target: &'e Expression,
        start: &'e Expression,
        end: &'e Expression,
        step: Option<&'e Expression>,
    },
    List {
        target: &'e Expression,
        list: &'e Expression,
    },
    Type {
        target: &'e Expression,
    },
    CStyle,
}

fn for_shape<'e>(
    init: Option<&'e Expression>,
    condition: Option<&Expression>,
    increment: Option<&Expression>,
) -> ForShape<'e> {
    let Some(init) = init else {
        return ForShape::CStyle;
    };
    if condition.is_some() || increment.is_some() {
        return ForShape::CStyle;
    }
    match &init.kind {
        ExpressionKind::InRange {
            value,
            start,
            end,
            step,
        } => ForShape::Range {
            target: value,
            start,
            end,
            step: step.as_deref(),
        },
        ExpressionKind::Binary {
            op: BinaryOp::In,
            lhs,
            rhs,
        } => ForShape::List { target: lhs, list: rhs },
        ExpressionKind::VarDecl(_) => ForShape::Type { target: init },
        _ => ForShape::CStyle,
    }
}

impl ProcBuilder<'_> {
    pub(super) fn emit_block(
        &mut self,
        block: &ProcBlock,
    ) -> CodegenResult {
        self.writer.enter_scope();
        for statement in &block.statements {
            self.emit_statement(statement)?;
        }
        self.writer.exit_scope();
        Ok(())
    }

    /// A block with no loop frame of its own, for bodies that must not
    /// `break` out of the enclosing loop
    fn emit_detached_block(
        &mut self,
        block: &ProcBlock,
    ) -> CodegenResult {
        let loops = std::mem::take(&mut self.loops);
        let result = self.emit_block(block);
        self.loops = loops;
        result
    }

    pub(super) fn emit_statement(
        &mut self,
        statement: &ProcStatement,
    ) -> CodegenResult {
        let location = &statement.location;
        self.set_location(location);

        match &statement.kind {
            ProcStatementKind::Null | ProcStatementKind::Invalid => Ok(()),
            // Hoisted into the proc's attributes before the body
            ProcStatementKind::Set { .. } => Ok(()),
            ProcStatementKind::Expression(expr) => {
                self.emit_expression(expr)?;
                self.emit(DreamProcOpcode::Pop, &[])
            }
            ProcStatementKind::VarDeclaration(declaration) => self.emit_var_declaration(declaration, location),
            ProcStatementKind::Aggregate(statements) => {
                for statement in statements {
                    self.emit_statement(statement)?;
                }
                Ok(())
            }
            ProcStatementKind::Return(value) => {
                match value {
                    Some(value) => self.emit_expression(value)?,
                    None => self.emit(
                        DreamProcOpcode::PushReferenceValue,
                        &[Operand::Reference(DMReference::SelfRef)],
                    )?,
                }
                self.emit(DreamProcOpcode::Return, &[])
            }
            ProcStatementKind::Break(name) => self.emit_loop_exit(name.as_deref(), true, location),
            ProcStatementKind::Continue(name) => self.emit_loop_exit(name.as_deref(), false, location),
            ProcStatementKind::Goto(name) => {
                let label = self.goto_label(name);
                self.emit_jump(DreamProcOpcode::Jump, &[], label)
            }
            ProcStatementKind::Label { name, body } => {
                let label = self.goto_label(name);
                if self.placed_labels.insert(name.clone()) {
                    self.writer.mark(label);
                } else {
                    self.report(
                        WarningCode::BadLabel,
                        location,
                        format!("A label named \"{}\" already exists", name),
                    );
                }
                if let Some(body) = body {
                    self.pending_loop_name = Some(name.clone());
                    self.emit_block(body)?;
                    self.pending_loop_name = None;
                }
                Ok(())
            }
            ProcStatementKind::Del(value) => {
                self.emit_expression(value)?;
                self.emit(DreamProcOpcode::DeleteObject, &[])
            }
            ProcStatementKind::Spawn { delay, body } => {
                let after = self.writer.new_label();
                self.emit_expression(delay)?;
                self.emit_jump(DreamProcOpcode::Spawn, &[], after)?;
                self.emit_detached_block(body)?;
                self.emit(DreamProcOpcode::PushNull, &[])?;
                self.emit(DreamProcOpcode::Return, &[])?;
                self.writer.mark(after);
                Ok(())
            }
            ProcStatementKind::If {
                condition,
                body,
                else_body,
            } => {
                let otherwise = self.writer.new_label();
                self.emit_expression(condition)?;
                self.emit_jump(DreamProcOpcode::JumpIfFalse, &[], otherwise)?;
                self.emit_block(body)?;
                match else_body {
                    Some(else_body) => {
                        let end = self.writer.new_label();
                        self.emit_jump(DreamProcOpcode::Jump, &[], end)?;
                        self.writer.mark(otherwise);
                        self.emit_block(else_body)?;
                        self.writer.mark(end);
                    }
                    None => self.writer.mark(otherwise),
                }
                Ok(())
            }
            ProcStatementKind::For {
                init,
                condition,
                increment,
                body,
                ..
            } => self.emit_for(init.as_ref(), condition.as_ref(), increment.as_ref(), body, location),
            ProcStatementKind::InfLoop(body) => {
                let (start, end) = self.push_loop();
                self.writer.mark(start);
                self.emit_block(body)?;
                self.emit_jump(DreamProcOpcode::Jump, &[], start)?;
                self.pop_loop(end);
                Ok(())
            }
            ProcStatementKind::While { condition, body } => {
                let (start, end) = self.push_loop();
                self.writer.mark(start);
                self.emit_expression(condition)?;
                self.emit_jump(DreamProcOpcode::JumpIfFalse, &[], end)?;
                self.emit_block(body)?;
                self.emit_jump(DreamProcOpcode::Jump, &[], start)?;
                self.pop_loop(end);
                Ok(())
            }
            ProcStatementKind::DoWhile { condition, body } => {
                let start = self.writer.new_label();
                let (check, end) = self.push_loop();
                self.writer.mark(start);
                self.emit_block(body)?;
                self.writer.mark(check);
                self.emit_expression(condition)?;
                self.emit_jump(DreamProcOpcode::JumpIfFalse, &[], end)?;
                self.emit_jump(DreamProcOpcode::Jump, &[], start)?;
                self.pop_loop(end);
                Ok(())
            }
            ProcStatementKind::Switch { value, cases } => self.emit_switch(value, cases),
            ProcStatementKind::Browse {
                receiver,
                body,
                options,
            } => self.emit_triple(DreamProcOpcode::Browse, [receiver, body, options]),
            ProcStatementKind::BrowseResource {
                receiver,
                file,
                filename,
            } => self.emit_triple(DreamProcOpcode::BrowseResource, [receiver, file, filename]),
            ProcStatementKind::OutputControl {
                receiver,
                message,
                control,
            } => self.emit_triple(DreamProcOpcode::OutputControl, [receiver, message, control]),
            ProcStatementKind::Ftp { receiver, file, name } => {
                self.emit_triple(DreamProcOpcode::Ftp, [receiver, file, name])
            }
            ProcStatementKind::Output { receiver, value } => {
                self.emit_expression(receiver)?;
                self.emit_expression(value)?;
                self.emit(DreamProcOpcode::Output, &[])
            }
            ProcStatementKind::Input { source, target } => {
                let on_stack = |expr: &Expression| matches!(expr.unwrapped().kind, ExpressionKind::Dereference { .. });
                if on_stack(source) || on_stack(target) {
                    self.report(
                        WarningCode::UnsupportedAccess,
                        location,
                        "<< on a field or list element is not supported",
                    );
                    return Ok(());
                }
                let (Some(source), Some(target)) = (self.emit_reference(source)?, self.emit_reference(target)?) else {
                    return Ok(());
                };
                self.emit(
                    DreamProcOpcode::Input,
                    &[Operand::Reference(source), Operand::Reference(target)],
                )
            }
            ProcStatementKind::TryCatch {
                try_body,
                catch_param,
                catch_body,
            } => self.emit_try(try_body, catch_param.as_deref(), catch_body.as_ref(), location),
            ProcStatementKind::Throw(value) => {
                match value {
                    Some(value) => self.emit_expression(value)?,
                    None => self.emit(DreamProcOpcode::PushNull, &[])?,
                }
                self.emit(DreamProcOpcode::Throw, &[])
            }
        }
    }

    fn emit_var_declaration(
        &mut self,
        declaration: &ProcVarDeclaration,
        location: &Location,
    ) -> CodegenResult {
        if declaration.is_global {
            let value = declaration
                .value
                .clone()
                .unwrap_or_else(|| Expression::null(location.clone()));
            let needs_init = !value.is_constant();
            let id = self.tree.add_global(DMVariable {
                name: declaration.name.clone(),
                location: location.clone(),
                type_path: declaration.type_path.clone(),
                modifiers: VarModifiers {
                    is_static: true,
                    is_const: declaration.is_const,
                    ..VarModifiers::default()
                },
                types: declaration.types.unwrap_or(ValueType::ANYTHING),
                value: value.clone(),
            });
            if needs_init {
                self.tree.add_global_init(id, self.owner, value);
            }
            self.proc_globals.insert(declaration.name.clone(), id);
            return Ok(());
        }

        if self.writer.is_declared_in_scope(&declaration.name) {
            self.report(
                WarningCode::DuplicateVariable,
                location,
                format!("Duplicate var \"{}\"", declaration.name),
            );
            return Ok(());
        }

        let id = self.declare_local(
            &declaration.name,
            declaration.type_path.clone(),
            declaration.is_const,
        )?;
        if let Some(value) = &declaration.value {
            let outer = std::mem::replace(&mut self.inferred_type, declaration.type_path.clone());
            let result = self.emit_expression(value);
            self.inferred_type = outer;
            result?;
            self.emit(DreamProcOpcode::Assign, &[Operand::Reference(DMReference::Local(id))])?;
            self.emit(DreamProcOpcode::Pop, &[])?;
        }
        Ok(())
    }

    /// Open a loop frame, returning its continue and break labels
    fn push_loop(&mut self) -> (Label, Label) {
        let continue_label = self.writer.new_label();
        let break_label = self.writer.new_label();
        self.loops.push(LoopFrame {
            name: self.pending_loop_name.take(),
            break_label,
            continue_label,
        });
        (continue_label, break_label)
    }

    fn pop_loop(
        &mut self,
        break_label: Label,
    ) {
        self.loops.pop();
        self.writer.mark(break_label);
    }

    fn emit_loop_exit(
        &mut self,
        name: Option<&str>,
        is_break: bool,
        location: &Location,
    ) -> CodegenResult {
        let frame = match name {
            Some(name) => self.loops.iter().rev().find(|frame| frame.name.as_deref() == Some(name)),
            None => self.loops.last(),
        };
        let Some(frame) = frame else {
            let keyword = if is_break { "break" } else { "continue" };
            let message = match name {
                Some(name) => format!("No enclosing loop is labeled \"{}\"", name),
                None => format!("{} outside of a loop", keyword),
            };
            self.report(WarningCode::BadLabel, location, message);
            return Ok(());
        };
        let label = if is_break {
            frame.break_label
        } else {
            frame.continue_label
        };
        self.emit_jump(DreamProcOpcode::Jump, &[], label)
    }

    /// A reference that needs nothing on the stack, or `None` once reported
    fn stack_free_reference(
        &mut self,
        expr: &Expression,
    ) -> CodegenResult<Option<DMReference>> {
        if matches!(expr.unwrapped().kind, ExpressionKind::Dereference { .. }) {
            return Ok(None);
        }
        self.emit_reference(expr)
    }

    fn emit_triple(
        &mut self,
        opcode: DreamProcOpcode,
        values: [&Expression; 3],
    ) -> CodegenResult {
        for value in values {
            self.emit_expression(value)?;
        }
        self.emit(opcode, &[])
    }

    fn emit_for(
        &mut self,
        init: Option<&Expression>,
        condition: Option<&Expression>,
        increment: Option<&Expression>,
        body: &ProcBlock,
        location: &Location,
    ) -> CodegenResult {
        // The loop var belongs to the loop
        self.writer.enter_scope();
        let result = match for_shape(init, condition, increment) {
            ForShape::Range {
                target,
                start,
                end,
                step,
            } => {
                let enumerator = self.new_enumerator();
                self.emit_expression(start)?;
                self.emit_expression(end)?;
                match step {
                    Some(step) => self.emit_expression(step)?,
                    None => self.emit(DreamProcOpcode::PushFloat, &[Operand::Float(1.0)])?,
                }
                self.emit(DreamProcOpcode::CreateRangeEnumerator, &[Operand::Int(enumerator)])?;
                self.emit_enumerator_loop(enumerator, target, body, location)
            }
            ForShape::List { target, list } => {
                let enumerator = self.new_enumerator();
                let filter = self
                    .expression_type(target)
                    .and_then(|path| self.tree.type_id(&path));
                self.emit_expression(list)?;
                match filter {
                    Some(type_id) => self.emit(
                        DreamProcOpcode::CreateFilteredListEnumerator,
                        &[Operand::Int(enumerator), Operand::Int(type_id)],
                    )?,
                    None => self.emit(DreamProcOpcode::CreateListEnumerator, &[Operand::Int(enumerator)])?,
                }
                self.emit_enumerator_loop(enumerator, target, body, location)
            }
            ForShape::Type { target } => {
                let type_id = self
                    .expression_type(target)
                    .and_then(|path| self.tree.type_id(&path));
                let Some(type_id) = type_id else {
                    self.report(
                        WarningCode::BadExpression,
                        location,
                        "for() over a var without a declared type",
                    );
                    self.writer.exit_scope();
                    return Ok(());
                };
                let enumerator = self.new_enumerator();
                self.emit(DreamProcOpcode::PushType, &[Operand::Int(type_id)])?;
                self.emit(DreamProcOpcode::CreateTypeEnumerator, &[Operand::Int(enumerator)])?;
                self.emit_enumerator_loop(enumerator, target, body, location)
            }
            ForShape::CStyle => self.emit_c_style_for(init, condition, increment, body),
        };
        self.writer.exit_scope();
        result
    }

    /// `start: Enumerate; body; Jump start; end: DestroyEnumerator`
    fn emit_enumerator_loop(
        &mut self,
        enumerator: i32,
        target: &Expression,
        body: &ProcBlock,
        location: &Location,
    ) -> CodegenResult {
        let reference = self.stack_free_reference(target)?;
        if reference.is_none() && matches!(target.unwrapped().kind, ExpressionKind::Dereference { .. }) {
            self.report(
                WarningCode::UnsupportedAccess,
                location,
                "Iterating into a field or list element is not supported",
            );
        }

        let (start, end) = self.push_loop();
        self.writer.mark(start);
        match reference {
            Some(reference) => self.emit_jump(
                DreamProcOpcode::Enumerate,
                &[Operand::Int(enumerator), Operand::Reference(reference)],
                end,
            )?,
            None => self.emit_jump(DreamProcOpcode::EnumerateNoAssign, &[Operand::Int(enumerator)], end)?,
        }
        self.emit_block(body)?;
        self.emit_jump(DreamProcOpcode::Jump, &[], start)?;
        self.pop_loop(end);
        self.emit(DreamProcOpcode::DestroyEnumerator, &[Operand::Int(enumerator)])
    }

    fn emit_c_style_for(
        &mut self,
        init: Option<&Expression>,
        condition: Option<&Expression>,
        increment: Option<&Expression>,
        body: &ProcBlock,
    ) -> CodegenResult {
        if let Some(init) = init {
            self.emit_expression(init)?;
            self.emit(DreamProcOpcode::Pop, &[])?;
        }

        let start = self.writer.new_label();
        let (next, end) = self.push_loop();
        self.writer.mark(start);
        if let Some(condition) = condition {
            self.emit_expression(condition)?;
            self.emit_jump(DreamProcOpcode::JumpIfFalse, &[], end)?;
        }
        self.emit_block(body)?;
        self.writer.mark(next);
        if let Some(increment) = increment {
            self.emit_expression(increment)?;
            self.emit(DreamProcOpcode::Pop, &[])?;
        }
        self.emit_jump(DreamProcOpcode::Jump, &[], start)?;
        self.pop_loop(end);
        Ok(())
    }

    /// Cases test in order; the first match jumps to its body with the
    /// switch value popped. No match pops it and runs `else`.
    fn emit_switch(
        &mut self,
        value: &Expression,
        cases: &[SwitchCase],
    ) -> CodegenResult {
        self.emit_expression(value)?;

        let end = self.writer.new_label();
        let mut bodies: Vec<(Label, &ProcBlock)> = Vec::new();
        let mut default = None;
        for case in cases {
            match case {
                SwitchCase::Values(values, body) => {
                    let label = self.writer.new_label();
                    for value in values {
                        match &value.kind {
                            ExpressionKind::SwitchRange { start, end } => {
                                self.emit_expression(start)?;
                                self.emit_expression(end)?;
                                self.emit_jump(DreamProcOpcode::SwitchCaseRange, &[], label)?;
                            }
                            _ => {
                                self.emit_expression(value)?;
                                self.emit_jump(DreamProcOpcode::SwitchCase, &[], label)?;
                            }
                        }
                    }
                    bodies.push((label, body));
                }
                SwitchCase::Default(body) => default = Some(body),
            }
        }

        self.emit(DreamProcOpcode::Pop, &[])?;
        if let Some(body) = default {
            self.emit_block(body)?;
        }
        self.emit_jump(DreamProcOpcode::Jump, &[], end)?;
        for (label, body) in bodies {
            self.writer.mark(label);
            self.emit_block(body)?;
            self.emit_jump(DreamProcOpcode::Jump, &[], end)?;
        }
        self.writer.mark(end);
        Ok(())
    }

    fn emit_try(
        &mut self,
        try_body: &ProcBlock,
        catch_param: Option<&ProcStatement>,
        catch_body: Option<&ProcBlock>,
        location: &Location,
    ) -> CodegenResult {
        let catch = self.writer.new_label();
        let end = self.writer.new_label();
        self.writer.enter_scope();

        let caught = match catch_param.map(|param| &param.kind) {
            Some(ProcStatementKind::VarDeclaration(declaration)) if !declaration.is_global => {
                Some(self.declare_local(&declaration.name, declaration.type_path.clone(), false)?)
            }
            Some(_) => {
                self.report(
                    WarningCode::BadExpression,
                    location,
                    "catch() takes a single var declaration",
                );
                None
            }
            None => None,
        };
        match caught {
            Some(id) => self.emit_jump(
                DreamProcOpcode::Try,
                &[Operand::Reference(DMReference::Local(id))],
                catch,
            )?,
            None => self.emit_jump(DreamProcOpcode::TryNoValue, &[], catch)?,
        }

        self.emit_block(try_body)?;
        self.emit(DreamProcOpcode::EndTry, &[])?;
        self.emit_jump(DreamProcOpcode::Jump, &[], end)?;
        self.writer.mark(catch);
        if let Some(body) = catch_body {
            self.emit_block(body)?;
        }
        self.writer.mark(end);
        self.writer.exit_scope();
        Ok(())
    }
}
