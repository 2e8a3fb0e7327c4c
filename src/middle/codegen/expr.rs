//! Expression lowering
//!
//! Every expression leaves exactly one value on the stack, including the
//! ones that failed: an error is reported and null pushed in its place, so
//! the surrounding code still verifies.

use crate::frontend::dm::ast::{
    AssignOp, BinaryOp, Builtin, CallParameter, Callable, DerefKind, DerefOp, Expression, ExpressionKind, NewTarget,
    PickValue, ProcVarDeclaration, UnaryOp, ValueType,
};
use crate::frontend::dm::{Constant, DreamPath};
use crate::util::diagnostic::WarningCode;
use crate::util::span::Location;
use crate::vm::{CallArgumentsType, DMReference, DreamProcOpcode, Operand};

use super::{CodegenResult, ProcBuilder};

/// What an identifier names
enum Resolved {
    Reference(DMReference),
    Constant(Constant),
}

fn binary_opcode(op: BinaryOp) -> Option<DreamProcOpcode> {
    use DreamProcOpcode::*;
    let opcode = match op {
        BinaryOp::Add => Add,
        BinaryOp::Subtract => Subtract,
        BinaryOp::Multiply => Multiply,
        BinaryOp::Divide => Divide,
        BinaryOp::Modulus => Modulus,
        BinaryOp::ModulusModulus => ModulusModulus,
        BinaryOp::Power => Power,
        BinaryOp::Equal => CompareEquals,
        BinaryOp::NotEqual => CompareNotEquals,
        BinaryOp::Equivalent => CompareEquivalent,
        BinaryOp::NotEquivalent => CompareNotEquivalent,
        BinaryOp::Less => CompareLessThan,
        BinaryOp::LessEqual => CompareLessThanOrEqual,
        BinaryOp::Greater => CompareGreaterThan,
        BinaryOp::GreaterEqual => CompareGreaterThanOrEqual,
        BinaryOp::LeftShift => BitShiftLeft,
        BinaryOp::RightShift => BitShiftRight,
        BinaryOp::BitAnd => BitAnd,
        BinaryOp::BitOr => BitOr,
        BinaryOp::BitXor => BitXor,
        BinaryOp::In => IsInList,
        BinaryOp::And | BinaryOp::Or => return None,
    };
    Some(opcode)
}

fn assign_opcode(op: AssignOp) -> Option<DreamProcOpcode> {
    use DreamProcOpcode::*;
    let opcode = match op {
        AssignOp::Assign => Assign,
        AssignOp::AssignInto => AssignInto,
        AssignOp::Append => Append,
        AssignOp::Remove => Remove,
        AssignOp::Combine => Combine,
        AssignOp::Mask => Mask,
        AssignOp::Multiply => MultiplyReference,
        AssignOp::Divide => DivideReference,
        AssignOp::LeftShift => BitShiftLeftReference,
        AssignOp::RightShift => BitShiftRightReference,
        AssignOp::Xor => BitXorReference,
        AssignOp::Modulus => ModulusReference,
        AssignOp::ModulusModulus => ModulusModulusReference,
        AssignOp::LogicalAnd | AssignOp::LogicalOr => return None,
    };
    Some(opcode)
}

fn builtin_reference(name: &str) -> Option<DMReference> {
    let reference = match name {
        "src" => DMReference::Src,
        "usr" => DMReference::Usr,
        "args" => DMReference::Args,
        "world" => DMReference::World,
        "callee" => DMReference::Callee,
        "caller" => DMReference::Caller,
        _ => return None,
    };
    Some(reference)
}

impl ProcBuilder<'_> {
    fn push_null(&mut self) -> CodegenResult {
        self.emit(DreamProcOpcode::PushNull, &[])
    }

    /// Report `message` and push null in place of the expression
    fn push_null_after(
        &mut self,
        code: WarningCode,
        location: &Location,
        message: impl Into<String>,
    ) -> CodegenResult {
        self.report(code, location, message);
        self.push_null()
    }

    fn push_string(
        &mut self,
        value: &str,
    ) -> CodegenResult {
        let id = self.string_id(value);
        self.emit(DreamProcOpcode::PushString, &[Operand::String(id)])
    }

    pub(super) fn emit_expression(
        &mut self,
        expr: &Expression,
    ) -> CodegenResult {
        let location = &expr.location;
        match &expr.kind {
            ExpressionKind::Invalid | ExpressionKind::Void | ExpressionKind::Null => self.push_null(),
            ExpressionKind::Int(value) => self.emit(DreamProcOpcode::PushFloat, &[Operand::Float(*value as f32)]),
            ExpressionKind::Float(value) => self.emit(DreamProcOpcode::PushFloat, &[Operand::Float(*value)]),
            ExpressionKind::String(value) => self.push_string(value),
            ExpressionKind::Resource(path) => self.emit_constant(&Constant::Resource(path.clone()), location),
            ExpressionKind::Path(path) => self.emit_path(path, location),
            ExpressionKind::UpwardPathSearch { path, search } => self.emit_upward_search(path, search, location),
            ExpressionKind::Identifier(name) => self.emit_identifier(name, location),
            ExpressionKind::Callable(Callable::SelfProc) => self.emit(
                DreamProcOpcode::PushReferenceValue,
                &[Operand::Reference(DMReference::SelfRef)],
            ),
            ExpressionKind::Callable(Callable::Super) => self.emit(
                DreamProcOpcode::PushReferenceValue,
                &[Operand::Reference(DMReference::SuperProc)],
            ),
            ExpressionKind::Callable(Callable::Proc(name)) => self.push_null_after(
                WarningCode::BadExpression,
                location,
                format!("Proc \"{}\" used as a value", name),
            ),
            ExpressionKind::StringFormat { value, values } => {
                for value in values {
                    match value {
                        Some(value) => self.emit_expression(value)?,
                        None => self.push_null()?,
                    }
                }
                let id = self.string_id(value);
                self.emit(
                    DreamProcOpcode::FormatString,
                    &[Operand::String(id), Operand::Int(values.len() as i32)],
                )
            }
            ExpressionKind::List(values) => self.emit_list(values),
            ExpressionKind::NewList(values) => {
                for value in values {
                    self.emit_expression(&value.value)?;
                    self.emit(
                        DreamProcOpcode::CreateObject,
                        &[Operand::ArgType(CallArgumentsType::None), Operand::Int(0)],
                    )?;
                }
                self.emit(DreamProcOpcode::CreateList, &[Operand::Int(values.len() as i32)])
            }
            ExpressionKind::AddText(values) => {
                for value in values {
                    self.emit_expression(&value.value)?;
                }
                self.emit(DreamProcOpcode::MassConcatenation, &[Operand::Int(values.len() as i32)])
            }
            ExpressionKind::DimensionalList(sizes) => {
                for size in sizes {
                    self.emit_expression(size)?;
                }
                self.emit(
                    DreamProcOpcode::CreateMultidimensionalList,
                    &[Operand::Int(sizes.len() as i32)],
                )
            }
            ExpressionKind::Input { args, types, list } => self.emit_input(args, *types, list.is_some(), location),
            ExpressionKind::Locate { target, container } => {
                match target {
                    Some(target) => self.emit_expression(target)?,
                    None => self.push_null()?,
                }
                match container {
                    Some(container) => self.emit_expression(container)?,
                    None => self.emit(
                        DreamProcOpcode::PushReferenceValue,
                        &[Operand::Reference(DMReference::World)],
                    )?,
                }
                self.emit(DreamProcOpcode::Locate, &[])
            }
            ExpressionKind::LocateCoordinates { x, y, z } => {
                self.emit_expression(x)?;
                self.emit_expression(y)?;
                self.emit_expression(z)?;
                self.emit(DreamProcOpcode::LocateCoord, &[])
            }
            ExpressionKind::Gradient(args) => self.emit_builtin_call(DreamProcOpcode::Gradient, args),
            ExpressionKind::Rgb(args) => self.emit_builtin_call(DreamProcOpcode::Rgb, args),
            ExpressionKind::Pick(values) => self.emit_pick(values),
            ExpressionKind::Call { target, args } => match target.as_slice() {
                [callee] => {
                    self.emit_expression(&callee.value)?;
                    let (kind, delta) = self.emit_arguments(args)?;
                    self.emit(
                        DreamProcOpcode::CallStatement,
                        &[Operand::ArgType(kind), Operand::Int(delta)],
                    )
                }
                [_, _] => self.push_null_after(
                    WarningCode::UnimplementedAccess,
                    location,
                    "call() of a library function is not implemented",
                ),
                _ => self.push_null_after(
                    WarningCode::InvalidArgumentCount,
                    location,
                    "call() takes one or two arguments",
                ),
            },
            ExpressionKind::VarDecl(path) => self.push_null_after(
                WarningCode::BadExpression,
                location,
                format!("Declaration of {} is only allowed in a for header", path),
            ),
            ExpressionKind::New { target, args } => self.emit_new(target, args.as_deref(), location),
            ExpressionKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                let other = self.writer.new_label();
                let end = self.writer.new_label();
                self.emit_expression(condition)?;
                self.emit_jump(DreamProcOpcode::JumpIfFalse, &[], other)?;
                self.emit_expression(then)?;
                self.emit_jump(DreamProcOpcode::Jump, &[], end)?;
                self.writer.mark(other);
                self.emit_expression(otherwise)?;
                self.writer.mark(end);
                Ok(())
            }
            ExpressionKind::InRange {
                value,
                start,
                end,
                step,
            } => {
                if step.is_some() {
                    self.report(
                        WarningCode::UnimplementedAccess,
                        location,
                        "step in a range check is not implemented and is ignored",
                    );
                }
                self.emit_expression(value)?;
                self.emit_expression(start)?;
                self.emit_expression(end)?;
                self.emit(DreamProcOpcode::IsInRange, &[])
            }
            ExpressionKind::SwitchRange { .. } => self.push_null_after(
                WarningCode::BadExpression,
                location,
                "A range is only allowed as a switch case",
            ),
            ExpressionKind::ProcCall { callable, args } => self.emit_proc_call(callable, args, location),
            ExpressionKind::Dereference { base, operations } => self.emit_chain(base, operations),
            ExpressionKind::ScopeIdentifier {
                base,
                identifier,
                call,
            } => self.emit_scope_identifier(base.as_deref(), identifier, call.is_some(), location),
            ExpressionKind::Unary { op, operand } => self.emit_unary(*op, operand, location),
            ExpressionKind::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            ExpressionKind::Assign { op, target, value } => self.emit_assign(*op, target, value, location),
            ExpressionKind::Builtin { builtin, args } => self.emit_builtin(*builtin, args, location),
            ExpressionKind::Log { value, base } => {
                self.emit_expression(value)?;
                match base {
                    Some(base) => {
                        self.emit_expression(base)?;
                        self.emit(DreamProcOpcode::Log, &[])
                    }
                    None => self.emit(DreamProcOpcode::LogE, &[]),
                }
            }
            ExpressionKind::Wrapped(inner) => self.emit_expression(inner),
        }
    }

    fn resolve_identifier(
        &mut self,
        name: &str,
    ) -> Option<Resolved> {
        if let Some(id) = self.writer.local(name) {
            return Some(Resolved::Reference(DMReference::Local(id)));
        }
        if let Some(index) = self.parameters.iter().position(|(parameter, _)| parameter == name) {
            return Some(Resolved::Reference(DMReference::Argument(index as u8)));
        }
        if let Some(reference) = builtin_reference(name) {
            return Some(Resolved::Reference(reference));
        }
        if let Some(id) = self.proc_globals.get(name) {
            return Some(Resolved::Reference(DMReference::Global(*id)));
        }

        let var = self
            .tree
            .variable(self.owner, name)
            .map(|variable| (variable.modifiers.is_const, variable.constant()));
        if let Some((is_const, constant)) = var {
            if let (true, Some(constant)) = (is_const, constant) {
                return Some(Resolved::Constant(constant));
            }
            let field = self.string_id(name);
            return Some(Resolved::Reference(DMReference::SrcField(field)));
        }

        let id = self.tree.global_var_id(self.owner, name)?;
        let constant = usize::try_from(id)
            .ok()
            .and_then(|index| self.tree.globals().get(index))
            .filter(|global| global.modifiers.is_const)
            .and_then(|global| global.constant());
        Some(match constant {
            Some(constant) => Resolved::Constant(constant),
            None => Resolved::Reference(DMReference::Global(id)),
        })
    }

    fn is_global_scope(
        &self,
        expr: &Expression,
    ) -> bool {
        expr.unwrapped().as_identifier() == Some("global")
            && self.writer.local("global").is_none()
            && !self.parameters.iter().any(|(name, _)| name == "global")
    }

    fn emit_identifier(
        &mut self,
        name: &str,
        location: &Location,
    ) -> CodegenResult {
        if name == "global" && self.writer.local(name).is_none() {
            return self.emit(DreamProcOpcode::PushGlobalVars, &[]);
        }
        match self.resolve_identifier(name) {
            Some(Resolved::Reference(reference)) => {
                self.emit(DreamProcOpcode::PushReferenceValue, &[Operand::Reference(reference)])
            }
            Some(Resolved::Constant(constant)) => self.emit_constant(&constant, location),
            None => self.push_null_after(
                WarningCode::ItemDoesntExist,
                location,
                format!("Unknown identifier \"{}\"", name),
            ),
        }
    }

    /// Declared type of whatever `expr` names, when known
    pub(super) fn expression_type(
        &self,
        expr: &Expression,
    ) -> Option<DreamPath> {
        match &expr.unwrapped().kind {
            ExpressionKind::Identifier(name) => {
                if let Some(id) = self.writer.local(name) {
                    return self.local_info(id).and_then(|info| info.type_path.clone());
                }
                if let Some((_, type_path)) = self.parameters.iter().find(|(parameter, _)| parameter == name) {
                    return type_path.clone();
                }
                self.tree
                    .variable(self.owner, name)
                    .and_then(|variable| variable.type_path.clone())
            }
            ExpressionKind::VarDecl(path) => ProcVarDeclaration::new(path, None, None).type_path,
            _ => None,
        }
    }

    /// Push what an assignment to `expr` needs from the stack and return
    /// the reference to write through. `None` once an error is reported.
    pub(super) fn emit_reference(
        &mut self,
        expr: &Expression,
    ) -> CodegenResult<Option<DMReference>> {
        let location = expr.location.clone();
        let expr = expr.unwrapped();
        match &expr.kind {
            ExpressionKind::Identifier(name) => match self.resolve_identifier(name) {
                Some(Resolved::Reference(DMReference::Local(id)))
                    if self.local_info(id).is_some_and(|info| info.is_const) =>
                {
                    self.report(
                        WarningCode::WriteToConstant,
                        &location,
                        format!("Cannot write to const var \"{}\"", name),
                    );
                    Ok(None)
                }
                Some(Resolved::Reference(reference)) => Ok(Some(reference)),
                Some(Resolved::Constant(_)) => {
                    self.report(
                        WarningCode::WriteToConstant,
                        &location,
                        format!("Cannot write to const var \"{}\"", name),
                    );
                    Ok(None)
                }
                None => {
                    self.report(
                        WarningCode::ItemDoesntExist,
                        &location,
                        format!("Unknown identifier \"{}\"", name),
                    );
                    Ok(None)
                }
            },
            ExpressionKind::VarDecl(path) => {
                let declaration = ProcVarDeclaration::new(path, None, None);
                let id = self.declare_local(&declaration.name, declaration.type_path, declaration.is_const)?;
                Ok(Some(DMReference::Local(id)))
            }
            ExpressionKind::Callable(Callable::SelfProc) => Ok(Some(DMReference::SelfRef)),
            ExpressionKind::Dereference { base, operations } => {
                self.emit_dereference_reference(base, operations, &location)
            }
            _ => {
                self.report(
                    WarningCode::InvalidReference,
                    &location,
                    format!("Cannot assign to {}", expr.describe()),
                );
                Ok(None)
            }
        }
    }

    fn emit_dereference_reference(
        &mut self,
        base: &Expression,
        operations: &[DerefOp],
        location: &Location,
    ) -> CodegenResult<Option<DMReference>> {
        let Some((last, prefix)) = operations.split_last() else {
            return self.emit_reference(base);
        };
        if operations.iter().any(|op| op.safe) {
            self.report(
                WarningCode::InvalidReference,
                location,
                "A null-conditional access cannot be assigned to",
            );
            return Ok(None);
        }

        if prefix.is_empty() && self.is_global_scope(base) {
            if let DerefKind::Field { name, .. } = &last.kind {
                return match self.tree.global_var_id(0, name) {
                    Some(id) => Ok(Some(DMReference::Global(id))),
                    None => {
                        self.report(
                            WarningCode::ItemDoesntExist,
                            location,
                            format!("Unknown global var \"{}\"", name),
                        );
                        Ok(None)
                    }
                };
            }
        }

        match &last.kind {
            DerefKind::Call { .. } => {
                self.report(
                    WarningCode::InvalidReference,
                    location,
                    "The result of a proc call cannot be assigned to",
                );
                Ok(None)
            }
            DerefKind::Field { name, .. } => {
                self.emit_chain(base, prefix)?;
                let field = self.string_id(name);
                Ok(Some(DMReference::Field(field)))
            }
            DerefKind::Index(index) => {
                self.emit_chain(base, prefix)?;
                self.emit_expression(index)?;
                Ok(Some(DMReference::ListIndex))
            }
        }
    }

    /// Push `base` followed by each dereference. Null-conditional links
    /// jump past the rest of the chain with the null as the result.
    fn emit_chain(
        &mut self,
        base: &Expression,
        operations: &[DerefOp],
    ) -> CodegenResult {
        let mut rest = operations;
        match operations.first() {
            Some(first) if self.is_global_scope(base) && !matches!(first.kind, DerefKind::Index(_)) => {
                rest = &operations[1..];
                match &first.kind {
                    DerefKind::Field { name, .. } => match self.tree.global_var_id(0, name) {
                        Some(id) => self.emit(
                            DreamProcOpcode::PushReferenceValue,
                            &[Operand::Reference(DMReference::Global(id))],
                        )?,
                        None => self.push_null_after(
                            WarningCode::ItemDoesntExist,
                            &first.location,
                            format!("Unknown global var \"{}\"", name),
                        )?,
                    },
                    DerefKind::Call { name, args, .. } => match self.tree.global_proc(name) {
                        Some(id) => {
                            let (kind, delta) = self.emit_arguments(args)?;
                            self.emit(
                                DreamProcOpcode::Call,
                                &[
                                    Operand::Reference(DMReference::GlobalProc(id)),
                                    Operand::ArgType(kind),
                                    Operand::Int(delta),
                                ],
                            )?;
                        }
                        None => self.push_null_after(
                            WarningCode::ItemDoesntExist,
                            &first.location,
                            format!("Unknown global proc \"{}\"", name),
                        )?,
                    },
                    DerefKind::Index(_) => {}
                }
            }
            _ => self.emit_expression(base)?,
        }

        let end = self.writer.new_label();
        let mut short_circuits = false;
        for op in rest {
            if op.safe {
                self.emit_jump(DreamProcOpcode::JumpIfNullNoPop, &[], end)?;
                short_circuits = true;
            }
            match &op.kind {
                DerefKind::Field { name, .. } => {
                    let field = self.string_id(name);
                    self.emit(DreamProcOpcode::DereferenceField, &[Operand::String(field)])?;
                }
                DerefKind::Index(index) => {
                    self.emit_expression(index)?;
                    self.emit(DreamProcOpcode::DereferenceIndex, &[])?;
                }
                DerefKind::Call { name, args, .. } => {
                    let (kind, delta) = self.emit_arguments(args)?;
                    let proc_name = self.string_id(name);
                    self.emit(
                        DreamProcOpcode::DereferenceCall,
                        &[Operand::String(proc_name), Operand::ArgType(kind), Operand::Int(delta)],
                    )?;
                }
            }
        }
        if short_circuits {
            self.writer.mark(end);
        }
        Ok(())
    }

    /// Push call arguments and return how the callee should read them
    pub(super) fn emit_arguments(
        &mut self,
        args: &[CallParameter],
    ) -> CodegenResult<(CallArgumentsType, i32)> {
        if args.is_empty() {
            return Ok((CallArgumentsType::None, 0));
        }

        if let [only] = args {
            if let ExpressionKind::ProcCall {
                callable: Callable::Proc(name),
                args: inner,
            } = &only.value.unwrapped().kind
            {
                if name == "arglist" && only.key.is_none() {
                    match inner.as_slice() {
                        [list] => self.emit_expression(&list.value)?,
                        _ => self.push_null_after(
                            WarningCode::InvalidArgumentCount,
                            &only.location,
                            "arglist() takes one argument",
                        )?,
                    }
                    return Ok((CallArgumentsType::FromArgumentList, 1));
                }
            }
        }

        if args.iter().any(|arg| arg.key.is_some()) {
            for arg in args {
                match &arg.key {
                    Some(key) => match &key.unwrapped().kind {
                        ExpressionKind::Identifier(name) | ExpressionKind::String(name) => self.push_string(name)?,
                        _ => self.emit_expression(key)?,
                    },
                    None => self.push_null()?,
                }
                self.emit_expression(&arg.value)?;
            }
            return Ok((CallArgumentsType::FromStackKeyed, 2 * args.len() as i32));
        }

        for arg in args {
            self.emit_expression(&arg.value)?;
        }
        Ok((CallArgumentsType::FromStack, args.len() as i32))
    }

    fn emit_builtin_call(
        &mut self,
        opcode: DreamProcOpcode,
        args: &[CallParameter],
    ) -> CodegenResult {
        let (kind, delta) = self.emit_arguments(args)?;
        self.emit(opcode, &[Operand::ArgType(kind), Operand::Int(delta)])
    }

    fn emit_list(
        &mut self,
        values: &[CallParameter],
    ) -> CodegenResult {
        let associative = values.iter().any(|value| value.key.is_some());
        for value in values {
            match &value.key {
                Some(key) => {
                    match &key.unwrapped().kind {
                        ExpressionKind::Identifier(name) => self.push_string(name)?,
                        _ => self.emit_expression(key)?,
                    }
                    self.emit_expression(&value.value)?;
                }
                None => {
                    self.emit_expression(&value.value)?;
                    if associative {
                        self.push_null()?;
                    }
                }
            }
        }
        let size = Operand::Int(values.len() as i32);
        if associative {
            self.emit(DreamProcOpcode::CreateAssociativeList, &[size])
        } else {
            self.emit(DreamProcOpcode::CreateList, &[size])
        }
    }

    /// `input(usr, message, title, default) as types`
    fn emit_input(
        &mut self,
        args: &[CallParameter],
        types: Option<ValueType>,
        has_list: bool,
        location: &Location,
    ) -> CodegenResult {
        if args.len() > 4 {
            return self.push_null_after(
                WarningCode::InvalidArgumentCount,
                location,
                "input() takes at most 4 arguments",
            );
        }
        if has_list {
            self.report(
                WarningCode::UnimplementedAccess,
                location,
                "input() from a list is not implemented, the list is ignored",
            );
        }
        for index in (0..4).rev() {
            match args.get(index) {
                Some(arg) => self.emit_expression(&arg.value)?,
                None => self.push_null()?,
            }
        }
        let types = types.unwrap_or(ValueType::TEXT);
        self.emit(DreamProcOpcode::Prompt, &[Operand::Int(types.bits() as i32)])
    }

    fn emit_pick(
        &mut self,
        values: &[PickValue],
    ) -> CodegenResult {
        let count = Operand::Int(values.len() as i32);
        if values.iter().all(|value| value.weight.is_none()) {
            for value in values {
                self.emit_expression(&value.value)?;
            }
            return self.emit(DreamProcOpcode::PickUnweighted, &[count]);
        }

        for value in values {
            match &value.weight {
                Some(weight) => self.emit_expression(weight)?,
                None => self.emit(DreamProcOpcode::PushFloat, &[Operand::Float(100.0)])?,
            }
            self.emit_expression(&value.value)?;
        }
        self.emit(DreamProcOpcode::PickWeighted, &[count])
    }

    fn emit_new(
        &mut self,
        target: &NewTarget,
        args: Option<&[CallParameter]>,
        location: &Location,
    ) -> CodegenResult {
        match target {
            NewTarget::Path(path) => match self.tree.type_id(path) {
                Some(id) => self.emit(DreamProcOpcode::PushType, &[Operand::Int(id)])?,
                None => {
                    return self.push_null_after(
                        WarningCode::ItemDoesntExist,
                        location,
                        format!("Type {} does not exist", path),
                    )
                }
            },
            NewTarget::Expression(expr) => self.emit_expression(expr)?,
            NewTarget::Inferred => match self.inferred_type.clone() {
                Some(path) => return self.emit_new(&NewTarget::Path(path), args, location),
                None => {
                    return self.push_null_after(
                        WarningCode::BadExpression,
                        location,
                        "new() needs a typed var to infer its type from",
                    )
                }
            },
        }
        let (kind, delta) = self.emit_arguments(args.unwrap_or_default())?;
        self.emit(
            DreamProcOpcode::CreateObject,
            &[Operand::ArgType(kind), Operand::Int(delta)],
        )
    }

    fn emit_proc_call(
        &mut self,
        callable: &Callable,
        args: &[CallParameter],
        location: &Location,
    ) -> CodegenResult {
        let reference = match callable {
            Callable::Super if args.is_empty() => {
                return self.emit(
                    DreamProcOpcode::Call,
                    &[
                        Operand::Reference(DMReference::SuperProc),
                        Operand::ArgType(CallArgumentsType::FromProcArguments),
                        Operand::Int(0),
                    ],
                );
            }
            Callable::Super => DMReference::SuperProc,
            Callable::SelfProc => DMReference::SelfRef,
            Callable::Proc(name) if name == "arglist" => {
                return self.push_null_after(
                    WarningCode::ArglistOnlyArgument,
                    location,
                    "arglist() can only be the only argument of a proc call",
                );
            }
            Callable::Proc(name) => {
                let on_type = self
                    .tree
                    .ancestors(self.owner)
                    .filter(|ty| !ty.is_root())
                    .any(|ty| ty.procs.contains_key(name));
                if on_type {
                    DMReference::SrcProc(self.string_id(name))
                } else if let Some(id) = self.tree.global_proc(name) {
                    DMReference::GlobalProc(id)
                } else {
                    return self.push_null_after(
                        WarningCode::ItemDoesntExist,
                        location,
                        format!("Unknown proc \"{}\"", name),
                    );
                }
            }
        };

        let (kind, delta) = self.emit_arguments(args)?;
        self.emit(
            DreamProcOpcode::Call,
            &[Operand::Reference(reference), Operand::ArgType(kind), Operand::Int(delta)],
        )
    }

    fn emit_upward_search(
        &mut self,
        path: &Expression,
        search: &DreamPath,
        location: &Location,
    ) -> CodegenResult {
        let ExpressionKind::Path(base) = &path.unwrapped().kind else {
            return self.push_null_after(
                WarningCode::BadExpression,
                location,
                "An upward search needs a constant path on its left",
            );
        };
        match self.tree.upward_search(base, search) {
            Some(found) => self.emit_path(&found, location),
            None => self.push_null_after(
                WarningCode::ItemDoesntExist,
                location,
                format!("Could not find {} above {}", search, base),
            ),
        }
    }

    /// `/type::var` reads a var's initial value, `::var` a global
    fn emit_scope_identifier(
        &mut self,
        base: Option<&Expression>,
        identifier: &str,
        is_call: bool,
        location: &Location,
    ) -> CodegenResult {
        if is_call {
            return self.push_null_after(
                WarningCode::UnimplementedAccess,
                location,
                "Calling a proc through :: is not implemented",
            );
        }
        match base.map(|base| &base.unwrapped().kind) {
            None => match self.tree.global_var_id(0, identifier) {
                Some(id) => self.emit(
                    DreamProcOpcode::PushReferenceValue,
                    &[Operand::Reference(DMReference::Global(id))],
                ),
                None => self.push_null_after(
                    WarningCode::ItemDoesntExist,
                    location,
                    format!("Unknown global var \"{}\"", identifier),
                ),
            },
            Some(ExpressionKind::Path(path)) => {
                let constant = self
                    .tree
                    .type_id(path)
                    .and_then(|id| self.tree.initial_value(id, identifier))
                    .and_then(|variable| variable.constant());
                match constant {
                    Some(constant) => self.emit_constant(&constant, location),
                    None => self.push_null_after(
                        WarningCode::UnimplementedAccess,
                        location,
                        format!("{}::{} is not a constant", path, identifier),
                    ),
                }
            }
            Some(_) => self.push_null_after(
                WarningCode::UnimplementedAccess,
                location,
                "The scope operator on a runtime value is not implemented",
            ),
        }
    }

    fn emit_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
        location: &Location,
    ) -> CodegenResult {
        let simple = match op {
            UnaryOp::Negate => Some(DreamProcOpcode::Negate),
            UnaryOp::Not => Some(DreamProcOpcode::BooleanNot),
            UnaryOp::BitNot => Some(DreamProcOpcode::BitNot),
            _ => None,
        };
        if let Some(opcode) = simple {
            self.emit_expression(operand)?;
            return self.emit(opcode, &[]);
        }

        let Some(reference) = self.emit_reference(operand)? else {
            return self.push_null();
        };
        let reference = Operand::Reference(reference);
        match op {
            UnaryOp::PreIncrement | UnaryOp::PreDecrement => {
                self.emit(DreamProcOpcode::PushFloat, &[Operand::Float(1.0)])?;
                let opcode = if op == UnaryOp::PreIncrement {
                    DreamProcOpcode::Append
                } else {
                    DreamProcOpcode::Remove
                };
                self.emit(opcode, &[reference])
            }
            UnaryOp::PostIncrement => self.emit(DreamProcOpcode::Increment, &[reference]),
            UnaryOp::PostDecrement => self.emit(DreamProcOpcode::Decrement, &[reference]),
            _ => self.push_null_after(WarningCode::BadExpression, location, "Unexpected unary operator"),
        }
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
    ) -> CodegenResult {
        let Some(opcode) = binary_opcode(op) else {
            let end = self.writer.new_label();
            let opcode = if op == BinaryOp::And {
                DreamProcOpcode::BooleanAnd
            } else {
                DreamProcOpcode::BooleanOr
            };
            self.emit_expression(lhs)?;
            self.emit_jump(opcode, &[], end)?;
            self.emit_expression(rhs)?;
            self.writer.mark(end);
            return Ok(());
        };
        self.emit_expression(lhs)?;
        self.emit_expression(rhs)?;
        self.emit(opcode, &[])
    }

    fn emit_assign(
        &mut self,
        op: AssignOp,
        target: &Expression,
        value: &Expression,
        location: &Location,
    ) -> CodegenResult {
        let Some(opcode) = assign_opcode(op) else {
            return self.emit_logical_assign(op, target, value, location);
        };

        let target_type = self.expression_type(target);
        let Some(reference) = self.emit_reference(target)? else {
            return self.emit_expression(value);
        };
        let outer = std::mem::replace(&mut self.inferred_type, target_type);
        let result = self.emit_expression(value);
        self.inferred_type = outer;
        result?;
        self.emit(opcode, &[Operand::Reference(reference)])
    }

    /// `a &&= b` and `a ||= b`: assign only when `a` does not decide the
    /// result. The reference is read twice, so it must not use the stack.
    fn emit_logical_assign(
        &mut self,
        op: AssignOp,
        target: &Expression,
        value: &Expression,
        location: &Location,
    ) -> CodegenResult {
        if matches!(target.unwrapped().kind, ExpressionKind::Dereference { .. }) {
            self.report(
                WarningCode::UnsupportedAccess,
                location,
                format!("{} on a field or list element is not supported", op.symbol()),
            );
            return self.emit_expression(value);
        }
        let Some(reference) = self.emit_reference(target)? else {
            return self.emit_expression(value);
        };

        let end = self.writer.new_label();
        let opcode = if op == AssignOp::LogicalAnd {
            DreamProcOpcode::JumpIfFalseReference
        } else {
            DreamProcOpcode::JumpIfTrueReference
        };
        let reference = Operand::Reference(reference);
        self.emit_jump(opcode, &[reference], end)?;
        self.emit_expression(value)?;
        self.emit(DreamProcOpcode::Assign, &[reference])?;
        self.writer.mark(end);
        Ok(())
    }

    fn emit_builtin(
        &mut self,
        builtin: Builtin,
        args: &[Expression],
        location: &Location,
    ) -> CodegenResult {
        use DreamProcOpcode::*;

        let arity = match builtin {
            Builtin::Arctan2 | Builtin::IsType | Builtin::GetStep | Builtin::GetDir => 2,
            _ => 1,
        };
        if args.len() != arity {
            return self.push_null_after(
                WarningCode::InvalidArgumentCount,
                location,
                format!("{}() takes {} argument(s), got {}", builtin.name(), arity, args.len()),
            );
        }

        let unary = match builtin {
            Builtin::Prob => Some(Prob),
            Builtin::Sin => Some(Sin),
            Builtin::Cos => Some(Cos),
            Builtin::Tan => Some(Tan),
            Builtin::Arcsin => Some(ArcSin),
            Builtin::Arccos => Some(ArcCos),
            Builtin::Arctan => Some(ArcTan),
            Builtin::Sqrt => Some(Sqrt),
            Builtin::Abs => Some(Abs),
            Builtin::IsNull => Some(IsNull),
            Builtin::Length => Some(Length),
            _ => None,
        };
        if let Some(opcode) = unary {
            self.emit_expression(&args[0])?;
            return self.emit(opcode, &[]);
        }

        let binary = match builtin {
            Builtin::Arctan2 => Some(ArcTan2),
            Builtin::IsType => Some(IsType),
            Builtin::GetStep => Some(GetStep),
            Builtin::GetDir => Some(GetDir),
            _ => None,
        };
        if let Some(opcode) = binary {
            self.emit_expression(&args[0])?;
            self.emit_expression(&args[1])?;
            return self.emit(opcode, &[]);
        }

        match builtin {
            Builtin::Initial => self.emit_field_query(&args[0], Initial, location),
            Builtin::IsSaved => self.emit_field_query(&args[0], IsSaved, location),
            Builtin::Nameof => self.emit_nameof(&args[0], location),
            Builtin::ImplicitIsType => {
                let type_id = self
                    .expression_type(&args[0])
                    .and_then(|path| self.tree.type_id(&path));
                let Some(type_id) = type_id else {
                    return self.push_null_after(
                        WarningCode::BadArgument,
                        location,
                        "istype() with one argument needs a var with a declared type",
                    );
                };
                self.emit_expression(&args[0])?;
                self.emit(PushType, &[Operand::Int(type_id)])?;
                self.emit(IsType, &[])
            }
            _ => self.push_null_after(
                WarningCode::BadExpression,
                location,
                format!("Unexpected builtin {}()", builtin.name()),
            ),
        }
    }

    /// `initial(x)` and `issaved(x)`: push the owner and the var's key
    fn emit_field_query(
        &mut self,
        arg: &Expression,
        opcode: DreamProcOpcode,
        location: &Location,
    ) -> CodegenResult {
        match &arg.unwrapped().kind {
            ExpressionKind::Identifier(name) => match self.resolve_identifier(name) {
                Some(Resolved::Reference(DMReference::SrcField(field))) => {
                    self.emit(DreamProcOpcode::PushReferenceValue, &[Operand::Reference(DMReference::Src)])?;
                    self.emit(DreamProcOpcode::PushString, &[Operand::String(field)])?;
                    self.emit(opcode, &[])
                }
                // Anything but a var of src is already its own initial value
                _ => self.emit_expression(arg),
            },
            ExpressionKind::Dereference { base, operations } => match operations.split_last() {
                Some((last, prefix)) => match &last.kind {
                    DerefKind::Field { name, .. } => {
                        self.emit_chain(base, prefix)?;
                        self.push_string(name)?;
                        self.emit(opcode, &[])
                    }
                    DerefKind::Index(index) => {
                        self.emit_chain(base, prefix)?;
                        self.emit_expression(index)?;
                        self.emit(opcode, &[])
                    }
                    DerefKind::Call { .. } => self.push_null_after(
                        WarningCode::BadArgument,
                        location,
                        "Expected a var, not a proc call",
                    ),
                },
                None => self.emit_expression(base),
            },
            _ => self.push_null_after(WarningCode::BadArgument, location, "Expected a var"),
        }
    }

    fn emit_nameof(
        &mut self,
        arg: &Expression,
        location: &Location,
    ) -> CodegenResult {
        let name = match &arg.unwrapped().kind {
            ExpressionKind::Identifier(name) => Some(name.clone()),
            ExpressionKind::Path(path) => path.last_element().map(str::to_string),
            ExpressionKind::Dereference { operations, .. } => operations.last().and_then(|op| match &op.kind {
                DerefKind::Field { name, .. } | DerefKind::Call { name, .. } => Some(name.clone()),
                DerefKind::Index(_) => None,
            }),
            ExpressionKind::ProcCall {
                callable: Callable::Proc(name),
                ..
            } => Some(name.clone()),
            _ => None,
        };
        match name {
            Some(name) => self.push_string(&name),
            None => self.push_null_after(
                WarningCode::BadArgument,
                location,
                "nameof() needs a var, proc or path",
            ),
        }
    }
}
