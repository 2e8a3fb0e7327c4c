//! Borrowed views over the tree, a pre-order walker and a tree printer

use std::fmt::Write as _;

use super::expr::{CallParameter, DerefKind, Expression, ExpressionKind, NewTarget};
use super::stmt::{
    Block, DefinitionParameter, ObjectVarDefinition, ProcBlock, ProcDefinition, ProcStatement, ProcStatementKind,
    Statement, StatementKind, SwitchCase,
};
use super::File;
use crate::util::span::Location;

/// Any node of the tree
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    File(&'a File),
    Block(&'a Block),
    Statement(&'a Statement),
    ProcDefinition(&'a ProcDefinition),
    VarDefinition(&'a ObjectVarDefinition),
    Parameter(&'a DefinitionParameter),
    ProcBlock(&'a ProcBlock),
    ProcStatement(&'a ProcStatement),
    SwitchCase(&'a SwitchCase),
    Argument(&'a CallParameter),
    Expression(&'a Expression),
}

impl<'a> Node<'a> {
    pub fn location(&self) -> &'a Location {
        match *self {
            Node::File(n) => &n.location,
            Node::Block(n) => &n.location,
            Node::Statement(n) => &n.location,
            Node::ProcDefinition(n) => &n.location,
            Node::VarDefinition(n) => &n.location,
            Node::Parameter(n) => &n.location,
            Node::ProcBlock(n) => &n.location,
            Node::ProcStatement(n) => &n.location,
            Node::SwitchCase(n) => &n.body().location,
            Node::Argument(n) => &n.location,
            Node::Expression(n) => &n.location,
        }
    }

    /// One-line description
    pub fn label(&self) -> String {
        match *self {
            Node::File(_) => "File".to_string(),
            Node::Block(_) => "Block".to_string(),
            Node::Statement(s) => match &s.kind {
                StatementKind::Invalid => "InvalidStatement".to_string(),
                StatementKind::Null => "NullStatement".to_string(),
                StatementKind::ObjectDefinition { path, .. } => format!("ObjectDefinition {}", path),
                StatementKind::ProcDefinition(_) => "ProcDefinition".to_string(),
                StatementKind::VarDefinition(_) => "VarDefinition".to_string(),
                StatementKind::MultipleVarDefinitions(defs) => format!("MultipleVarDefinitions ({})", defs.len()),
                StatementKind::VarOverride { object_path, name, .. } => {
                    format!("VarOverride {}/{}", object_path, name)
                }
            },
            Node::ProcDefinition(p) => {
                let kind = if p.is_verb {
                    "verb"
                } else if p.is_override {
                    "override"
                } else {
                    "proc"
                };
                format!("{} {}/{}", kind, p.object_path, p.name)
            }
            Node::VarDefinition(v) => {
                let ty = v.type_path.as_ref().map(|p| p.to_string()).unwrap_or_default();
                format!("var {} {}{}", v.object_path, v.name, if ty.is_empty() { ty } else { format!(" as {}", ty) })
            }
            Node::Parameter(p) => format!("param {}", p.name),
            Node::ProcBlock(b) => format!("ProcBlock ({} set)", b.set_statements.len()),
            Node::ProcStatement(s) => proc_statement_label(&s.kind),
            Node::SwitchCase(c) => match c {
                SwitchCase::Values(values, _) => format!("case ({})", values.len()),
                SwitchCase::Default(_) => "case else".to_string(),
            },
            Node::Argument(a) => if a.key.is_some() { "arg (keyed)" } else { "arg" }.to_string(),
            Node::Expression(e) => e.describe(),
        }
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<Node<'a>> {
        let mut out = Vec::new();
        match *self {
            Node::File(f) => out.push(Node::Block(&f.block)),
            Node::Block(b) => out.extend(b.statements.iter().map(Node::Statement)),
            Node::Statement(s) => match &s.kind {
                StatementKind::Invalid | StatementKind::Null => {}
                StatementKind::ObjectDefinition { body, .. } => out.extend(body.iter().map(Node::Block)),
                StatementKind::ProcDefinition(p) => out.push(Node::ProcDefinition(p)),
                StatementKind::VarDefinition(v) => out.push(Node::VarDefinition(v)),
                StatementKind::MultipleVarDefinitions(defs) => out.extend(defs.iter().map(Node::VarDefinition)),
                StatementKind::VarOverride { value, .. } => out.push(Node::Expression(value)),
            },
            Node::ProcDefinition(p) => {
                out.extend(p.parameters.iter().map(Node::Parameter));
                out.extend(p.body.iter().map(Node::ProcBlock));
            }
            Node::VarDefinition(v) => out.push(Node::Expression(&v.value)),
            Node::Parameter(p) => {
                out.extend(p.default.iter().map(Node::Expression));
                out.extend(p.possible_values.iter().map(Node::Expression));
            }
            Node::ProcBlock(b) => {
                out.extend(b.set_statements.iter().map(Node::ProcStatement));
                out.extend(b.statements.iter().map(Node::ProcStatement));
            }
            Node::ProcStatement(s) => proc_statement_children(&s.kind, &mut out),
            Node::SwitchCase(c) => {
                if let SwitchCase::Values(values, _) = c {
                    out.extend(values.iter().map(Node::Expression));
                }
                out.push(Node::ProcBlock(c.body()));
            }
            Node::Argument(a) => {
                out.extend(a.key.iter().map(Node::Expression));
                out.push(Node::Expression(&a.value));
            }
            Node::Expression(e) => expression_children(e, &mut out),
        }
        out
    }
}

fn proc_statement_label(kind: &ProcStatementKind) -> String {
    let name = match kind {
        ProcStatementKind::Null => "Null",
        ProcStatementKind::Invalid => "Invalid",
        ProcStatementKind::Expression(_) => "Expression",
        ProcStatementKind::VarDeclaration(v) => return format!("VarDeclaration {}", v.name),
        ProcStatementKind::Aggregate(s) => return format!("Aggregate ({})", s.len()),
        ProcStatementKind::Return(_) => "Return",
        ProcStatementKind::Break(label) => return format!("Break {}", label.as_deref().unwrap_or("")).trim_end().to_string(),
        ProcStatementKind::Continue(label) => {
            return format!("Continue {}", label.as_deref().unwrap_or("")).trim_end().to_string()
        }
        ProcStatementKind::Goto(label) => return format!("Goto {}", label),
        ProcStatementKind::Label { name, .. } => return format!("Label {}", name),
        ProcStatementKind::Del(_) => "Del",
        ProcStatementKind::Set { attribute, in_keyword, .. } => {
            return format!("Set {} {}", attribute, if *in_keyword { "in" } else { "=" })
        }
        ProcStatementKind::Spawn { .. } => "Spawn",
        ProcStatementKind::If { .. } => "If",
        ProcStatementKind::For { .. } => "For",
        ProcStatementKind::InfLoop(_) => "InfLoop",
        ProcStatementKind::While { .. } => "While",
        ProcStatementKind::DoWhile { .. } => "DoWhile",
        ProcStatementKind::Switch { .. } => "Switch",
        ProcStatementKind::Browse { .. } => "Browse",
        ProcStatementKind::BrowseResource { .. } => "BrowseResource",
        ProcStatementKind::OutputControl { .. } => "OutputControl",
        ProcStatementKind::Ftp { .. } => "Ftp",
        ProcStatementKind::Output { .. } => "Output",
        ProcStatementKind::Input { .. } => "Input",
        ProcStatementKind::TryCatch { .. } => "TryCatch",
        ProcStatementKind::Throw(_) => "Throw",
    };
    name.to_string()
}

fn proc_statement_children<'a>(
    kind: &'a ProcStatementKind,
    out: &mut Vec<Node<'a>>,
) {
    match kind {
        ProcStatementKind::Null
        | ProcStatementKind::Invalid
        | ProcStatementKind::Break(_)
        | ProcStatementKind::Continue(_)
        | ProcStatementKind::Goto(_) => {}
        ProcStatementKind::Expression(e) | ProcStatementKind::Del(e) => out.push(Node::Expression(e)),
        ProcStatementKind::VarDeclaration(v) => out.extend(v.value.iter().map(Node::Expression)),
        ProcStatementKind::Aggregate(statements) => out.extend(statements.iter().map(Node::ProcStatement)),
        ProcStatementKind::Return(value) | ProcStatementKind::Throw(value) => {
            out.extend(value.iter().map(Node::Expression))
        }
        ProcStatementKind::Label { body, .. } => out.extend(body.iter().map(Node::ProcBlock)),
        ProcStatementKind::Set { value, .. } => out.push(Node::Expression(value)),
        ProcStatementKind::Spawn { delay, body } => {
            out.push(Node::Expression(delay));
            out.push(Node::ProcBlock(body));
        }
        ProcStatementKind::If {
            condition,
            body,
            else_body,
        } => {
            out.push(Node::Expression(condition));
            out.push(Node::ProcBlock(body));
            out.extend(else_body.iter().map(Node::ProcBlock));
        }
        ProcStatementKind::For {
            init,
            condition,
            increment,
            body,
            ..
        } => {
            out.extend(init.iter().map(Node::Expression));
            out.extend(condition.iter().map(Node::Expression));
            out.extend(increment.iter().map(Node::Expression));
            out.push(Node::ProcBlock(body));
        }
        ProcStatementKind::InfLoop(body) => out.push(Node::ProcBlock(body)),
        ProcStatementKind::While { condition, body } | ProcStatementKind::DoWhile { condition, body } => {
            out.push(Node::Expression(condition));
            out.push(Node::ProcBlock(body));
        }
        ProcStatementKind::Switch { value, cases } => {
            out.push(Node::Expression(value));
            out.extend(cases.iter().map(Node::SwitchCase));
        }
        ProcStatementKind::Browse {
            receiver,
            body,
            options,
        } => out.extend([receiver, body, options].map(Node::Expression)),
        ProcStatementKind::BrowseResource {
            receiver,
            file,
            filename,
        } => out.extend([receiver, file, filename].map(Node::Expression)),
        ProcStatementKind::OutputControl {
            receiver,
            message,
            control,
        } => out.extend([receiver, message, control].map(Node::Expression)),
        ProcStatementKind::Ftp { receiver, file, name } => out.extend([receiver, file, name].map(Node::Expression)),
        ProcStatementKind::Output { receiver, value } => out.extend([receiver, value].map(Node::Expression)),
        ProcStatementKind::Input { source, target } => out.extend([source, target].map(Node::Expression)),
        ProcStatementKind::TryCatch {
            try_body,
            catch_param,
            catch_body,
        } => {
            out.push(Node::ProcBlock(try_body));
            out.extend(catch_param.iter().map(|p| Node::ProcStatement(p)));
            out.extend(catch_body.iter().map(Node::ProcBlock));
        }
    }
}

fn expression_children<'a>(
    expr: &'a Expression,
    out: &mut Vec<Node<'a>>,
) {
    match &expr.kind {
        ExpressionKind::Invalid
        | ExpressionKind::Void
        | ExpressionKind::Null
        | ExpressionKind::Int(_)
        | ExpressionKind::Float(_)
        | ExpressionKind::String(_)
        | ExpressionKind::Resource(_)
        | ExpressionKind::Path(_)
        | ExpressionKind::Identifier(_)
        | ExpressionKind::Callable(_)
        | ExpressionKind::VarDecl(_) => {}
        ExpressionKind::UpwardPathSearch { path, .. } => out.push(Node::Expression(path)),
        ExpressionKind::StringFormat { values, .. } => out.extend(values.iter().flatten().map(Node::Expression)),
        ExpressionKind::List(p)
        | ExpressionKind::NewList(p)
        | ExpressionKind::AddText(p)
        | ExpressionKind::Gradient(p)
        | ExpressionKind::Rgb(p) => push_args(out, p),
        ExpressionKind::DimensionalList(sizes) => out.extend(sizes.iter().map(Node::Expression)),
        ExpressionKind::Input { args: params, list, .. } => {
            push_args(out, params);
            out.extend(list.iter().map(|l| Node::Expression(l)));
        }
        ExpressionKind::Locate { target, container } => {
            out.extend(target.iter().map(|e| Node::Expression(e)));
            out.extend(container.iter().map(|e| Node::Expression(e)));
        }
        ExpressionKind::LocateCoordinates { x, y, z } => out.extend([x, y, z].map(|e| Node::Expression(e))),
        ExpressionKind::Pick(values) => {
            for value in values {
                out.extend(value.weight.iter().map(Node::Expression));
                out.push(Node::Expression(&value.value));
            }
        }
        ExpressionKind::Call { target, args: params } => {
            push_args(out, target);
            push_args(out, params);
        }
        ExpressionKind::New { target, args: params } => {
            if let NewTarget::Expression(e) = target {
                out.push(Node::Expression(e));
            }
            if let Some(params) = params {
                push_args(out, params);
            }
        }
        ExpressionKind::Ternary {
            condition,
            then,
            otherwise,
        } => out.extend([condition, then, otherwise].map(|e| Node::Expression(e))),
        ExpressionKind::InRange {
            value,
            start,
            end,
            step,
        } => {
            out.extend([value, start, end].map(|e| Node::Expression(e)));
            out.extend(step.iter().map(|e| Node::Expression(e)));
        }
        ExpressionKind::SwitchRange { start, end } => out.extend([start, end].map(|e| Node::Expression(e))),
        ExpressionKind::ProcCall { args: params, .. } => push_args(out, params),
        ExpressionKind::Dereference { base, operations } => {
            out.push(Node::Expression(base));
            for op in operations {
                match &op.kind {
                    DerefKind::Field { .. } => {}
                    DerefKind::Index(index) => out.push(Node::Expression(index)),
                    DerefKind::Call { args: params, .. } => push_args(out, params),
                }
            }
        }
        ExpressionKind::ScopeIdentifier { base, call, .. } => {
            out.extend(base.iter().map(|e| Node::Expression(e)));
            if let Some(params) = call {
                push_args(out, params);
            }
        }
        ExpressionKind::Unary { operand, .. } => out.push(Node::Expression(operand)),
        ExpressionKind::Binary { lhs, rhs, .. } => out.extend([lhs, rhs].map(|e| Node::Expression(e))),
        ExpressionKind::Assign { target, value, .. } => out.extend([target, value].map(|e| Node::Expression(e))),
        ExpressionKind::Builtin { args: values, .. } => out.extend(values.iter().map(Node::Expression)),
        ExpressionKind::Log { value, base } => {
            out.extend(base.iter().map(|e| Node::Expression(e)));
            out.push(Node::Expression(value));
        }
        ExpressionKind::Wrapped(inner) => out.push(Node::Expression(inner)),
    }
}

fn push_args<'a>(
    out: &mut Vec<Node<'a>>,
    params: &'a [CallParameter],
) {
    out.extend(params.iter().map(Node::Argument));
}

/// Pre-order walk. Returning `false` from `visit` skips the node's children.
pub fn walk<'a, F>(
    node: Node<'a>,
    visit: &mut F,
) where
    F: FnMut(Node<'a>) -> bool,
{
    if visit(node) {
        for child in node.children() {
            walk(child, visit);
        }
    }
}

/// Indented dump of the tree, one node per line
pub fn print_tree(file: &File) -> String {
    let mut out = String::new();
    print_node(Node::File(file), 0, &mut out);
    out
}

fn print_node(
    node: Node<'_>,
    depth: usize,
    out: &mut String,
) {
    let _ = writeln!(out, "{:indent$}{}", "", node.label(), indent = depth * 2);
    for child in node.children() {
        print_node(child, depth + 1, out);
    }
}
