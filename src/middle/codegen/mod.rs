//! Code generation
//!
//! Lowers the procs of an [`ObjectTree`] to stack bytecode. One
//! [`ProcBuilder`] compiles one proc:
//! - [`writer`] - bytecode buffer, labels, locals and the line table
//! - [`expr`] - expressions and references
//! - [`stmt`] - statements and control flow
//! - [`verify`] - stack-depth verification of the finished bytecode
//!
//! Semantic problems are reported to the [`DiagnosticSink`] and compilation
//! continues. A [`CodegenError`] is reserved for bytecode that cannot be
//! written at all; it abandons the proc it happened in.

pub mod expr;
pub mod stmt;
pub mod verify;
pub mod writer;

#[cfg(test)]
mod tests;

use hashbrown::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace};

use crate::frontend::dm::ast::{Expression, ProcBlock, ProcDefinition, ProcStatement, ProcStatementKind, ValueType};
use crate::frontend::dm::{Constant, DreamPath};
use crate::middle::artifact::{ProcArgumentJson, ProcAttributes, ProcDefinitionJson};
use crate::middle::objtree::{DMProc, GlobalInit, ObjectTree, ProcSource, GLOBAL_INIT_PROC_NAME};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;
use crate::vm::{CallArgumentsType, DMReference, DecodeError, DreamProcOpcode, EncodeError, Operand};

pub use verify::{stack_effect, verify};
pub use writer::{Label, ProcCode, ProcWriter, MAX_LOCALS};

/// Arguments are addressed by one byte
pub const MAX_ARGUMENTS: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{0} has no label operand")]
    NotAJump(DreamProcOpcode),

    #[error("Label {0} was never placed")]
    UnresolvedLabel(usize),

    #[error("Stack depth at offset {offset} is {found} on one path and {expected} on another")]
    StackMismatch { offset: usize, expected: i32, found: i32 },

    #[error("Stack underflow at offset {offset}")]
    NegativeStack { offset: usize },

    #[error("Jump at offset {offset} targets {target}, which is not an instruction")]
    BadJumpTarget { offset: usize, target: usize },

    #[error("Too many local vars, \"{0}\" exceeds the limit of 256")]
    TooManyLocals(String),

    #[error("Too many parameters ({0}), the limit is 256")]
    TooManyArguments(usize),
}

impl CodegenError {
    /// Code the error is reported under
    pub fn code(&self) -> WarningCode {
        match self {
            CodegenError::UnresolvedLabel(_) | CodegenError::BadJumpTarget { .. } => WarningCode::BadLabel,
            _ => WarningCode::InvalidBytecode,
        }
    }
}

pub type CodegenResult<T = ()> = Result<T, CodegenError>;

/// A loop `break` and `continue` can target
#[derive(Debug, Clone)]
struct LoopFrame {
    name: Option<String>,
    break_label: Label,
    continue_label: Label,
}

/// What is known about a local slot while it is in scope
#[derive(Debug, Clone, Default)]
struct LocalInfo {
    type_path: Option<DreamPath>,
    is_const: bool,
}

/// Verb fields set by `set` statements
#[derive(Debug, Clone, Default)]
struct VerbInfo {
    name: Option<String>,
    category: Option<String>,
    desc: Option<String>,
    invisibility: Option<i8>,
}

/// Compiles a single proc
pub struct ProcBuilder<'a> {
    tree: &'a mut ObjectTree,
    sink: &'a DiagnosticSink,
    /// Type whose vars and procs are in scope
    owner: i32,
    writer: ProcWriter,
    /// Parameter names and declared types, by argument index
    parameters: Vec<(String, Option<DreamPath>)>,
    local_info: Vec<LocalInfo>,
    /// `var/global/x` declared inside the proc
    proc_globals: HashMap<String, i32>,
    loops: Vec<LoopFrame>,
    /// Name of the label the next loop is the body of
    pending_loop_name: Option<String>,
    goto_labels: HashMap<String, Label>,
    placed_labels: HashSet<String>,
    enumerators: i32,
    /// Type a bare `new()` creates
    inferred_type: Option<DreamPath>,
    attributes: ProcAttributes,
    verb: VerbInfo,
    location: Location,
}

impl<'a> ProcBuilder<'a> {
    pub fn new(
        tree: &'a mut ObjectTree,
        sink: &'a DiagnosticSink,
        owner: i32,
    ) -> Self {
        Self {
            tree,
            sink,
            owner,
            writer: ProcWriter::new(),
            parameters: Vec::new(),
            local_info: Vec::new(),
            proc_globals: HashMap::new(),
            loops: Vec::new(),
            pending_loop_name: None,
            goto_labels: HashMap::new(),
            placed_labels: HashSet::new(),
            enumerators: 0,
            inferred_type: None,
            attributes: ProcAttributes::NONE,
            verb: VerbInfo::default(),
            location: Location::UNKNOWN,
        }
    }

    fn emit(
        &mut self,
        opcode: DreamProcOpcode,
        args: &[Operand],
    ) -> CodegenResult {
        self.writer.emit(opcode, args)
    }

    fn emit_jump(
        &mut self,
        opcode: DreamProcOpcode,
        args: &[Operand],
        label: Label,
    ) -> CodegenResult {
        self.writer.emit_jump(opcode, args, label)
    }

    fn string_id(
        &mut self,
        value: &str,
    ) -> i32 {
        self.tree.add_string(value)
    }

    fn report(
        &self,
        code: WarningCode,
        location: &Location,
        message: impl Into<String>,
    ) {
        self.sink.emit(code, location.clone(), message);
    }

    fn set_location(
        &mut self,
        location: &Location,
    ) {
        if location.is_unknown() {
            return;
        }
        self.location = location.clone();
        let tree = &mut *self.tree;
        self.writer.set_location(location, |name| tree.add_string(name));
    }

    fn declare_local(
        &mut self,
        name: &str,
        type_path: Option<DreamPath>,
        is_const: bool,
    ) -> CodegenResult<u8> {
        let id = self.writer.declare_local(name)?;
        let index = usize::from(id);
        if self.local_info.len() <= index {
            self.local_info.resize(index + 1, LocalInfo::default());
        }
        self.local_info[index] = LocalInfo { type_path, is_const };
        Ok(id)
    }

    fn local_info(
        &self,
        id: u8,
    ) -> Option<&LocalInfo> {
        self.local_info.get(usize::from(id))
    }

    fn new_enumerator(&mut self) -> i32 {
        self.enumerators += 1;
        self.enumerators - 1
    }

    fn goto_label(
        &mut self,
        name: &str,
    ) -> Label {
        if let Some(label) = self.goto_labels.get(name) {
            return *label;
        }
        let label = self.writer.new_label();
        self.goto_labels.insert(name.to_string(), label);
        label
    }

    /// Push a constant value
    fn emit_constant(
        &mut self,
        constant: &Constant,
        location: &Location,
    ) -> CodegenResult {
        match constant {
            Constant::Null => self.emit(DreamProcOpcode::PushNull, &[]),
            Constant::Num(value) => self.emit(DreamProcOpcode::PushFloat, &[Operand::Float(*value)]),
            Constant::Str(value) => {
                let id = self.string_id(value);
                self.emit(DreamProcOpcode::PushString, &[Operand::String(id)])
            }
            Constant::Resource(path) => {
                self.tree.add_resource(path);
                let id = self.string_id(path);
                self.emit(DreamProcOpcode::PushResource, &[Operand::String(id)])
            }
            Constant::Path(path) => self.emit_path(path, location),
            Constant::List(entries) => {
                let associative = entries.iter().any(|(key, _)| key.is_some());
                for (key, value) in entries {
                    match key {
                        Some(key) => {
                            self.emit_constant(key, location)?;
                            self.emit_constant(value, location)?;
                        }
                        None => {
                            self.emit_constant(value, location)?;
                            if associative {
                                self.emit(DreamProcOpcode::PushNull, &[])?;
                            }
                        }
                    }
                }
                let size = Operand::Int(entries.len() as i32);
                if associative {
                    self.emit(DreamProcOpcode::CreateAssociativeList, &[size])
                } else {
                    self.emit(DreamProcOpcode::CreateList, &[size])
                }
            }
        }
    }

    /// Push a type, or a proc when the path names one
    fn emit_path(
        &mut self,
        path: &DreamPath,
        location: &Location,
    ) -> CodegenResult {
        if let Some(index) = path.proc_element() {
            let owner_path = path.from_elements(0, index);
            let name = path.elements().get(index + 1).cloned().unwrap_or_default();
            let found = self
                .tree
                .type_id(&owner_path)
                .and_then(|owner| self.tree.find_proc(owner, &name));
            return match found {
                Some(id) => self.emit(DreamProcOpcode::PushProc, &[Operand::Int(id)]),
                None => {
                    self.report(WarningCode::ItemDoesntExist, location, format!("Proc {} does not exist", path));
                    self.emit(DreamProcOpcode::PushNull, &[])
                }
            };
        }

        match self.tree.type_id(path) {
            Some(id) => self.emit(DreamProcOpcode::PushType, &[Operand::Int(id)]),
            None => {
                self.report(WarningCode::ItemDoesntExist, location, format!("Type {} does not exist", path));
                self.emit(DreamProcOpcode::PushNull, &[])
            }
        }
    }

    /// Apply the `set` statements at the top of a proc body
    fn process_set_statements(
        &mut self,
        block: &ProcBlock,
    ) {
        for statement in &block.set_statements {
            let statements: Vec<&ProcStatement> = match &statement.kind {
                ProcStatementKind::Aggregate(inner) => inner.iter().collect(),
                _ => vec![statement],
            };
            for statement in statements {
                if let ProcStatementKind::Set {
                    attribute,
                    value,
                    in_keyword,
                } = &statement.kind
                {
                    self.process_set(&statement.location, attribute, value, *in_keyword);
                }
            }
        }
    }

    fn process_set(
        &mut self,
        location: &Location,
        attribute: &str,
        value: &Expression,
        in_keyword: bool,
    ) {
        if attribute == "src" {
            self.report(
                WarningCode::UnimplementedAccess,
                location,
                "set src is not implemented",
            );
            return;
        }
        if in_keyword {
            self.report(
                WarningCode::InvalidSetStatement,
                location,
                format!("set {} cannot use \"in\"", attribute),
            );
            return;
        }

        let Some(constant) = Constant::fold(value) else {
            self.report(
                WarningCode::InvalidSetStatement,
                location,
                format!("set {} must be a constant", attribute),
            );
            return;
        };

        let flag = match attribute {
            "waitfor" => {
                self.attributes
                    .set(ProcAttributes::DISABLE_WAITFOR, !constant.is_truthy());
                return;
            }
            "popup_menu" => {
                self.attributes
                    .set(ProcAttributes::HIDE_POPUP_MENU, !constant.is_truthy());
                return;
            }
            "opendream_unimplemented" => ProcAttributes::UNIMPLEMENTED,
            "hidden" => ProcAttributes::HIDDEN,
            "instant" => ProcAttributes::INSTANT,
            "background" => ProcAttributes::BACKGROUND,
            "name" | "category" | "desc" => {
                let text = match constant {
                    Constant::Str(text) => Some(text),
                    Constant::Null if attribute == "category" => None,
                    _ => {
                        self.report(
                            WarningCode::InvalidSetStatement,
                            location,
                            format!("set {} must be text", attribute),
                        );
                        return;
                    }
                };
                match attribute {
                    "name" => self.verb.name = text,
                    "category" => self.verb.category = Some(text.unwrap_or_default()),
                    _ => self.verb.desc = text,
                }
                return;
            }
            "invisibility" => {
                match constant {
                    Constant::Num(value) => self.verb.invisibility = Some(value.clamp(0.0, 100.0) as i8),
                    _ => self.report(
                        WarningCode::InvalidSetStatement,
                        location,
                        "set invisibility must be a number",
                    ),
                }
                return;
            }
            _ => {
                self.report(
                    WarningCode::InvalidSetStatement,
                    location,
                    format!("Unknown set attribute \"{}\"", attribute),
                );
                return;
            }
        };
        self.attributes.set(flag, constant.is_truthy());
    }

    /// Compile a defined proc: parameters, defaults and body
    fn build_definition(
        &mut self,
        definition: &ProcDefinition,
    ) -> CodegenResult<Vec<ProcArgumentJson>> {
        if definition.parameters.len() > MAX_ARGUMENTS {
            return Err(CodegenError::TooManyArguments(definition.parameters.len()));
        }
        self.set_location(&definition.location);
        if definition.is_override {
            self.attributes.set(ProcAttributes::IS_OVERRIDE, true);
        }

        let mut arguments = Vec::with_capacity(definition.parameters.len());
        for parameter in &definition.parameters {
            self.parameters
                .push((parameter.name.clone(), parameter.type_path.clone()));
            arguments.push(ProcArgumentJson {
                name: parameter.name.clone(),
                types: parameter.types.unwrap_or(ValueType::ANYTHING).bits(),
            });
        }

        // Defaults apply when the caller passed null
        for (index, parameter) in definition.parameters.iter().enumerate() {
            let Some(default) = &parameter.default else {
                continue;
            };
            let reference = Operand::Reference(DMReference::Argument(index as u8));
            let skip = self.writer.new_label();
            self.set_location(&parameter.location);
            self.emit(DreamProcOpcode::PushReferenceValue, &[reference])?;
            self.emit(DreamProcOpcode::IsNull, &[])?;
            self.emit_jump(DreamProcOpcode::JumpIfFalse, &[], skip)?;
            self.inferred_type = parameter.type_path.clone();
            self.emit_expression(default)?;
            self.inferred_type = None;
            self.emit(DreamProcOpcode::Assign, &[reference])?;
            self.emit(DreamProcOpcode::Pop, &[])?;
            self.writer.mark(skip);
        }

        if let Some(body) = &definition.body {
            self.process_set_statements(body);
            self.emit_block(body)?;
        }
        Ok(arguments)
    }

    /// The init proc: run the parent's, then each non-constant initializer
    fn build_type_init(&mut self) -> CodegenResult {
        let assignments = self
            .tree
            .get(self.owner)
            .map(|ty| ty.init_assignments.clone())
            .unwrap_or_default();

        self.emit(
            DreamProcOpcode::Call,
            &[
                Operand::Reference(DMReference::SuperProc),
                Operand::ArgType(CallArgumentsType::None),
                Operand::Int(0),
            ],
        )?;
        self.emit(DreamProcOpcode::Pop, &[])?;

        for (name, value) in &assignments {
            self.set_location(&value.location);
            self.inferred_type = self
                .tree
                .variable(self.owner, name)
                .and_then(|variable| variable.type_path.clone());
            self.emit_expression(value)?;
            self.inferred_type = None;
            let field = self.string_id(name);
            self.emit(DreamProcOpcode::Assign, &[Operand::Reference(DMReference::SrcField(field))])?;
            self.emit(DreamProcOpcode::Pop, &[])?;
        }
        Ok(())
    }

    /// Assign each global its initial value, in declaration order
    fn build_global_init(
        &mut self,
        inits: &[GlobalInit],
    ) -> CodegenResult {
        for init in inits {
            self.owner = init.owner;
            self.set_location(&init.value.location);
            self.inferred_type = usize::try_from(init.global)
                .ok()
                .and_then(|index| self.tree.globals().get(index))
                .and_then(|global| global.type_path.clone());
            self.emit_expression(&init.value)?;
            self.inferred_type = None;
            self.emit(DreamProcOpcode::Assign, &[Operand::Reference(DMReference::Global(init.global))])?;
            self.emit(DreamProcOpcode::Pop, &[])?;
        }
        Ok(())
    }

    /// Resolve labels and check that every `goto` found its label
    fn finish(mut self) -> CodegenResult<(ProcCode, ProcAttributes, VerbInfo)> {
        let missing: Vec<(String, Label)> = self
            .goto_labels
            .iter()
            .filter(|(name, _)| !self.placed_labels.contains(*name))
            .map(|(name, label)| (name.clone(), *label))
            .collect();
        for (name, label) in missing {
            self.report(WarningCode::BadLabel, &self.location, format!("Unknown label \"{}\"", name));
            self.writer.mark(label);
        }
        let code = self.writer.finish()?;
        Ok((code, self.attributes, self.verb))
    }
}

fn definition_json(
    proc: &DMProc,
    code: ProcCode,
    attributes: ProcAttributes,
    verb: VerbInfo,
    arguments: Vec<ProcArgumentJson>,
) -> ProcDefinitionJson {
    ProcDefinitionJson {
        owning_type_id: proc.owner,
        name: proc.name.clone(),
        attributes,
        max_stack_size: 0,
        arguments,
        locals: code.locals,
        source_info: code.source_info,
        bytecode: code.bytecode,
        is_verb: proc.is_verb(),
        verb_name: verb.name,
        verb_category: verb.category,
        verb_desc: verb.desc,
        invisibility: verb.invisibility,
    }
}

fn empty_json(proc: &DMProc) -> ProcDefinitionJson {
    ProcDefinitionJson {
        owning_type_id: proc.owner,
        name: proc.name.clone(),
        is_verb: proc.is_verb(),
        ..ProcDefinitionJson::default()
    }
}

/// Compile one proc of the tree
pub fn compile_proc(
    tree: &mut ObjectTree,
    sink: &DiagnosticSink,
    id: i32,
) -> Option<ProcDefinitionJson> {
    let proc = tree.proc(id)?.clone();
    trace!("Compiling proc {} on type {}", proc.name, proc.owner);

    let mut builder = ProcBuilder::new(tree, sink, proc.owner);
    let result = match &proc.source {
        ProcSource::Definition(definition) => builder
            .build_definition(definition)
            .and_then(|arguments| builder.finish().map(|finished| (finished, arguments))),
        ProcSource::TypeInit => builder
            .build_type_init()
            .and_then(|_| builder.finish().map(|finished| (finished, Vec::new()))),
    };

    match result {
        Ok(((code, attributes, verb), arguments)) => Some(definition_json(&proc, code, attributes, verb, arguments)),
        Err(error) => {
            sink.emit(
                error.code(),
                proc.location.clone(),
                format!("Failed to compile proc \"{}\": {}", proc.name, error),
            );
            Some(empty_json(&proc))
        }
    }
}

/// Compile the proc that initializes globals with non-constant values
pub fn compile_global_init(
    tree: &mut ObjectTree,
    sink: &DiagnosticSink,
) -> Option<ProcDefinitionJson> {
    let inits = tree.global_inits().to_vec();
    if inits.is_empty() {
        return None;
    }

    let mut builder = ProcBuilder::new(tree, sink, 0);
    let result = builder
        .build_global_init(&inits)
        .and_then(|_| builder.finish());

    let json = match result {
        Ok((code, _, _)) => ProcDefinitionJson {
            owning_type_id: 0,
            name: GLOBAL_INIT_PROC_NAME.to_string(),
            locals: code.locals,
            source_info: code.source_info,
            bytecode: code.bytecode,
            ..ProcDefinitionJson::default()
        },
        Err(error) => {
            let location = inits.first().map(|init| init.value.location.clone()).unwrap_or_default();
            sink.emit(error.code(), location, format!("Failed to compile global initializers: {}", error));
            ProcDefinitionJson {
                name: GLOBAL_INIT_PROC_NAME.to_string(),
                ..ProcDefinitionJson::default()
            }
        }
    };
    Some(json)
}

/// Verify a compiled proc and record its peak stack depth
pub fn verify_proc(
    json: &mut ProcDefinitionJson,
    strings: &[String],
    location: &Location,
    sink: &DiagnosticSink,
) {
    match verify(&json.bytecode, strings) {
        Ok(peak) => json.max_stack_size = peak,
        Err(error) => {
            sink.emit(
                error.code(),
                location.clone(),
                format!("Invalid bytecode in proc \"{}\": {}", json.name, error),
            );
        }
    }
}

/// Every proc of the tree plus the global init proc, verified
pub fn compile_procs(
    tree: &mut ObjectTree,
    sink: &DiagnosticSink,
) -> (Vec<ProcDefinitionJson>, Option<ProcDefinitionJson>) {
    tree.create_init_procs();

    let count = tree.procs().len() as i32;
    let mut procs: Vec<ProcDefinitionJson> = (0..count).filter_map(|id| compile_proc(tree, sink, id)).collect();
    // Proc statics discovered above still need their initializers
    let mut global_init = compile_global_init(tree, sink);

    let strings: Vec<String> = tree.strings().iter().cloned().collect();
    for (json, proc) in procs.iter_mut().zip(tree.procs()) {
        verify_proc(json, &strings, &proc.location, sink);
    }
    if let Some(json) = global_init.as_mut() {
        verify_proc(json, &strings, &Location::UNKNOWN, sink);
    }

    debug!("Compiled {} procs, {} strings", procs.len(), strings.len());
    (procs, global_init)
}
