//! Object tree
//!
//! Types with their vars and procs, plus the compilation-wide tables: global
//! vars, global procs, strings and resources. Every table is append-only, so
//! an index handed out while building stays valid in the artifact.

use hashbrown::HashMap;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::frontend::dm::ast::{
    self, Expression, ExpressionKind, ObjectVarDefinition, ProcDefinition, Statement, StatementKind, ValueType,
    VarModifiers,
};
use crate::frontend::dm::{Constant, DreamPath};
use crate::frontend::dmm::{MapLayer, MapType, MapTypes};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;

/// Name of the proc running a type's non-constant var initializers
pub const INIT_PROC_NAME: &str = "<init>";

/// Name of the proc initializing global vars
pub const GLOBAL_INIT_PROC_NAME: &str = "<global init>";

#[derive(Debug, Clone)]
pub struct DMVariable {
    pub name: String,
    pub location: Location,
    pub type_path: Option<DreamPath>,
    pub modifiers: VarModifiers,
    pub types: ValueType,
    pub value: Expression,
}

impl DMVariable {
    fn from_definition(definition: ObjectVarDefinition) -> Self {
        Self {
            name: definition.name,
            location: definition.location,
            type_path: definition.type_path,
            modifiers: definition.modifiers,
            types: definition.types,
            value: definition.value,
        }
    }

    /// The initial value, when it folds at compile time
    pub fn constant(&self) -> Option<Constant> {
        Constant::fold(&self.value)
    }
}

#[derive(Debug, Clone)]
pub enum ProcSource {
    Definition(Box<ProcDefinition>),
    /// Runs the owner's non-constant var initializers
    TypeInit,
}

#[derive(Debug, Clone)]
pub struct DMProc {
    pub id: i32,
    pub owner: i32,
    pub name: String,
    pub location: Location,
    pub source: ProcSource,
}

impl DMProc {
    pub fn definition(&self) -> Option<&ProcDefinition> {
        match &self.source {
            ProcSource::Definition(definition) => Some(definition),
            ProcSource::TypeInit => None,
        }
    }

    pub fn is_verb(&self) -> bool {
        self.definition().is_some_and(|d| d.is_verb)
    }
}

/// A non-constant initializer of a global var
#[derive(Debug, Clone)]
pub struct GlobalInit {
    pub global: i32,
    /// Type whose scope the value is evaluated in
    pub owner: i32,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct DMObject {
    pub id: i32,
    pub path: DreamPath,
    pub parent: Option<i32>,
    /// Vars declared on this type
    pub variables: IndexMap<String, DMVariable>,
    /// New initial values for inherited vars
    pub overrides: IndexMap<String, DMVariable>,
    /// `var/global/x` and `var/static/x`, name to global index
    pub global_variables: IndexMap<String, i32>,
    /// Overloads of each proc name, oldest first
    pub procs: IndexMap<String, Vec<i32>>,
    pub verbs: Vec<i32>,
    /// Non-constant initial values, run by the init proc
    pub init_assignments: Vec<(String, Expression)>,
    pub init_proc: Option<i32>,
}

impl DMObject {
    fn new(
        id: i32,
        path: DreamPath,
        parent: Option<i32>,
    ) -> Self {
        Self {
            id,
            path,
            parent,
            variables: IndexMap::new(),
            overrides: IndexMap::new(),
            global_variables: IndexMap::new(),
            procs: IndexMap::new(),
            verbs: Vec::new(),
            init_assignments: Vec::new(),
            init_proc: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == 0
    }
}

/// Types every program can name without declaring them
const BUILTIN_TYPES: &[&str] = &["/datum", "/list", "/atom", "/atom/movable", "/obj", "/mob", "/turf", "/area"];

/// Parent of a type that was never given one explicitly
fn default_parent(path: &DreamPath) -> Option<DreamPath> {
    let elements = path.elements();
    let parent: &[&str] = match elements.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => return None,
        ["datum"] | ["list"] => &[],
        ["atom"] => &["datum"],
        ["atom", "movable"] => &["atom"],
        ["obj"] | ["mob"] => &["atom", "movable"],
        ["turf"] | ["area"] => &["atom"],
        [_] => &["datum"],
        _ => return path.parent(),
    };
    Some(DreamPath::absolute(parent))
}

#[derive(Debug)]
pub struct ObjectTree {
    types: Vec<DMObject>,
    type_ids: HashMap<DreamPath, i32>,
    procs: Vec<DMProc>,
    globals: Vec<DMVariable>,
    global_procs: IndexMap<String, i32>,
    global_inits: Vec<GlobalInit>,
    strings: IndexSet<String>,
    resources: IndexSet<String>,
}

impl Default for ObjectTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectTree {
    /// A tree holding the root type at index 0 and the builtin types
    pub fn new() -> Self {
        let mut tree = Self {
            types: Vec::new(),
            type_ids: HashMap::new(),
            procs: Vec::new(),
            globals: Vec::new(),
            global_procs: IndexMap::new(),
            global_inits: Vec::new(),
            strings: IndexSet::new(),
            resources: IndexSet::new(),
        };
        tree.get_or_create(&DreamPath::root());
        for path in BUILTIN_TYPES {
            tree.get_or_create(&DreamPath::parse(path));
        }
        tree
    }

    pub fn types(&self) -> &[DMObject] {
        &self.types
    }

    pub fn get(
        &self,
        id: i32,
    ) -> Option<&DMObject> {
        usize::try_from(id).ok().and_then(|i| self.types.get(i))
    }

    fn get_mut(
        &mut self,
        id: i32,
    ) -> Option<&mut DMObject> {
        usize::try_from(id).ok().and_then(move |i| self.types.get_mut(i))
    }

    pub fn root(&self) -> &DMObject {
        &self.types[0]
    }

    pub fn procs(&self) -> &[DMProc] {
        &self.procs
    }

    pub fn proc(
        &self,
        id: i32,
    ) -> Option<&DMProc> {
        usize::try_from(id).ok().and_then(|i| self.procs.get(i))
    }

    pub fn globals(&self) -> &[DMVariable] {
        &self.globals
    }

    pub fn global_procs(&self) -> &IndexMap<String, i32> {
        &self.global_procs
    }

    pub fn global_inits(&self) -> &[GlobalInit] {
        &self.global_inits
    }

    pub fn strings(&self) -> &IndexSet<String> {
        &self.strings
    }

    pub fn resources(&self) -> &IndexSet<String> {
        &self.resources
    }

    /// Index of `value` in the string table, adding it if needed
    pub fn add_string(
        &mut self,
        value: &str,
    ) -> i32 {
        if let Some(index) = self.strings.get_index_of(value) {
            return index as i32;
        }
        self.strings.insert_full(value.to_string()).0 as i32
    }

    pub fn add_resource(
        &mut self,
        path: &str,
    ) {
        if !self.resources.contains(path) {
            self.resources.insert(path.to_string());
        }
    }

    /// Every path under `/list` names the list type itself
    fn canonical(path: &DreamPath) -> DreamPath {
        let path = path.to_absolute();
        if path.elements().first().map(String::as_str) == Some("list") {
            DreamPath::absolute(&["list"])
        } else {
            path
        }
    }

    pub fn type_id(
        &self,
        path: &DreamPath,
    ) -> Option<i32> {
        self.type_ids.get(&Self::canonical(path)).copied()
    }

    /// The type at `path`, creating it and any missing ancestors
    pub fn get_or_create(
        &mut self,
        path: &DreamPath,
    ) -> i32 {
        let path = Self::canonical(path);
        if let Some(id) = self.type_ids.get(&path) {
            return *id;
        }

        let parent = default_parent(&path).map(|parent| self.get_or_create(&parent));
        let id = self.types.len() as i32;
        self.types.push(DMObject::new(id, path.clone(), parent));
        self.type_ids.insert(path, id);
        id
    }

    /// `id` followed by each of its parents
    pub fn ancestors(
        &self,
        id: i32,
    ) -> impl Iterator<Item = &DMObject> + '_ {
        let mut next = self.get(id);
        // A parent_type cycle is rejected when set, the bound is a backstop
        let mut remaining = self.types.len();
        std::iter::from_fn(move || {
            let current = next?;
            remaining = remaining.checked_sub(1)?;
            next = current.parent.and_then(|parent| self.get(parent));
            Some(current)
        })
    }

    pub fn is_subtype_of(
        &self,
        id: i32,
        path: &DreamPath,
    ) -> bool {
        self.ancestors(id).any(|ty| ty.path == *path)
    }

    /// Declaration of the var `name` visible from type `id`
    pub fn variable(
        &self,
        id: i32,
        name: &str,
    ) -> Option<&DMVariable> {
        self.ancestors(id).find_map(|ty| ty.variables.get(name))
    }

    /// Current initial value of `name` on type `id`, overrides included
    pub fn initial_value(
        &self,
        id: i32,
        name: &str,
    ) -> Option<&DMVariable> {
        self.ancestors(id)
            .find_map(|ty| ty.overrides.get(name).or_else(|| ty.variables.get(name)))
    }

    pub fn global_var_id(
        &self,
        id: i32,
        name: &str,
    ) -> Option<i32> {
        self.ancestors(id)
            .find_map(|ty| ty.global_variables.get(name).copied())
            .or_else(|| self.root().global_variables.get(name).copied())
    }

    /// Newest overload of `name` visible from type `id`
    pub fn find_proc(
        &self,
        id: i32,
        name: &str,
    ) -> Option<i32> {
        self.ancestors(id)
            .find_map(|ty| ty.procs.get(name).and_then(|overloads| overloads.last().copied()))
    }

    pub fn global_proc(
        &self,
        name: &str,
    ) -> Option<i32> {
        self.global_procs.get(name).copied()
    }

    /// `path.search`: walk up from `path` looking for `search` under
    /// each ancestor path
    pub fn upward_search(
        &self,
        path: &DreamPath,
        search: &DreamPath,
    ) -> Option<DreamPath> {
        let elements = search.elements();
        let proc_index = search.proc_element();
        let type_part = match proc_index {
            Some(index) => &elements[..index],
            None => elements,
        };

        let mut current = Some(path.to_absolute());
        while let Some(base) = current {
            let mut candidate: Vec<String> = base.elements().to_vec();
            candidate.extend(type_part.iter().cloned());
            let candidate_path = DreamPath::absolute(&candidate);
            if let Some(id) = self.type_id(&candidate_path) {
                match proc_index {
                    None => return Some(candidate_path),
                    Some(index) => {
                        let name = elements.get(index + 1)?;
                        if self.find_proc(id, name).is_some() {
                            candidate.extend(elements[index..].iter().cloned());
                            return Some(DreamPath::absolute(&candidate));
                        }
                    }
                }
            }
            current = if base.is_root() { None } else { base.parent() };
        }
        None
    }

    pub fn add_proc(
        &mut self,
        owner: i32,
        name: &str,
        location: Location,
        source: ProcSource,
    ) -> i32 {
        let id = self.procs.len() as i32;
        self.procs.push(DMProc {
            id,
            owner,
            name: name.to_string(),
            location,
            source,
        });
        id
    }

    /// Allocate a global slot. The caller decides which scope sees it.
    pub fn add_global(
        &mut self,
        variable: DMVariable,
    ) -> i32 {
        let id = self.globals.len() as i32;
        self.globals.push(variable);
        id
    }

    pub fn add_global_init(
        &mut self,
        global: i32,
        owner: i32,
        value: Expression,
    ) {
        self.global_inits.push(GlobalInit { global, owner, value });
    }

    /// Add every declaration in `file`
    pub fn add_file(
        &mut self,
        file: ast::File,
        sink: &DiagnosticSink,
    ) {
        let before = (self.types.len(), self.procs.len());
        for statement in file.block.statements {
            self.add_statement(statement, sink);
        }
        debug!(
            "Object tree: {} new types, {} new procs from {}",
            self.types.len() - before.0,
            self.procs.len() - before.1,
            file.location.source_name()
        );
    }

    fn add_statement(
        &mut self,
        statement: Statement,
        sink: &DiagnosticSink,
    ) {
        match statement.kind {
            StatementKind::Invalid | StatementKind::Null => {}
            StatementKind::ObjectDefinition { path, body } => {
                self.get_or_create(&path);
                for inner in body.into_iter().flat_map(|block| block.statements) {
                    self.add_statement(inner, sink);
                }
            }
            StatementKind::ProcDefinition(definition) => self.add_proc_definition(definition, sink),
            StatementKind::VarDefinition(definition) => self.add_var_definition(definition, sink),
            StatementKind::MultipleVarDefinitions(definitions) => {
                for definition in definitions {
                    self.add_var_definition(definition, sink);
                }
            }
            StatementKind::VarOverride {
                object_path,
                name,
                value,
            } => self.add_var_override(statement.location, &object_path, name, value, sink),
        }
    }

    fn add_proc_definition(
        &mut self,
        definition: ProcDefinition,
        sink: &DiagnosticSink,
    ) {
        let owner = self.get_or_create(&definition.object_path);
        let name = definition.name.clone();
        let location = definition.location.clone();
        let is_override = definition.is_override;
        let is_verb = definition.is_verb;

        let defined_here = self.get(owner).is_some_and(|ty| ty.procs.contains_key(&name));
        if defined_here && !is_override {
            sink.emit(
                WarningCode::DuplicateProcDefinition,
                location.clone(),
                format!("Type {} already has a proc named \"{}\"", definition.object_path, name),
            );
        }

        let id = self.add_proc(owner, &name, location, ProcSource::Definition(Box::new(definition)));
        if let Some(ty) = self.get_mut(owner) {
            ty.procs.entry(name.clone()).or_default().push(id);
            if is_verb {
                ty.verbs.push(id);
            }
        }
        if owner == 0 {
            self.global_procs.insert(name, id);
        }
    }

    fn add_var_definition(
        &mut self,
        definition: ObjectVarDefinition,
        sink: &DiagnosticSink,
    ) {
        let owner = self.get_or_create(&definition.object_path);
        let variable = DMVariable::from_definition(definition);

        if variable.modifiers.is_const && variable.constant().is_none() {
            sink.emit(
                WarningCode::HardConstContext,
                variable.location.clone(),
                format!("Value of const var \"{}\" must be a constant", variable.name),
            );
        }

        let Some(ty) = self.get(owner) else {
            return;
        };
        if ty.variables.contains_key(&variable.name) || ty.global_variables.contains_key(&variable.name) {
            sink.emit(
                WarningCode::DuplicateVariable,
                variable.location.clone(),
                format!("Duplicate definition of var \"{}\" on {}", variable.name, ty.path),
            );
            return;
        }

        if variable.modifiers.is_static {
            let name = variable.name.clone();
            let value = variable.value.clone();
            let needs_init = variable.constant().is_none();
            let id = self.add_global(variable);
            if needs_init {
                self.add_global_init(id, owner, value);
            }
            if let Some(ty) = self.get_mut(owner) {
                ty.global_variables.insert(name, id);
            }
            return;
        }

        let init = variable
            .constant()
            .is_none()
            .then(|| (variable.name.clone(), variable.value.clone()));
        if let Some(ty) = self.get_mut(owner) {
            ty.init_assignments.extend(init);
            ty.variables.insert(variable.name.clone(), variable);
        }
    }

    fn add_var_override(
        &mut self,
        location: Location,
        object_path: &DreamPath,
        name: String,
        value: Expression,
        sink: &DiagnosticSink,
    ) {
        let owner = self.get_or_create(object_path);

        if name == "parent_type" {
            self.set_parent_type(owner, location, &value, sink);
            return;
        }

        let variable = DMVariable {
            name: name.clone(),
            location,
            type_path: None,
            modifiers: VarModifiers::default(),
            types: ValueType::ANYTHING,
            value,
        };
        let init = variable.constant().is_none().then(|| (name.clone(), variable.value.clone()));
        if let Some(ty) = self.get_mut(owner) {
            ty.init_assignments.extend(init);
            ty.overrides.insert(name, variable);
        }
    }

    fn set_parent_type(
        &mut self,
        owner: i32,
        location: Location,
        value: &Expression,
        sink: &DiagnosticSink,
    ) {
        let ExpressionKind::Path(path) = &value.unwrapped().kind else {
            sink.emit(
                WarningCode::BadExpression,
                location,
                "parent_type must be a constant type path",
            );
            return;
        };
        let parent = self.get_or_create(path);
        if self.ancestors(parent).any(|ty| ty.id == owner) {
            sink.forced_error(location, format!("Circular parent_type on {}", path));
            return;
        }
        if let Some(ty) = self.get_mut(owner) {
            ty.parent = Some(parent);
        }
    }

    /// Checks that need the whole tree: overrides of const, final and
    /// static vars, and overrides of final procs
    pub fn check_overrides(
        &self,
        sink: &DiagnosticSink,
    ) {
        for ty in &self.types {
            for (name, over) in &ty.overrides {
                let Some(declared) = self.variable(ty.id, name) else {
                    continue;
                };
                let (code, what) = if declared.modifiers.is_const {
                    (WarningCode::WriteToConstant, "const")
                } else if declared.modifiers.is_final {
                    (WarningCode::FinalOverride, "final")
                } else if declared.modifiers.is_static {
                    (WarningCode::StaticOverride, "static")
                } else {
                    continue;
                };
                sink.emit(
                    code,
                    over.location.clone(),
                    format!("{} cannot override {} var \"{}\"", ty.path, what, name),
                );
            }

            let Some(parent) = ty.parent else {
                continue;
            };
            for (name, overloads) in &ty.procs {
                let inherited_final = self
                    .find_proc(parent, name)
                    .and_then(|id| self.proc(id))
                    .and_then(DMProc::definition)
                    .is_some_and(|d| d.is_final);
                if !inherited_final {
                    continue;
                }
                for id in overloads {
                    if let Some(proc) = self.proc(*id) {
                        sink.emit(
                            WarningCode::FinalOverride,
                            proc.location.clone(),
                            format!("Proc \"{}\" is final and cannot be overridden", name),
                        );
                    }
                }
            }
        }
    }

    /// Create the init proc of every type with non-constant initializers
    pub fn create_init_procs(&mut self) {
        for index in 0..self.types.len() {
            let ty = &self.types[index];
            if ty.init_assignments.is_empty() || ty.init_proc.is_some() {
                continue;
            }
            let owner = ty.id;
            let location = ty
                .init_assignments
                .first()
                .map(|(_, value)| value.location.clone())
                .unwrap_or(Location::UNKNOWN);
            let id = self.add_proc(owner, INIT_PROC_NAME, location, ProcSource::TypeInit);
            self.types[index].init_proc = Some(id);
        }
    }
}

impl MapTypes for ObjectTree {
    fn resolve(
        &self,
        path: &DreamPath,
    ) -> Option<MapType> {
        let id = self.type_id(path)?;
        let layer = if self.is_subtype_of(id, &DreamPath::absolute(&["turf"])) {
            MapLayer::Turf
        } else if self.is_subtype_of(id, &DreamPath::absolute(&["area"])) {
            MapLayer::Area
        } else {
            MapLayer::Object
        };
        Some(MapType { id, layer })
    }
}
