//! Statement nodes: object-level declarations and proc bodies

use super::{Expression, ValueType};
use crate::frontend::dm::path::DreamPath;
use crate::util::span::Location;

/// Statements of an object block or of the file itself
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub location: Location,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub location: Location,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// A diagnostic has already been reported for it
    Invalid,
    Null,
    /// `/obj/item` with an optional nested block. The path is absolute,
    /// including the paths of enclosing blocks.
    ObjectDefinition {
        path: DreamPath,
        body: Option<Block>,
    },
    ProcDefinition(ProcDefinition),
    VarDefinition(ObjectVarDefinition),
    /// `var/a, b, c`
    MultipleVarDefinitions(Vec<ObjectVarDefinition>),
    /// `/obj/name = "x"`
    VarOverride {
        object_path: DreamPath,
        name: String,
        value: Expression,
    },
}

impl Statement {
    pub fn new(
        location: Location,
        kind: StatementKind,
    ) -> Self {
        Self { location, kind }
    }
}

/// Proc or verb definition, or an override of an inherited proc
#[derive(Debug, Clone, PartialEq)]
pub struct ProcDefinition {
    pub location: Location,
    pub object_path: DreamPath,
    pub name: String,
    pub is_override: bool,
    pub is_verb: bool,
    pub is_final: bool,
    pub parameters: Vec<DefinitionParameter>,
    pub body: Option<ProcBlock>,
    pub return_types: Option<ValueType>,
}

impl ProcDefinition {
    /// Split a full path such as `/mob/proc/final/attack` into its parts
    pub fn new(
        location: Location,
        path: &DreamPath,
        parameters: Vec<DefinitionParameter>,
        body: Option<ProcBlock>,
        return_types: Option<ValueType>,
    ) -> Self {
        let mut path = path.to_absolute();
        let mut is_verb = false;
        let mut is_override = false;

        let proc_index = match path.proc_element() {
            Some(index) => {
                is_verb = path.elements()[index] == "verb";
                path = path.remove_element(index);
                Some(index)
            }
            None => {
                is_override = true;
                None
            }
        };

        // Removing `proc` shifts `final` into its slot
        let mut is_final = false;
        if let Some(index) = proc_index {
            if !is_override
                && index + 1 < path.elements().len()
                && path.elements().get(index).map(String::as_str) == Some("final")
            {
                is_final = true;
                path = path.remove_element(index);
            }
        }

        let len = path.elements().len();
        let object_path = if len > 1 {
            path.from_elements(0, len - 1)
        } else {
            DreamPath::root()
        };
        let name = path.last_element().unwrap_or_default().to_string();

        Self {
            location,
            object_path,
            name,
            is_override,
            is_verb,
            is_final,
            parameters,
            body,
            return_types,
        }
    }

    /// `operator+`, `operator[]=` and friends
    pub fn is_operator(&self) -> bool {
        self.name.starts_with("operator") && self.name.len() > "operator".len()
    }
}

/// One parameter of a proc definition
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionParameter {
    pub location: Location,
    pub name: String,
    pub type_path: Option<DreamPath>,
    pub is_list: bool,
    pub default: Option<Expression>,
    pub types: Option<ValueType>,
    /// `in list(...)`
    pub possible_values: Option<Expression>,
}

impl DefinitionParameter {
    /// Build from a declared path such as `var/obj/item/I`
    pub fn new(
        location: Location,
        path: &DreamPath,
        default: Option<Expression>,
        types: Option<ValueType>,
        possible_values: Option<Expression>,
    ) -> Self {
        let elements = path.elements();
        let start = usize::from(elements.first().map(String::as_str) == Some("var"));
        let end = elements.len().saturating_sub(1).max(start);
        let mut is_list = false;
        let mut type_elements = Vec::new();
        for element in &elements[start..end] {
            match element.as_str() {
                "static" | "global" | "const" => {}
                "list" => is_list = true,
                other => type_elements.push(other.to_string()),
            }
        }

        Self {
            location,
            name: path.last_element().unwrap_or_default().to_string(),
            type_path: (!type_elements.is_empty()).then(|| DreamPath::absolute(&type_elements)),
            is_list,
            default,
            types,
            possible_values,
        }
    }
}

/// `static`, `const`, `final` and `tmp` modifiers of an object var
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarModifiers {
    pub is_static: bool,
    pub is_const: bool,
    pub is_final: bool,
    pub is_tmp: bool,
}

/// `var/obj/item/I = value` on an object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectVarDefinition {
    pub location: Location,
    /// The object the var belongs to
    pub object_path: DreamPath,
    pub name: String,
    /// Declared type; `/list` when declared as a list
    pub type_path: Option<DreamPath>,
    pub modifiers: VarModifiers,
    pub value: Expression,
    pub types: ValueType,
}

impl ObjectVarDefinition {
    /// Build from a full path such as `/mob/var/tmp/list/items`
    pub fn new(
        location: Location,
        path: &DreamPath,
        value: Expression,
        types: ValueType,
    ) -> Self {
        let elements = path.elements();
        let var_index = path.var_element().unwrap_or(elements.len());
        let object_path = DreamPath::absolute(&elements[..var_index]);

        let mut modifiers = VarModifiers {
            // Root-level vars are globals
            is_static: object_path.is_root(),
            ..VarModifiers::default()
        };
        let mut is_list = false;
        let mut type_elements = Vec::new();
        let end = elements.len().saturating_sub(1);
        for element in elements.iter().take(end).skip(var_index + 1) {
            match element.as_str() {
                "static" | "global" => modifiers.is_static = true,
                "const" => modifiers.is_const = true,
                "final" => modifiers.is_final = true,
                "tmp" => modifiers.is_tmp = true,
                "list" => is_list = true,
                other => type_elements.push(other.to_string()),
            }
        }

        let type_path = if is_list {
            Some(DreamPath::absolute(&["list"]))
        } else if type_elements.is_empty() {
            None
        } else {
            Some(DreamPath::absolute(&type_elements))
        };

        Self {
            location,
            object_path,
            name: path.last_element().unwrap_or_default().to_string(),
            type_path,
            modifiers,
            value,
            types,
        }
    }
}

/// Statements of a proc body
#[derive(Debug, Clone, PartialEq)]
pub struct ProcBlock {
    pub location: Location,
    pub statements: Vec<ProcStatement>,
    /// `set name = "x"` and friends, hoisted out of the body
    pub set_statements: Vec<ProcStatement>,
}

impl ProcBlock {
    pub fn new(
        location: Location,
        statements: Vec<ProcStatement>,
    ) -> Self {
        Self {
            location,
            statements,
            set_statements: Vec::new(),
        }
    }

    pub fn empty(location: Location) -> Self {
        Self::new(location, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.set_statements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcStatement {
    pub location: Location,
    pub kind: ProcStatementKind,
}

impl ProcStatement {
    pub fn new(
        location: Location,
        kind: ProcStatementKind,
    ) -> Self {
        Self { location, kind }
    }

    /// A `set` statement, or several declared at once
    pub fn is_set(&self) -> bool {
        match &self.kind {
            ProcStatementKind::Set { .. } => true,
            ProcStatementKind::Aggregate(statements) => statements.iter().all(ProcStatement::is_set),
            _ => false,
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self.kind, ProcStatementKind::Label { .. })
    }
}

/// A local var declared inside a proc
#[derive(Debug, Clone, PartialEq)]
pub struct ProcVarDeclaration {
    pub name: String,
    /// Declared type; `/list` when declared as a list
    pub type_path: Option<DreamPath>,
    pub is_global: bool,
    pub is_const: bool,
    pub value: Option<Expression>,
    pub types: Option<ValueType>,
}

impl ProcVarDeclaration {
    /// Build from a declared path such as `var/static/list/L`
    pub fn new(
        path: &DreamPath,
        value: Option<Expression>,
        types: Option<ValueType>,
    ) -> Self {
        let elements = path.elements();
        let start = usize::from(elements.first().map(String::as_str) == Some("var"));
        let end = elements.len().saturating_sub(1).max(start);
        let mut is_global = false;
        let mut is_const = false;
        let mut is_list = false;
        let mut type_elements = Vec::new();
        for element in &elements[start..end] {
            match element.as_str() {
                "static" | "global" => is_global = true,
                "const" => is_const = true,
                "list" => is_list = true,
                other => type_elements.push(other.to_string()),
            }
        }

        let type_path = if is_list {
            Some(DreamPath::absolute(&["list"]))
        } else if type_elements.is_empty() {
            None
        } else {
            Some(DreamPath::absolute(&type_elements))
        };

        Self {
            name: path.last_element().unwrap_or_default().to_string(),
            type_path,
            is_global,
            is_const,
            value,
            types,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcStatementKind {
    /// Lone `;`
    Null,
    /// A diagnostic has already been reported for it
    Invalid,
    Expression(Expression),
    VarDeclaration(ProcVarDeclaration),
    /// Several statements declared together, e.g. `var/a, b`
    Aggregate(Vec<ProcStatement>),
    Return(Option<Expression>),
    Break(Option<String>),
    Continue(Option<String>),
    Goto(String),
    Label {
        name: String,
        body: Option<ProcBlock>,
    },
    Del(Expression),
    /// `set name = value` or `set src in view()`
    Set {
        attribute: String,
        value: Expression,
        in_keyword: bool,
    },
    Spawn {
        delay: Expression,
        body: ProcBlock,
    },
    If {
        condition: Expression,
        body: ProcBlock,
        else_body: Option<ProcBlock>,
    },
    /// Any `for` that is not an infinite loop. `init` may be a `VarDecl`,
    /// an `In` binary or an `InRange`.
    For {
        init: Option<Expression>,
        condition: Option<Expression>,
        increment: Option<Expression>,
        types: Option<ValueType>,
        body: ProcBlock,
    },
    /// `for()` and `while(1)`
    InfLoop(ProcBlock),
    While {
        condition: Expression,
        body: ProcBlock,
    },
    DoWhile {
        condition: Expression,
        body: ProcBlock,
    },
    Switch {
        value: Expression,
        cases: Vec<SwitchCase>,
    },
    /// `usr << browse(body, options)`
    Browse {
        receiver: Expression,
        body: Expression,
        options: Expression,
    },
    /// `usr << browse_rsc(file, name)`
    BrowseResource {
        receiver: Expression,
        file: Expression,
        filename: Expression,
    },
    /// `usr << output(message, control)`
    OutputControl {
        receiver: Expression,
        message: Expression,
        control: Expression,
    },
    /// `usr << ftp(file, name)`
    Ftp {
        receiver: Expression,
        file: Expression,
        name: Expression,
    },
    /// `a << b`
    Output {
        receiver: Expression,
        value: Expression,
    },
    /// `a >> b`
    Input {
        source: Expression,
        target: Expression,
    },
    TryCatch {
        try_body: ProcBlock,
        catch_param: Option<Box<ProcStatement>>,
        catch_body: Option<ProcBlock>,
    },
    Throw(Option<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchCase {
    /// `if(1, 2, 3 to 5)`
    Values(Vec<Expression>, ProcBlock),
    /// `else`
    Default(ProcBlock),
}

impl SwitchCase {
    pub fn body(&self) -> &ProcBlock {
        match self {
            SwitchCase::Values(_, body) | SwitchCase::Default(body) => body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Location {
        Location::UNKNOWN
    }

    #[test]
    fn test_proc_definition_split() {
        let def = ProcDefinition::new(loc(), &DreamPath::parse("/mob/proc/final/attack"), vec![], None, None);
        assert_eq!(def.object_path.to_string(), "/mob");
        assert_eq!(def.name, "attack");
        assert!(def.is_final);
        assert!(!def.is_override);

        let verb = ProcDefinition::new(loc(), &DreamPath::parse("/mob/verb/say"), vec![], None, None);
        assert!(verb.is_verb);

        let over = ProcDefinition::new(loc(), &DreamPath::parse("/mob/Login"), vec![], None, None);
        assert!(over.is_override);
        assert_eq!(over.object_path.to_string(), "/mob");

        let global = ProcDefinition::new(loc(), &DreamPath::parse("/proc/helper"), vec![], None, None);
        assert!(global.object_path.is_root());
    }

    #[test]
    fn test_object_var_modifiers() {
        let def = ObjectVarDefinition::new(
            loc(),
            &DreamPath::parse("/mob/var/tmp/const/obj/item/held"),
            Expression::null(loc()),
            ValueType::ANYTHING,
        );
        assert_eq!(def.object_path.to_string(), "/mob");
        assert_eq!(def.name, "held");
        assert_eq!(def.type_path.map(|p| p.to_string()).as_deref(), Some("/obj/item"));
        assert!(def.modifiers.is_tmp && def.modifiers.is_const);
        assert!(!def.modifiers.is_static);

        let global = ObjectVarDefinition::new(
            loc(),
            &DreamPath::parse("/var/list/things"),
            Expression::null(loc()),
            ValueType::ANYTHING,
        );
        assert!(global.modifiers.is_static);
        assert_eq!(global.type_path.map(|p| p.to_string()).as_deref(), Some("/list"));
    }

    #[test]
    fn test_proc_var_declaration() {
        let decl = ProcVarDeclaration::new(&DreamPath::parse("var/static/mob/M"), None, None);
        assert!(decl.is_global);
        assert_eq!(decl.name, "M");
        assert_eq!(decl.type_path.map(|p| p.to_string()).as_deref(), Some("/mob"));

        let param = DefinitionParameter::new(loc(), &DreamPath::parse("var/const/list/L"), None, None, None);
        assert!(param.is_list);
        assert!(param.type_path.is_none());
    }
}
