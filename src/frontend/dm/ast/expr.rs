//! Expression nodes

use std::fmt;

use super::ValueType;
use crate::frontend::dm::path::DreamPath;
use crate::util::span::Location;

/// An expression with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub location: Location,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Placeholder for something that failed to parse
    Invalid,
    /// `()`
    Void,
    Null,
    Int(i32),
    Float(f32),
    String(String),
    /// `'icon.dmi'`
    Resource(String),
    /// A constant type path, e.g. `/obj/item`
    Path(DreamPath),
    /// `/obj.foo`: the nearest type above `/obj` with a child `foo`
    UpwardPathSearch {
        path: Box<Expression>,
        search: DreamPath,
    },
    Identifier(String),
    /// `.` or `..` used as a value
    Callable(Callable),
    /// Text with interpolation markers, one per entry of `values`.
    /// A `None` value is an empty `[]`, only valid as the argument of `text()`.
    StringFormat {
        value: String,
        values: Vec<Option<Expression>>,
    },
    List(Vec<CallParameter>),
    NewList(Vec<CallParameter>),
    AddText(Vec<CallParameter>),
    /// Sizes of `var/list/L[1][2]`
    DimensionalList(Vec<Expression>),
    Input {
        args: Vec<CallParameter>,
        types: Option<ValueType>,
        list: Option<Box<Expression>>,
    },
    Locate {
        target: Option<Box<Expression>>,
        container: Option<Box<Expression>>,
    },
    LocateCoordinates {
        x: Box<Expression>,
        y: Box<Expression>,
        z: Box<Expression>,
    },
    Gradient(Vec<CallParameter>),
    Rgb(Vec<CallParameter>),
    Pick(Vec<PickValue>),
    /// `call(a, b)(args)`
    Call {
        target: Vec<CallParameter>,
        args: Vec<CallParameter>,
    },
    /// `var/x` inside a `for` header
    VarDecl(DreamPath),
    New {
        target: NewTarget,
        args: Option<Vec<CallParameter>>,
    },
    Ternary {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
    /// `x in a to b step c`
    InRange {
        value: Box<Expression>,
        start: Box<Expression>,
        end: Box<Expression>,
        step: Option<Box<Expression>>,
    },
    /// `a to b` inside a switch case
    SwitchRange {
        start: Box<Expression>,
        end: Box<Expression>,
    },
    ProcCall {
        callable: Callable,
        args: Vec<CallParameter>,
    },
    /// `a.b[c].d()`: one base and at least one operation
    Dereference {
        base: Box<Expression>,
        operations: Vec<DerefOp>,
    },
    /// `base::name` or `::name`, optionally called
    ScopeIdentifier {
        base: Option<Box<Expression>>,
        identifier: String,
        call: Option<Vec<CallParameter>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expression>,
        value: Box<Expression>,
    },
    /// Builtins the parser recognizes by name, e.g. `sin(x)`, `istype(a, b)`
    Builtin {
        builtin: Builtin,
        args: Vec<Expression>,
    },
    /// `log(x)` or `log(base, x)`
    Log {
        value: Box<Expression>,
        base: Option<Box<Expression>>,
    },
    /// Parenthesized expression
    Wrapped(Box<Expression>),
}

/// Target of a bare call
#[derive(Debug, Clone, PartialEq)]
pub enum Callable {
    /// `foo()`
    Proc(String),
    /// `..()`
    Super,
    /// `.` and `.()`
    SelfProc,
}

/// What a `new` creates
#[derive(Debug, Clone, PartialEq)]
pub enum NewTarget {
    Path(DreamPath),
    Expression(Box<Expression>),
    /// `new()`: the type comes from the assignment target
    Inferred,
}

/// One link of a dereference chain
#[derive(Debug, Clone, PartialEq)]
pub struct DerefOp {
    pub location: Location,
    /// `?.`, `?:` and `?[` short-circuit on null
    pub safe: bool,
    pub kind: DerefKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DerefKind {
    /// `.name`; `no_search` for `:name`
    Field {
        name: String,
        no_search: bool,
    },
    Index(Box<Expression>),
    Call {
        name: String,
        no_search: bool,
        args: Vec<CallParameter>,
    },
}

/// One argument of a call or list, optionally keyed (`key = value`)
#[derive(Debug, Clone, PartialEq)]
pub struct CallParameter {
    pub location: Location,
    pub key: Option<Expression>,
    pub value: Expression,
}

impl CallParameter {
    pub fn positional(value: Expression) -> Self {
        Self {
            location: value.location.clone(),
            key: None,
            value,
        }
    }
}

/// `pick(weight; value, ...)` entry
#[derive(Debug, Clone, PartialEq)]
pub struct PickValue {
    pub weight: Option<Expression>,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    ModulusModulus,
    Power,
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LeftShift,
    RightShift,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    /// `x in list`
    In,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
            BinaryOp::ModulusModulus => "%%",
            BinaryOp::Power => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Equivalent => "~=",
            BinaryOp::NotEquivalent => "~!",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    AssignInto,
    /// `+=`
    Append,
    /// `-=`
    Remove,
    /// `|=`
    Combine,
    /// `&=`
    Mask,
    LogicalAnd,
    LogicalOr,
    Multiply,
    Divide,
    LeftShift,
    RightShift,
    Xor,
    Modulus,
    ModulusModulus,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AssignInto => ":=",
            AssignOp::Append => "+=",
            AssignOp::Remove => "-=",
            AssignOp::Combine => "|=",
            AssignOp::Mask => "&=",
            AssignOp::LogicalAnd => "&&=",
            AssignOp::LogicalOr => "||=",
            AssignOp::Multiply => "*=",
            AssignOp::Divide => "/=",
            AssignOp::LeftShift => "<<=",
            AssignOp::RightShift => ">>=",
            AssignOp::Xor => "^=",
            AssignOp::Modulus => "%=",
            AssignOp::ModulusModulus => "%%=",
        }
    }
}

/// Builtin procs that get their own node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Prob,
    Initial,
    Nameof,
    IsSaved,
    Sin,
    Cos,
    Tan,
    Arcsin,
    Arccos,
    Arctan,
    Arctan2,
    Sqrt,
    Abs,
    /// `istype(x)`, the type comes from the declaration of `x`
    ImplicitIsType,
    IsType,
    IsNull,
    GetStep,
    GetDir,
    Length,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Prob => "prob",
            Builtin::Initial => "initial",
            Builtin::Nameof => "nameof",
            Builtin::IsSaved => "issaved",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Arcsin => "arcsin",
            Builtin::Arccos => "arccos",
            Builtin::Arctan | Builtin::Arctan2 => "arctan",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::ImplicitIsType | Builtin::IsType => "istype",
            Builtin::IsNull => "isnull",
            Builtin::GetStep => "get_step",
            Builtin::GetDir => "get_dir",
            Builtin::Length => "length",
        }
    }

    /// Single-argument builtin named `name`
    pub fn unary(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "initial" => Builtin::Initial,
            "nameof" => Builtin::Nameof,
            "issaved" => Builtin::IsSaved,
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "tan" => Builtin::Tan,
            "arcsin" => Builtin::Arcsin,
            "arccos" => Builtin::Arccos,
            "sqrt" => Builtin::Sqrt,
            "abs" => Builtin::Abs,
            "isnull" => Builtin::IsNull,
            "length" => Builtin::Length,
            _ => return None,
        };
        Some(builtin)
    }
}

impl Expression {
    pub fn new(
        location: Location,
        kind: ExpressionKind,
    ) -> Self {
        Self { location, kind }
    }

    pub fn null(location: Location) -> Self {
        Self::new(location, ExpressionKind::Null)
    }

    pub fn invalid(location: Location) -> Self {
        Self::new(location, ExpressionKind::Invalid)
    }

    pub fn int(
        location: Location,
        value: i32,
    ) -> Self {
        Self::new(location, ExpressionKind::Int(value))
    }

    pub fn string(
        location: Location,
        value: impl Into<String>,
    ) -> Self {
        Self::new(location, ExpressionKind::String(value.into()))
    }

    pub fn identifier(
        location: Location,
        name: impl Into<String>,
    ) -> Self {
        Self::new(location, ExpressionKind::Identifier(name.into()))
    }

    pub fn binary(
        location: Location,
        op: BinaryOp,
        lhs: Expression,
        rhs: Expression,
    ) -> Self {
        Self::new(
            location,
            ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    pub fn assign(
        location: Location,
        op: AssignOp,
        target: Expression,
        value: Expression,
    ) -> Self {
        Self::new(
            location,
            ExpressionKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
        )
    }

    pub fn unary(
        location: Location,
        op: UnaryOp,
        operand: Expression,
    ) -> Self {
        Self::new(
            location,
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
        )
    }

    /// The expression inside any number of parentheses
    pub fn unwrapped(&self) -> &Expression {
        let mut expr = self;
        while let ExpressionKind::Wrapped(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Literal known at parse time
    pub fn is_constant(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Null
                | ExpressionKind::Int(_)
                | ExpressionKind::Float(_)
                | ExpressionKind::String(_)
                | ExpressionKind::Resource(_)
                | ExpressionKind::Path(_)
                | ExpressionKind::UpwardPathSearch { .. }
        )
    }

    /// True for `list(...)` whose keys and values are all constants
    pub fn is_constant_list(&self) -> bool {
        match &self.kind {
            ExpressionKind::List(values) => values.iter().all(|p| {
                p.key.as_ref().map_or(true, Expression::is_constant)
                    && (p.value.is_constant() || p.value.is_constant_list())
            }),
            _ => false,
        }
    }

    /// Short node name for printers and messages
    pub fn describe(&self) -> String {
        match &self.kind {
            ExpressionKind::Invalid => "Invalid".to_string(),
            ExpressionKind::Void => "Void".to_string(),
            ExpressionKind::Null => "Null".to_string(),
            ExpressionKind::Int(v) => format!("Int {}", v),
            ExpressionKind::Float(v) => format!("Float {}", v),
            ExpressionKind::String(s) => format!("String {:?}", s),
            ExpressionKind::Resource(s) => format!("Resource '{}'", s),
            ExpressionKind::Path(p) => format!("Path {}", p),
            ExpressionKind::UpwardPathSearch { search, .. } => format!("UpwardPathSearch .{}", search),
            ExpressionKind::Identifier(name) => format!("Identifier {}", name),
            ExpressionKind::Callable(c) => format!("Callable {}", c),
            ExpressionKind::StringFormat { values, .. } => format!("StringFormat ({} values)", values.len()),
            ExpressionKind::List(_) => "List".to_string(),
            ExpressionKind::NewList(_) => "NewList".to_string(),
            ExpressionKind::AddText(_) => "AddText".to_string(),
            ExpressionKind::DimensionalList(_) => "DimensionalList".to_string(),
            ExpressionKind::Input { .. } => "Input".to_string(),
            ExpressionKind::Locate { .. } => "Locate".to_string(),
            ExpressionKind::LocateCoordinates { .. } => "LocateCoordinates".to_string(),
            ExpressionKind::Gradient(_) => "Gradient".to_string(),
            ExpressionKind::Rgb(_) => "Rgb".to_string(),
            ExpressionKind::Pick(_) => "Pick".to_string(),
            ExpressionKind::Call { .. } => "Call".to_string(),
            ExpressionKind::VarDecl(p) => format!("VarDecl {}", p),
            ExpressionKind::New { target, .. } => match target {
                NewTarget::Path(p) => format!("New {}", p),
                NewTarget::Expression(_) => "New".to_string(),
                NewTarget::Inferred => "New (inferred)".to_string(),
            },
            ExpressionKind::Ternary { .. } => "Ternary".to_string(),
            ExpressionKind::InRange { .. } => "InRange".to_string(),
            ExpressionKind::SwitchRange { .. } => "SwitchRange".to_string(),
            ExpressionKind::ProcCall { callable, .. } => format!("ProcCall {}", callable),
            ExpressionKind::Dereference { operations, .. } => {
                let chain: Vec<String> = operations.iter().map(DerefOp::to_string).collect();
                format!("Dereference {}", chain.join(""))
            }
            ExpressionKind::ScopeIdentifier { identifier, .. } => format!("ScopeIdentifier ::{}", identifier),
            ExpressionKind::Unary { op, .. } => format!("Unary {:?}", op),
            ExpressionKind::Binary { op, .. } => format!("Binary {}", op.symbol()),
            ExpressionKind::Assign { op, .. } => format!("Assign {}", op.symbol()),
            ExpressionKind::Builtin { builtin, .. } => format!("Builtin {}", builtin.name()),
            ExpressionKind::Log { .. } => "Log".to_string(),
            ExpressionKind::Wrapped(_) => "Wrapped".to_string(),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Callable::Proc(name) => f.write_str(name),
            Callable::Super => f.write_str(".."),
            Callable::SelfProc => f.write_str("."),
        }
    }
}

impl fmt::Display for DerefOp {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let safe = if self.safe { "?" } else { "" };
        match &self.kind {
            DerefKind::Field { name, no_search } => {
                write!(f, "{}{}{}", safe, if *no_search { ":" } else { "." }, name)
            }
            DerefKind::Index(_) => write!(f, "{}[]", safe),
            DerefKind::Call { name, no_search, .. } => {
                write!(f, "{}{}{}()", safe, if *no_search { ":" } else { "." }, name)
            }
        }
    }
}
