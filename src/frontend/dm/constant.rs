//! Compile-time constants
//!
//! [`Constant::fold`] evaluates the expressions that may initialize a var or
//! a map override without running any code. The artifact stores those
//! values as JSON; see [`Constant::to_json`].

use serde_json::{json, Value};

use crate::frontend::dm::ast::{BinaryOp, Expression, ExpressionKind, UnaryOp};
use crate::frontend::dm::path::DreamPath;

/// Tag of a non-primitive JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JsonVariableType {
    Resource = 0,
    Type = 1,
    Proc = 2,
    List = 3,
    PositiveInfinity = 4,
    NegativeInfinity = 5,
}

/// A folded value
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Num(f32),
    Str(String),
    Resource(String),
    Path(DreamPath),
    /// Entries with an optional association key
    List(Vec<(Option<Constant>, Constant)>),
}

impl Constant {
    /// Fold `expr`, or `None` when it needs runtime evaluation
    pub fn fold(expr: &Expression) -> Option<Constant> {
        let value = match &expr.kind {
            ExpressionKind::Null => Constant::Null,
            ExpressionKind::Int(v) => Constant::Num(*v as f32),
            ExpressionKind::Float(v) => Constant::Num(*v),
            ExpressionKind::String(v) => Constant::Str(v.clone()),
            ExpressionKind::Resource(v) => Constant::Resource(v.clone()),
            ExpressionKind::Path(path) => Constant::Path(path.clone()),
            ExpressionKind::Wrapped(inner) => return Constant::fold(inner),
            ExpressionKind::List(values) => {
                let mut entries = Vec::with_capacity(values.len());
                for param in values {
                    let key = match &param.key {
                        Some(key) => Some(Constant::fold(key)?),
                        None => None,
                    };
                    entries.push((key, Constant::fold(&param.value)?));
                }
                Constant::List(entries)
            }
            ExpressionKind::Unary { op, operand } => {
                let operand = Constant::fold(operand)?;
                match (op, operand) {
                    (UnaryOp::Negate, Constant::Num(v)) => Constant::Num(-v),
                    (UnaryOp::BitNot, Constant::Num(v)) => Constant::Num(!(v as i32) as f32),
                    (UnaryOp::Not, value) => Constant::Num(if value.is_truthy() { 0.0 } else { 1.0 }),
                    _ => return None,
                }
            }
            ExpressionKind::Binary { op, lhs, rhs } => {
                return Constant::fold(lhs)?.binary(*op, Constant::fold(rhs)?);
            }
            ExpressionKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                return if Constant::fold(condition)?.is_truthy() {
                    Constant::fold(then)
                } else {
                    Constant::fold(otherwise)
                };
            }
            _ => return None,
        };
        Some(value)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Constant::Null => false,
            Constant::Num(v) => *v != 0.0,
            Constant::Str(v) => !v.is_empty(),
            Constant::Resource(_) | Constant::Path(_) | Constant::List(_) => true,
        }
    }

    fn binary(
        self,
        op: BinaryOp,
        rhs: Constant,
    ) -> Option<Constant> {
        use Constant::*;

        let value = match (self, rhs) {
            (Str(a), Str(b)) if op == BinaryOp::Add => Str(a + &b),
            (Num(a), Num(b)) => {
                let (ia, ib) = (a as i32, b as i32);
                let num = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                    BinaryOp::Modulus => (ia % ib.max(1)) as f32,
                    BinaryOp::Power => a.powf(b),
                    BinaryOp::LeftShift => ia.wrapping_shl(ib as u32) as f32,
                    BinaryOp::RightShift => ia.wrapping_shr(ib as u32) as f32,
                    BinaryOp::BitAnd => (ia & ib) as f32,
                    BinaryOp::BitOr => (ia | ib) as f32,
                    BinaryOp::BitXor => (ia ^ ib) as f32,
                    BinaryOp::Equal | BinaryOp::Equivalent => bool_num(a == b),
                    BinaryOp::NotEqual | BinaryOp::NotEquivalent => bool_num(a != b),
                    BinaryOp::Less => bool_num(a < b),
                    BinaryOp::LessEqual => bool_num(a <= b),
                    BinaryOp::Greater => bool_num(a > b),
                    BinaryOp::GreaterEqual => bool_num(a >= b),
                    _ => return None,
                };
                Num(num)
            }
            (a, b) => match op {
                BinaryOp::And => {
                    if a.is_truthy() {
                        b
                    } else {
                        a
                    }
                }
                BinaryOp::Or => {
                    if a.is_truthy() {
                        a
                    } else {
                        b
                    }
                }
                _ => return None,
            },
        };
        Some(value)
    }

    /// JSON form stored in the artifact. `type_id` resolves paths to type
    /// indices; unresolved paths are stored as text.
    pub fn to_json(
        &self,
        type_id: &dyn Fn(&DreamPath) -> Option<i32>,
    ) -> Value {
        match self {
            Constant::Null => Value::Null,
            Constant::Num(v) if v.is_infinite() => {
                let tag = if *v > 0.0 {
                    JsonVariableType::PositiveInfinity
                } else {
                    JsonVariableType::NegativeInfinity
                };
                json!({ "type": tag as u8 })
            }
            Constant::Num(v) => json!(v),
            Constant::Str(v) => json!(v),
            Constant::Resource(path) => json!({
                "type": JsonVariableType::Resource as u8,
                "resourcePath": path,
            }),
            Constant::Path(path) => {
                let value = match type_id(path) {
                    Some(id) => json!(id),
                    None => json!(path.to_string()),
                };
                json!({ "type": JsonVariableType::Type as u8, "value": value })
            }
            Constant::List(entries) => {
                let values: Vec<Value> = entries
                    .iter()
                    .map(|(key, value)| match key {
                        Some(key) => json!({
                            "key": key.to_json(type_id),
                            "value": value.to_json(type_id),
                        }),
                        None => value.to_json(type_id),
                    })
                    .collect();
                json!({ "type": JsonVariableType::List as u8, "values": values })
            }
        }
    }
}

fn bool_num(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::span::Location;

    fn int(v: i32) -> Expression {
        Expression::new(Location::UNKNOWN, ExpressionKind::Int(v))
    }

    fn binary(
        op: BinaryOp,
        lhs: Expression,
        rhs: Expression,
    ) -> Expression {
        Expression::new(
            Location::UNKNOWN,
            ExpressionKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        )
    }

    #[test]
    fn test_fold_arithmetic() {
        let expr = binary(BinaryOp::Add, int(1), binary(BinaryOp::LeftShift, int(1), int(4)));
        assert_eq!(Constant::fold(&expr), Some(Constant::Num(17.0)));
    }

    #[test]
    fn test_identifiers_do_not_fold() {
        let name = Expression::new(Location::UNKNOWN, ExpressionKind::Identifier("x".into()));
        assert_eq!(Constant::fold(&binary(BinaryOp::Add, int(1), name)), None);
    }

    #[test]
    fn test_json_forms() {
        let unresolved = |_: &DreamPath| None;
        assert_eq!(Constant::Num(2.0).to_json(&unresolved), json!(2.0));
        assert_eq!(
            Constant::Path(DreamPath::absolute(&["obj"])).to_json(&|_| Some(7)),
            json!({ "type": 1, "value": 7 })
        );
        assert_eq!(
            Constant::Num(f32::INFINITY).to_json(&unresolved),
            json!({ "type": 4 })
        );
        let list = Constant::List(vec![(Some(Constant::Str("a".into())), Constant::Null)]);
        assert_eq!(
            list.to_json(&unresolved),
            json!({ "type": 3, "values": [{ "key": "a", "value": null }] })
        );
    }
}
