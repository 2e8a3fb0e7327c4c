//! Expression precedence chain, dereferences and builtin calls
//!
//! Lowest to highest: `in`, assignment, ternary, `||`, `&&`, `|`, `^`,
//! `&`, equality, shifts, relational, additive, multiplicative, `**`,
//! unary prefix/postfix, sign, `new`, dereference and primary.

use super::DmParser;
use crate::frontend::core::lexer::{Lexer, TokenKind};
use crate::frontend::core::parser::ParseResult;
use crate::frontend::dm::ast::{
    AssignOp, BinaryOp, Builtin, CallParameter, Callable, DerefKind, DerefOp, Expression, ExpressionKind, NewTarget,
    PickValue, UnaryOp,
};
use crate::util::diagnostic::WarningCode;

use TokenKind::*;

/// One binary precedence level: its operators and the message used when
/// the right-hand side is missing
struct BinaryLevel {
    operators: &'static [(TokenKind, BinaryOp)],
    missing_rhs: &'static str,
}

/// Left-associative levels, lowest precedence first
const BINARY_LEVELS: &[BinaryLevel] = &[
    BinaryLevel {
        operators: &[(DmBarBar, BinaryOp::Or)],
        missing_rhs: "Expected a second value",
    },
    BinaryLevel {
        operators: &[(DmAndAnd, BinaryOp::And)],
        missing_rhs: "Expected a second value",
    },
    BinaryLevel {
        operators: &[(DmBar, BinaryOp::BitOr)],
        missing_rhs: "Expected an expression",
    },
    BinaryLevel {
        operators: &[(DmXor, BinaryOp::BitXor)],
        missing_rhs: "Expected an expression",
    },
    BinaryLevel {
        operators: &[(DmAnd, BinaryOp::BitAnd)],
        missing_rhs: "Expected an expression",
    },
    BinaryLevel {
        operators: &[
            (DmEqualsEquals, BinaryOp::Equal),
            (DmExclamationEquals, BinaryOp::NotEqual),
            (DmTildeEquals, BinaryOp::Equivalent),
            (DmTildeExclamation, BinaryOp::NotEquivalent),
        ],
        missing_rhs: "Expected an expression to compare to",
    },
    BinaryLevel {
        operators: &[(DmLeftShift, BinaryOp::LeftShift), (DmRightShift, BinaryOp::RightShift)],
        missing_rhs: "Expected an expression",
    },
    BinaryLevel {
        operators: &[
            (DmLessThan, BinaryOp::Less),
            (DmLessThanEquals, BinaryOp::LessEqual),
            (DmGreaterThan, BinaryOp::Greater),
            (DmGreaterThanEquals, BinaryOp::GreaterEqual),
        ],
        missing_rhs: "Expected an expression",
    },
    BinaryLevel {
        operators: &[(DmPlus, BinaryOp::Add), (DmMinus, BinaryOp::Subtract)],
        missing_rhs: "Expected an expression",
    },
    BinaryLevel {
        operators: &[
            (DmStar, BinaryOp::Multiply),
            (DmSlash, BinaryOp::Divide),
            (DmModulus, BinaryOp::Modulus),
            (DmModulusModulus, BinaryOp::ModulusModulus),
        ],
        missing_rhs: "Expected an expression",
    },
];

const ASSIGN_OPERATORS: &[(TokenKind, AssignOp)] = &[
    (DmEquals, AssignOp::Assign),
    (DmPlusEquals, AssignOp::Append),
    (DmMinusEquals, AssignOp::Remove),
    (DmBarEquals, AssignOp::Combine),
    (DmBarBarEquals, AssignOp::LogicalOr),
    (DmAndEquals, AssignOp::Mask),
    (DmAndAndEquals, AssignOp::LogicalAnd),
    (DmStarEquals, AssignOp::Multiply),
    (DmSlashEquals, AssignOp::Divide),
    (DmLeftShiftEquals, AssignOp::LeftShift),
    (DmRightShiftEquals, AssignOp::RightShift),
    (DmXorEquals, AssignOp::Xor),
    (DmModulusEquals, AssignOp::Modulus),
    (DmModulusModulusEquals, AssignOp::ModulusModulus),
    (DmAssignInto, AssignOp::AssignInto),
];

/// Dereference operators that must touch their base
const DEREFERENCE_TOKENS: &[TokenKind] = &[
    DmPeriod,
    DmColon,
    DmDoubleColon,
    DmQuestionPeriod,
    DmQuestionColon,
    DmQuestionLeftBracket,
];

const IDENTIFIER_TOKENS: &[TokenKind] = &[DmIdentifier, DmStep];

impl<L: Lexer> DmParser<L> {
    pub(crate) fn expression(&mut self) -> ParseResult<Option<Expression>> {
        let Some(value) = self.expression_assign()? else {
            return Ok(None);
        };
        let location = self.state.location();
        if !self.state.check(DmIn) {
            return Ok(Some(value));
        }

        self.whitespace();
        let Some(list) = self.expression_assign()? else {
            return Err(self.state.error("Expected a list to check in"));
        };
        self.whitespace();
        if self.state.check(DmTo) {
            let (end, step) = self.expression_to()?;
            let kind = ExpressionKind::InRange {
                value: Box::new(value),
                start: Box::new(list),
                end: Box::new(end),
                step: step.map(Box::new),
            };
            return Ok(Some(Expression::new(location, kind)));
        }
        Ok(Some(Expression::binary(location, BinaryOp::In, value, list)))
    }

    /// `to end [step s]`, after the `to`
    pub(crate) fn expression_to(&mut self) -> ParseResult<(Expression, Option<Expression>)> {
        self.whitespace();
        let Some(end) = self.expression_assign()? else {
            return Err(self.state.error("Missing end range"));
        };
        self.whitespace();

        let mut step = None;
        if self.state.check(DmStep) {
            self.whitespace();
            match self.expression_assign()? {
                Some(value) => step = Some(value),
                None => return Err(self.state.error("Missing step value")),
            }
            self.whitespace();
        }
        Ok((end, step))
    }

    fn expression_assign(&mut self) -> ParseResult<Option<Expression>> {
        let Some(target) = self.expression_ternary(false)? else {
            return Ok(None);
        };

        let current = self.state.current_kind();
        let Some(&(_, op)) = ASSIGN_OPERATORS.iter().find(|(kind, _)| *kind == current) else {
            return Ok(Some(target));
        };
        let location = self.state.bump().location;
        self.whitespace();
        let Some(value) = self.expression_assign()? else {
            return Err(self.state.error("Expected a value"));
        };
        Ok(Some(Expression::assign(location, op, target, value)))
    }

    fn expression_ternary(
        &mut self,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let Some(condition) = self.binary_level(0, ternary_b)? else {
            return Ok(None);
        };
        if !self.state.check(DmQuestion) {
            return Ok(Some(condition));
        }

        self.whitespace();
        let Some(then) = self.expression_ternary(true)? else {
            return Err(self.state.error("Expected an expression"));
        };
        if !self.state.check(DmColon) {
            return Err(self.state.error("Expected ':'"));
        }
        self.whitespace();
        let Some(otherwise) = self.expression_ternary(ternary_b)? else {
            return Err(self.state.error("Expected an expression"));
        };

        let location = condition.location.clone();
        let kind = ExpressionKind::Ternary {
            condition: Box::new(condition),
            then: Box::new(void_to_null(then)),
            otherwise: Box::new(void_to_null(otherwise)),
        };
        Ok(Some(Expression::new(location, kind)))
    }

    fn binary_level(
        &mut self,
        level: usize,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let Some(BinaryLevel { operators, missing_rhs }) = BINARY_LEVELS.get(level) else {
            return self.expression_power(ternary_b);
        };

        let Some(mut lhs) = self.binary_level(level + 1, ternary_b)? else {
            return Ok(None);
        };
        loop {
            let current = self.state.current_kind();
            let Some(&(_, op)) = operators.iter().find(|(kind, _)| *kind == current) else {
                break;
            };
            let location = self.state.bump().location;
            self.whitespace();
            let Some(rhs) = self.binary_level(level + 1, ternary_b)? else {
                return Err(self.state.error(*missing_rhs));
            };
            lhs = Expression::binary(location, op, lhs, rhs);
        }
        Ok(Some(lhs))
    }

    /// `**` is right-associative
    fn expression_power(
        &mut self,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let Some(base) = self.expression_unary(ternary_b)? else {
            return Ok(None);
        };
        let location = self.state.location();
        if !self.state.check(DmStarStar) {
            return Ok(Some(base));
        }
        self.whitespace();
        let Some(exponent) = self.expression_power(ternary_b)? else {
            return Err(self.state.error("Expected an expression"));
        };
        Ok(Some(Expression::binary(location, BinaryOp::Power, base, exponent)))
    }

    fn expression_unary(
        &mut self,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let location = self.state.location();
        let prefix = match self.state.current_kind() {
            DmExclamation => Some(UnaryOp::Not),
            DmTilde => Some(UnaryOp::BitNot),
            DmPlusPlus => Some(UnaryOp::PreIncrement),
            DmMinusMinus => Some(UnaryOp::PreDecrement),
            _ => None,
        };

        if let Some(op) = prefix {
            self.state.advance();
            self.whitespace();
            let operand = match op {
                UnaryOp::Not | UnaryOp::BitNot => self.expression_unary(ternary_b)?,
                _ => self.expression_sign(ternary_b)?,
            };
            let Some(operand) = operand else {
                return Err(self.state.error("Expected an expression"));
            };
            return Ok(Some(Expression::unary(location, op, operand)));
        }

        let Some(operand) = self.expression_sign(ternary_b)? else {
            return Ok(None);
        };
        let postfix = if self.state.check(DmPlusPlus) {
            UnaryOp::PostIncrement
        } else if self.state.check(DmMinusMinus) {
            UnaryOp::PostDecrement
        } else {
            return Ok(Some(operand));
        };
        self.whitespace();
        Ok(Some(Expression::unary(location, postfix, operand)))
    }

    /// Unary `+` and `-`. Negated numeric literals fold into the literal.
    fn expression_sign(
        &mut self,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let location = self.state.location();
        let negate = match self.state.current_kind() {
            DmMinus => true,
            DmPlus => false,
            _ => return self.expression_new(ternary_b),
        };
        self.state.advance();
        self.whitespace();

        let Some(operand) = self.expression_sign(false)? else {
            return Err(self.state.error("Expected an expression"));
        };
        if !negate {
            return Ok(Some(operand));
        }

        let negated = match operand.kind {
            ExpressionKind::Int(value) => Expression::int(location, value.wrapping_neg()),
            ExpressionKind::Float(value) => Expression::new(location, ExpressionKind::Float(-value)),
            kind => Expression::unary(location, UnaryOp::Negate, Expression::new(operand.location, kind)),
        };
        Ok(Some(negated))
    }

    fn expression_new(
        &mut self,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let location = self.state.location();
        if !self.state.check(DmNew) {
            let primary = self.primary(true)?;
            return self.dereference(primary, true, ternary_b);
        }

        self.whitespace();
        let target = self.primary(false)?;
        let target = self.dereference(target, false, false)?;
        let args = self.proc_call()?;

        let target = match target {
            Some(Expression {
                kind: ExpressionKind::Path(path),
                ..
            }) => NewTarget::Path(path),
            Some(expression) => NewTarget::Expression(Box::new(expression)),
            None => NewTarget::Inferred,
        };
        let new = Expression::new(location, ExpressionKind::New { target, args });
        self.dereference(Some(new), true, false)
    }

    fn primary(
        &mut self,
        allow_parentheses: bool,
    ) -> ParseResult<Option<Expression>> {
        let location = self.state.location();

        if allow_parentheses && self.state.check(DmLeftParenthesis) {
            self.bracket_whitespace();
            let inner = self.expression()?;
            self.bracket_whitespace();
            self.consume_right_parenthesis();

            let expression = match inner {
                Some(inner) => Expression::new(inner.location.clone(), ExpressionKind::Wrapped(Box::new(inner))),
                None => Expression::new(location, ExpressionKind::Void),
            };
            return Ok(Some(expression));
        }

        if self.allow_var_decl && self.state.current_kind() == DmVar {
            let Some(declared) = self.path(false) else {
                return Err(self.state.error("Expected a var declaration"));
            };
            return Ok(Some(Expression::new(location, ExpressionKind::VarDecl(declared.path))));
        }

        let mut primary = self.constant()?;
        if primary.is_none() {
            primary = self.path_expression()?;
        }
        if primary.is_none() {
            primary = self.identifier();
        }
        if primary.is_none() {
            primary = self.callable();
        }

        if self.state.check(DmDoubleColon) {
            primary = Some(self.scope_identifier(primary)?);
        }

        if let Some(expression) = primary {
            if allow_parentheses {
                return self.parse_proc_call(expression).map(Some);
            }
            return Ok(Some(expression));
        }

        if self.state.check(DmCall) {
            self.whitespace();
            let target = self.proc_call()?;
            let Some(target) = target.filter(|t| (1..=2).contains(&t.len())) else {
                return Err(self.state.error("Call must have 2 parameters"));
            };
            self.whitespace();
            let Some(args) = self.proc_call()? else {
                return Err(self.state.error("Expected proc parameters"));
            };
            return Ok(Some(Expression::new(location, ExpressionKind::Call { target, args })));
        }

        Ok(None)
    }

    /// Literal values, including strings
    pub(crate) fn constant(&mut self) -> ParseResult<Option<Expression>> {
        let token = self.state.current();
        let location = token.location.clone();
        let kind = match token.kind {
            DmInteger => ExpressionKind::Int(token.as_int().unwrap_or_default()),
            DmFloat => ExpressionKind::Float(token.as_float().unwrap_or_default()),
            DmResource => ExpressionKind::Resource(token.value_or_text().to_string()),
            DmNull => ExpressionKind::Null,
            DmRawString => ExpressionKind::String(token.value_or_text().to_string()),
            DmConstantString | DmStringBegin => return self.string_expression().map(Some),
            _ => return Ok(None),
        };
        self.state.advance();
        Ok(Some(Expression::new(location, kind)))
    }

    /// A constant type path, with any upward searches and a modified-type
    /// block after it
    fn path_expression(&mut self) -> ParseResult<Option<Expression>> {
        let location = self.state.location();
        let Some(parsed) = self.path(true) else {
            return Ok(None);
        };

        let mut expression = Expression::new(location.clone(), ExpressionKind::Path(parsed.path));
        while self.state.check(DmPeriod) {
            let Some(search) = self.path(false) else {
                return Err(self.state.error("Expected a path for an upward search"));
            };
            expression = Expression::new(
                location.clone(),
                ExpressionKind::UpwardPathSearch {
                    path: Box::new(expression),
                    search: search.path,
                },
            );
        }

        self.whitespace();
        if self.state.check(DmLeftCurlyBracket) {
            self.state.emit_at(
                WarningCode::UnimplementedAccess,
                parsed.location,
                "Modified types are currently not supported and modified values will be ignored.",
            );
            self.state.skip_until(&[DmRightCurlyBracket]);
            self.state.consume(DmRightCurlyBracket, "Expected '}'");
            // Only the newline the lexer inserts after `}`
            self.state.check(Newline);
        }
        Ok(Some(expression))
    }

    fn identifier(&mut self) -> Option<Expression> {
        let token = self.state.check_any(IDENTIFIER_TOKENS)?;
        Some(Expression::identifier(token.location, token.text))
    }

    fn callable(&mut self) -> Option<Expression> {
        let location = self.state.location();
        let callable = if self.state.check(DmSuperProc) {
            Callable::Super
        } else if self.state.check(DmPeriod) {
            Callable::SelfProc
        } else {
            return None;
        };
        Some(Expression::new(location, ExpressionKind::Callable(callable)))
    }

    /// `base::name`, after the first `::`. Chains like `a::b::c()` nest.
    fn scope_identifier(
        &mut self,
        mut base: Option<Expression>,
    ) -> ParseResult<Expression> {
        loop {
            let Some(identifier) = self.state.check_any(IDENTIFIER_TOKENS) else {
                let location = self.state.location();
                self.state.emit(WarningCode::BadToken, "Identifier expected");
                return Ok(Expression::null(location));
            };
            let location = base.as_ref().map_or(identifier.location, |b| b.location.clone());
            let call = self.proc_call()?;
            base = Some(Expression::new(
                location.clone(),
                ExpressionKind::ScopeIdentifier {
                    base: base.map(Box::new),
                    identifier: identifier.text,
                    call,
                },
            ));
            if !self.state.check(DmDoubleColon) {
                break;
            }
        }
        Ok(base.unwrap_or_else(|| Expression::null(self.state.location())))
    }

    /// Field, index and call chains after a primary
    fn dereference(
        &mut self,
        expression: Option<Expression>,
        allow_calls: bool,
        ternary_b: bool,
    ) -> ParseResult<Option<Expression>> {
        let expression = match expression {
            Some(expression) if allow_calls => Some(self.parse_proc_call(expression)?),
            other => other,
        };
        let Some(mut expression) = expression else {
            self.whitespace();
            return Ok(None);
        };

        let mut operations: Vec<DerefOp> = Vec::new();
        // In the middle operand of a ternary a `:` ends the chain, except
        // right after a bare identifier
        let mut ternary_b_priority = expression.as_identifier().is_none();

        loop {
            let constant = expression.is_constant();
            let colon_ends_chain = ternary_b && ternary_b_priority;
            let taken = self.state.attempt(|state| {
                if !DEREFERENCE_TOKENS.contains(&state.current_kind()) {
                    state.check(DmWhitespace);
                    if state.current_kind() != DmLeftBracket {
                        return Ok(None);
                    }
                }
                let token = state.bump();
                if token.kind == DmColon
                    && (constant || colon_ends_chain || !IDENTIFIER_TOKENS.contains(&state.current_kind()))
                {
                    return Ok(None);
                }
                Ok(Some(token))
            });
            let Some(token) = taken else {
                self.whitespace();
                break;
            };

            let operation = match token.kind {
                DmPeriod | DmQuestionPeriod | DmColon | DmQuestionColon => {
                    let Some(name) = self.state.check_any(IDENTIFIER_TOKENS) else {
                        self.state
                            .emit_at(WarningCode::BadToken, token.location.clone(), "Identifier expected");
                        return Ok(Some(Expression::null(token.location)));
                    };
                    DerefOp {
                        location: name.location,
                        safe: matches!(token.kind, DmQuestionPeriod | DmQuestionColon),
                        kind: DerefKind::Field {
                            name: name.text,
                            no_search: matches!(token.kind, DmColon | DmQuestionColon),
                        },
                    }
                }
                DmDoubleColon => {
                    if !operations.is_empty() {
                        expression = Expression::new(
                            expression.location.clone(),
                            ExpressionKind::Dereference {
                                base: Box::new(expression),
                                operations: std::mem::take(&mut operations),
                            },
                        );
                    }
                    expression = self.scope_identifier(Some(expression))?;
                    continue;
                }
                _ => {
                    ternary_b_priority = true;
                    self.whitespace();
                    let index = self.expression()?;
                    self.consume_right_bracket();
                    let Some(index) = index else {
                        self.state
                            .emit_at(WarningCode::BadToken, token.location.clone(), "Expression expected");
                        return Ok(Some(Expression::null(token.location)));
                    };
                    DerefOp {
                        location: index.location.clone(),
                        safe: token.kind == DmQuestionLeftBracket,
                        kind: DerefKind::Index(Box::new(index)),
                    }
                }
            };

            let operation = if allow_calls {
                self.whitespace();
                match self.proc_call()? {
                    None => operation,
                    Some(args) => {
                        ternary_b_priority = true;
                        match operation.kind {
                            DerefKind::Field { name, no_search } => DerefOp {
                                location: operation.location,
                                safe: operation.safe,
                                kind: DerefKind::Call { name, no_search, args },
                            },
                            _ => {
                                self.state.emit_at(
                                    WarningCode::BadToken,
                                    token.location.clone(),
                                    "Attempt to call an invalid l-value",
                                );
                                return Ok(Some(Expression::null(token.location)));
                            }
                        }
                    }
                }
            } else {
                operation
            };
            operations.push(operation);
        }

        self.whitespace();
        if operations.is_empty() {
            return Ok(Some(expression));
        }
        Ok(Some(Expression::new(
            expression.location.clone(),
            ExpressionKind::Dereference {
                base: Box::new(expression),
                operations,
            },
        )))
    }

    /// Call syntax after an identifier or callable, including the builtins
    /// that get their own nodes
    fn parse_proc_call(
        &mut self,
        expression: Expression,
    ) -> ParseResult<Expression> {
        if !matches!(expression.kind, ExpressionKind::Identifier(_) | ExpressionKind::Callable(_)) {
            return Ok(expression);
        }
        self.whitespace();

        if expression.as_identifier() == Some("pick") {
            if let Some(values) = self.pick_arguments()? {
                return Ok(Expression::new(expression.location, ExpressionKind::Pick(values)));
            }
        }

        let Some(args) = self.proc_call()? else {
            return Ok(expression);
        };
        let location = expression.location;
        let name = match expression.kind {
            ExpressionKind::Callable(callable) => {
                return Ok(Expression::new(location, ExpressionKind::ProcCall { callable, args }));
            }
            ExpressionKind::Identifier(name) => name,
            kind => return Ok(Expression::new(location, kind)),
        };

        let kind = match name.as_str() {
            "list" => ExpressionKind::List(args),
            "newlist" => ExpressionKind::NewList(args),
            "addtext" => ExpressionKind::AddText(args),
            "gradient" => ExpressionKind::Gradient(args),
            "prob" => {
                if args.len() != 1 {
                    return Err(self.state.error("prob() takes 1 argument"));
                }
                if args[0].key.is_some() {
                    return Err(self.state.error("prob() does not take a named argument"));
                }
                builtin(Builtin::Prob, args)
            }
            "input" => {
                self.whitespace();
                let types = self.as_types(false)?;
                self.whitespace();
                let mut list = None;
                if self.state.check(DmIn) {
                    self.whitespace();
                    list = self.expression()?.map(Box::new);
                }
                ExpressionKind::Input { args, types, list }
            }
            "arctan" => match args.len() {
                1 => builtin(Builtin::Arctan, args),
                2 => builtin(Builtin::Arctan2, args),
                _ => return Err(self.state.error("arctan() requires 1 or 2 arguments")),
            },
            "log" => {
                let mut values = args.into_iter().map(|p| Box::new(p.value));
                match (values.next(), values.next(), values.next()) {
                    (Some(value), None, None) => ExpressionKind::Log { value, base: None },
                    (Some(base), Some(value), None) => ExpressionKind::Log {
                        value,
                        base: Some(base),
                    },
                    _ => return Err(self.state.error("log() requires 1 or 2 arguments")),
                }
            }
            "istype" => match args.len() {
                1 => builtin(Builtin::ImplicitIsType, args),
                2 => builtin(Builtin::IsType, args),
                _ => return Err(self.state.error("istype() requires 1 or 2 arguments")),
            },
            "get_step" | "get_dir" => {
                if args.len() != 2 {
                    return Err(self.state.error(format!("{}() requires exactly 2 arguments", name)));
                }
                let which = if name == "get_step" {
                    Builtin::GetStep
                } else {
                    Builtin::GetDir
                };
                builtin(which, args)
            }
            "text" => return self.text_call(args),
            "locate" => self.locate_call(args)?,
            "rgb" => {
                if !(3..=5).contains(&args.len()) {
                    return Err(self.state.error("Expected 3 to 5 arguments for rgb()"));
                }
                ExpressionKind::Rgb(args)
            }
            other => match Builtin::unary(other) {
                Some(unary) => {
                    if args.len() != 1 {
                        let exactly = if matches!(unary, Builtin::IsNull | Builtin::Length) {
                            "exactly "
                        } else {
                            ""
                        };
                        return Err(self.state.error(format!("{}() requires {}1 argument", other, exactly)));
                    }
                    builtin(unary, args)
                }
                None => ExpressionKind::ProcCall {
                    callable: Callable::Proc(other.to_string()),
                    args,
                },
            },
        };
        Ok(Expression::new(location, kind))
    }

    /// `text("[] and []", a, b)` fills the empty interpolations in order
    fn text_call(
        &mut self,
        args: Vec<CallParameter>,
    ) -> ParseResult<Expression> {
        let mut args = args.into_iter().map(|p| p.value);
        let Some(first) = args.next() else {
            return Err(self.state.error("text() requires at least 1 argument"));
        };
        let rest: Vec<Expression> = args.collect();

        match first.kind {
            ExpressionKind::String(_) => {
                if !rest.is_empty() {
                    return Err(self.state.error("text() expected 1 argument"));
                }
                Ok(first)
            }
            ExpressionKind::StringFormat { value, mut values } => {
                let empty = values.iter().filter(|v| v.is_none()).count();
                if rest.len() != empty {
                    return Err(self
                        .state
                        .error("text() was given an invalid amount of arguments for the string"));
                }
                let mut rest = rest.into_iter();
                for slot in values.iter_mut().filter(|v| v.is_none()) {
                    *slot = rest.next();
                }
                Ok(Expression::new(first.location, ExpressionKind::StringFormat { value, values }))
            }
            _ => Err(self.state.error("text() expected a string as the first argument")),
        }
    }

    /// `locate(type)`, `locate(type) in container`, `locate(type, container)`
    /// or `locate(x, y, z)`
    fn locate_call(
        &mut self,
        args: Vec<CallParameter>,
    ) -> ParseResult<ExpressionKind> {
        if args.len() > 3 {
            return Err(self.state.error("locate() was given too many arguments"));
        }
        let values: Vec<Expression> = args.into_iter().map(|p| p.value).collect();
        let values = match <[Expression; 3]>::try_from(values) {
            Ok([x, y, z]) => {
                return Ok(ExpressionKind::LocateCoordinates {
                    x: Box::new(x),
                    y: Box::new(y),
                    z: Box::new(z),
                });
            }
            Err(values) => values,
        };
        let mut values = values.into_iter().map(Box::new);
        let (first, second) = (values.next(), values.next());

        self.whitespace();
        let mut container = None;
        if self.state.check(DmIn) {
            self.whitespace();
            let Some(value) = self.expression()? else {
                return Err(self.state.error("Expected a container for locate()"));
            };
            container = Some(Box::new(value));
        }
        if second.is_some() {
            container = second;
        }
        Ok(ExpressionKind::Locate {
            target: first,
            container,
        })
    }

    /// `( args )`, or `None` when there is no opening parenthesis
    pub(crate) fn proc_call(&mut self) -> ParseResult<Option<Vec<CallParameter>>> {
        if !self.state.check(DmLeftParenthesis) {
            return Ok(None);
        }
        self.bracket_whitespace();
        let args = self.call_parameters()?;
        self.bracket_whitespace();
        self.consume_right_parenthesis();
        Ok(Some(args))
    }

    /// Comma-separated arguments. An empty slot between commas is `null`.
    pub(crate) fn call_parameters(&mut self) -> ParseResult<Vec<CallParameter>> {
        let mut parameters = Vec::new();
        let mut parameter = self.call_parameter()?;
        self.bracket_whitespace();

        while self.state.check(DmComma) {
            self.bracket_whitespace();
            let location = self.state.location();
            parameters.push(
                parameter.unwrap_or_else(|| CallParameter::positional(Expression::null(location))),
            );
            parameter = self.call_parameter()?;
            self.bracket_whitespace();
        }
        parameters.extend(parameter);
        Ok(parameters)
    }

    /// `value`, or `key = value` where a bare identifier key is a string
    fn call_parameter(&mut self) -> ParseResult<Option<CallParameter>> {
        let Some(expression) = self.expression()? else {
            return Ok(None);
        };

        let (target, value) = match expression.kind {
            ExpressionKind::Assign {
                op: AssignOp::Assign,
                target,
                value,
            } => (target, value),
            kind => {
                return Ok(Some(CallParameter::positional(Expression::new(expression.location, kind))));
            }
        };

        let key = match target.kind {
            ExpressionKind::Identifier(name) => Expression::string(target.location, name),
            ExpressionKind::Null => Expression::string(target.location, "null"),
            kind => Expression::new(target.location, kind),
        };
        Ok(Some(CallParameter {
            location: expression.location,
            key: Some(key),
            value: *value,
        }))
    }

    /// `pick(a, b)` or weighted `pick(10; a, 20; b)`
    fn pick_arguments(&mut self) -> ParseResult<Option<Vec<PickValue>>> {
        if !self.state.check(DmLeftParenthesis) {
            return Ok(None);
        }
        self.bracket_whitespace();

        let Some(first) = self.pick_argument()? else {
            return Err(self.state.error("Expected a pick argument"));
        };
        let mut values = vec![first];
        while self.state.check(DmComma) {
            self.bracket_whitespace();
            match self.pick_argument()? {
                Some(value) => values.push(value),
                // A trailing comma is fine if the call closes right after it
                None if self.state.current_kind() == DmRightParenthesis => {}
                None => return Err(self.state.error("Expected a pick argument")),
            }
        }

        self.bracket_whitespace();
        self.consume_right_parenthesis();
        Ok(Some(values))
    }

    fn pick_argument(&mut self) -> ParseResult<Option<PickValue>> {
        let expression = self.expression()?;
        if self.state.check(DmSemicolon) {
            self.whitespace();
            let Some(value) = self.expression()? else {
                return Err(self.state.error("Expected an expression"));
            };
            return Ok(Some(PickValue {
                weight: expression,
                value,
            }));
        }
        Ok(expression.map(|value| PickValue { weight: None, value }))
    }
}

fn builtin(
    builtin: Builtin,
    args: Vec<CallParameter>,
) -> ExpressionKind {
    ExpressionKind::Builtin {
        builtin,
        args: args.into_iter().map(|p| p.value).collect(),
    }
}

/// `()` as a ternary operand means null
fn void_to_null(expression: Expression) -> Expression {
    match expression.kind {
        ExpressionKind::Void => Expression::null(expression.location),
        _ => expression,
    }
}
