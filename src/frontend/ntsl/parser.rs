//! NTSL recursive-descent parser
//!
//! ```text
//! def main() { $x = 1; return $x + 1; }
//! ```
//!
//! Functions become ordinary [`ProcDefinition`]s on the root type, `$name`
//! becomes an identifier and `vector()`/`at()` map onto list expressions.

use indexmap::IndexSet;

use crate::frontend::core::lexer::{Lexer, TokenKind};
use crate::frontend::core::parser::ParserState;
use crate::frontend::dm::ast::{
    AssignOp, BinaryOp, CallParameter, Callable, DerefKind, DerefOp, Expression, ExpressionKind, ProcBlock, ProcDefinition,
    ProcStatement, ProcStatementKind,
};
use crate::frontend::dm::DreamPath;
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;

use TokenKind::*;

/// A parsed script
#[derive(Debug, Clone, PartialEq)]
pub struct NtslFile {
    pub location: Location,
    pub procs: Vec<NtslProc>,
}

impl NtslFile {
    /// Every script variable referenced anywhere in the file
    pub fn used_vars(&self) -> IndexSet<String> {
        self.procs
            .iter()
            .flat_map(|p| p.used_vars.iter().cloned())
            .collect()
    }
}

/// A function with the script variables it references
#[derive(Debug, Clone, PartialEq)]
pub struct NtslProc {
    pub definition: ProcDefinition,
    pub used_vars: IndexSet<String>,
}

pub struct NtslParser<L: Lexer> {
    state: ParserState<L>,
    /// `$` variables seen in the function being parsed
    used_vars: IndexSet<String>,
}

impl<L: Lexer> NtslParser<L> {
    pub fn new(
        lexer: L,
        sink: DiagnosticSink,
    ) -> Self {
        Self {
            state: ParserState::new(lexer, sink),
            used_vars: IndexSet::new(),
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.state.current_kind(), NtslEndFile | EndOfFile)
    }

    pub fn parse_file(&mut self) -> NtslFile {
        let location = self.state.location();
        let mut procs = Vec::new();

        while !self.at_end() {
            match self.proc_definition() {
                Some(definition) => procs.push(definition),
                None => {
                    let kind = self.state.current_kind();
                    self.state
                        .emit(WarningCode::BadToken, format!("Unexpected token {}", kind));
                    break;
                }
            }
        }

        NtslFile { location, procs }
    }

    /// `def name() { ... }`
    fn proc_definition(&mut self) -> Option<NtslProc> {
        let def = self.state.check_any(&[NtslDef])?;
        let Some(name) = self.state.check_any(&[NtslIdentifier]) else {
            self.state
                .emit(WarningCode::BadToken, "Expected an identifier to name the function");
            return None;
        };
        if !self.state.check(NtslLeftParenthesis) {
            self.state
                .emit(WarningCode::BadToken, "Expected a '(' for function arguments");
            return None;
        }
        if !self.state.check(NtslRightParenthesis) {
            self.state
                .emit(WarningCode::BadToken, "Expected a ')' to end function arguments");
            return None;
        }

        self.used_vars.clear();
        let body_location = self.state.location();
        let Some(statements) = self.code_block() else {
            self.state
                .emit(WarningCode::MissingBody, "Expected a function body");
            return None;
        };

        let path = DreamPath::absolute(&["proc", name.text.as_str()]);
        let body = ProcBlock::new(body_location, statements);
        Some(NtslProc {
            definition: ProcDefinition::new(def.location, &path, Vec::new(), Some(body), None),
            used_vars: std::mem::take(&mut self.used_vars),
        })
    }

    /// `{ statement; ... }`
    fn code_block(&mut self) -> Option<Vec<ProcStatement>> {
        if !self.state.check(NtslLeftCurlyBracket) {
            return None;
        }

        let mut statements = Vec::new();
        while let Some(statement) = self.statement() {
            statements.push(statement);
            if !self.state.check(NtslSemicolon) {
                self.state
                    .emit(WarningCode::BadToken, "Expected ';' to end statement");
                break;
            }
        }

        if !self.state.check(NtslRightCurlyBracket) {
            self.state
                .emit(WarningCode::BadToken, "Expected '}' to end code block");
        }
        Some(statements)
    }

    fn statement(&mut self) -> Option<ProcStatement> {
        if let Some(keyword) = self.state.check_any(&[NtslReturn]) {
            let value = match self.expression() {
                Some(value) => value,
                None => {
                    self.state
                        .emit(WarningCode::MissingExpression, "Expected a value to return");
                    Expression::invalid(self.state.location())
                }
            };
            return Some(ProcStatement::new(
                keyword.location,
                ProcStatementKind::Return(Some(value)),
            ));
        }

        let expression = self.expression()?;
        Some(ProcStatement::new(
            expression.location.clone(),
            ProcStatementKind::Expression(expression),
        ))
    }

    fn expression(&mut self) -> Option<Expression> {
        self.expression_assign()
    }

    /// `a = b`, right-associative
    fn expression_assign(&mut self) -> Option<Expression> {
        let expression = self.expression_add()?;
        if !self.state.check(NtslEquals) {
            return Some(expression);
        }

        match self.expression_assign() {
            Some(value) => Some(Expression::assign(
                expression.location.clone(),
                AssignOp::Assign,
                expression,
                value,
            )),
            None => {
                self.state
                    .emit(WarningCode::BadExpression, "Expected a value to assign");
                Some(expression)
            }
        }
    }

    /// `a + b + c`
    fn expression_add(&mut self) -> Option<Expression> {
        let mut expression = self.primary()?;
        while self.state.check(NtslAdd) {
            let Some(rhs) = self.primary() else {
                self.state
                    .emit(WarningCode::BadExpression, "Expected a value to add");
                break;
            };
            expression = Expression::binary(expression.location.clone(), BinaryOp::Add, expression, rhs);
        }
        Some(expression)
    }

    fn primary(&mut self) -> Option<Expression> {
        let token = self.state.current().clone();
        match token.kind {
            NtslString => {
                self.state.advance();
                let value = token.value_or_text().to_string();
                Some(Expression::string(token.location, value))
            }
            NtslNumber => {
                self.state.advance();
                let value = token.as_float().unwrap_or_default();
                Some(Expression::new(token.location, ExpressionKind::Float(value)))
            }
            NtslVarIdentifierPrefix => {
                self.state.advance();
                let Some(name) = self.state.check_any(&[NtslIdentifier]) else {
                    self.state
                        .emit(WarningCode::BadToken, "Expected a var identifier");
                    return Some(Expression::invalid(token.location));
                };
                self.used_vars.insert(name.text.clone());
                Some(Expression::identifier(token.location, name.text))
            }
            // A name without `$` is a function
            NtslIdentifier => {
                self.state.advance();
                self.call(token.location, token.text)
            }
            _ => None,
        }
    }

    /// `name(args)`; the name is consumed
    fn call(
        &mut self,
        location: Location,
        name: String,
    ) -> Option<Expression> {
        if !self.state.check(NtslLeftParenthesis) {
            self.state
                .emit(WarningCode::BadToken, "Expected function call arguments");
            return None;
        }

        let mut args = Vec::new();
        while let Some(argument) = self.primary() {
            args.push(CallParameter::positional(argument));
            if !self.state.check(NtslComma) {
                break;
            }
        }

        if !self.state.check(NtslRightParenthesis) {
            self.state
                .emit(WarningCode::BadToken, "Expected ')' to end function call arguments");
            return None;
        }

        let kind = match name.as_str() {
            "vector" => ExpressionKind::List(args),
            "at" => return Some(self.at_call(location, args)),
            _ => ExpressionKind::ProcCall {
                callable: Callable::Proc(name),
                args,
            },
        };
        Some(Expression::new(location, kind))
    }

    /// `at(vector, index)` reads an element, `at(vector, index, value)` sets it
    fn at_call(
        &mut self,
        location: Location,
        args: Vec<CallParameter>,
    ) -> Expression {
        if !matches!(args.len(), 2 | 3) {
            self.state.emit_at(
                WarningCode::BadExpression,
                location.clone(),
                "at() required 2 or 3 arguments",
            );
            return Expression::invalid(location);
        }

        let mut args = args.into_iter().map(|a| a.value);
        let (Some(vector), Some(index)) = (args.next(), args.next()) else {
            return Expression::invalid(location);
        };
        let deref = Expression::new(
            location.clone(),
            ExpressionKind::Dereference {
                base: Box::new(vector),
                operations: vec![DerefOp {
                    location: index.location.clone(),
                    safe: false,
                    kind: DerefKind::Index(Box::new(index)),
                }],
            },
        );

        match args.next() {
            Some(value) => Expression::assign(location, AssignOp::Assign, deref, value),
            None => deref,
        }
    }
}
