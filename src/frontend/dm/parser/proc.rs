//! Proc bodies and proc statements

use super::DmParser;
use crate::frontend::core::lexer::{Lexer, TokenKind};
use crate::frontend::core::parser::ParseResult;
use crate::frontend::dm::ast::{
    BinaryOp, CallParameter, Callable, Expression, ExpressionKind, ProcBlock, ProcStatement, ProcStatementKind,
    ProcVarDeclaration, SwitchCase,
};
use crate::frontend::dm::path::DreamPath;
use crate::util::diagnostic::WarningCode;
use crate::util::span::Location;

use TokenKind::*;

const FOR_SEPARATORS: &[TokenKind] = &[DmSemicolon, DmComma];

impl<L: Lexer> DmParser<L> {
    /// A braced or indented proc body. Nothing is consumed when there is
    /// none.
    pub(crate) fn proc_block(&mut self) -> ParseResult<Option<ProcBlock>> {
        let checkpoint = self.state.checkpoint();
        self.newline();
        let result = match self.braced_proc_block() {
            Ok(None) => self.indented_proc_block(),
            other => other,
        };
        match result {
            Ok(None) => self.state.rollback(checkpoint),
            _ => self.state.commit(checkpoint),
        }
        result
    }

    fn braced_proc_block(&mut self) -> ParseResult<Option<ProcBlock>> {
        let location = self.state.location();
        if !self.state.check(DmLeftCurlyBracket) {
            return Ok(None);
        }
        self.whitespace();
        self.newline();

        if self.state.current_kind() == DmIndent {
            let block = self.indented_proc_block()?;
            self.newline();
            self.state.consume(DmRightCurlyBracket, "Expected '}'");
            return Ok(block);
        }

        let mut block = ProcBlock::empty(location);
        loop {
            let start = self.state.position();
            if let Some(inner) = self.proc_block_inner() {
                block.statements.extend(inner.statements);
                block.set_statements.extend(inner.set_statements);
            }
            if self.state.check(DmRightCurlyBracket) || self.state.at_end() {
                break;
            }

            self.state.emit(WarningCode::BadToken, "Expected end of braced block");
            self.state.check(DmDedent);
            self.locate_next_statement();
            self.delimiter();
            if self.state.position() == start {
                self.state.advance();
            }
        }
        Ok(Some(block))
    }

    fn indented_proc_block(&mut self) -> ParseResult<Option<ProcBlock>> {
        let location = self.state.location();
        if !self.state.check(DmIndent) {
            return Ok(None);
        }

        let mut block = ProcBlock::empty(location);
        loop {
            let start = self.state.position();
            if let Some(inner) = self.proc_block_inner() {
                block.statements.extend(inner.statements);
                block.set_statements.extend(inner.set_statements);
            }
            if self.state.check(DmDedent) || self.state.at_end() {
                break;
            }

            self.state.emit(WarningCode::BadToken, "Expected end of proc statement");
            self.locate_next_statement();
            self.delimiter();
            if self.state.position() == start {
                self.state.advance();
            }
        }
        Ok(Some(block))
    }

    /// Proc statements up to the first missing delimiter. `set` statements
    /// are collected separately.
    fn proc_block_inner(&mut self) -> Option<ProcBlock> {
        let mut block = ProcBlock::empty(self.state.location());
        self.whitespace();

        loop {
            self.whitespace();
            let mut was_label = false;
            let mut recovered = false;
            match self.proc_statement() {
                Ok(Some(statement)) => {
                    self.whitespace();
                    was_label = statement.is_label();
                    if statement.is_set() {
                        block.set_statements.push(statement);
                    } else {
                        block.statements.push(statement);
                    }
                }
                Ok(None) => {}
                Err(_) => {
                    recovered = self.locate_next_statement();
                    // Recovery may stop right before the failed statement's body
                    if let Ok(Some(inner)) = self.proc_block() {
                        block.statements.extend(inner.statements);
                    }
                }
            }
            if !(recovered || self.delimiter() || was_label) {
                break;
            }
        }
        self.whitespace();

        if block.is_empty() {
            None
        } else {
            Some(block)
        }
    }

    /// A block body, or failing that a single statement
    fn body_or_statement(&mut self) -> ParseResult<Option<ProcBlock>> {
        if let Some(block) = self.proc_block()? {
            return Ok(Some(block));
        }
        Ok(self.proc_statement()?.map(single))
    }

    /// Like `body_or_statement`, but a lone statement is tried first
    fn statement_or_body(&mut self) -> ParseResult<Option<ProcBlock>> {
        if let Some(statement) = self.proc_statement()? {
            return Ok(Some(single(statement)));
        }
        self.proc_block()
    }

    pub(crate) fn proc_statement(&mut self) -> ParseResult<Option<ProcStatement>> {
        let location = self.state.location();

        // A lone semicolon is a null statement; the delimiter stays
        if self.state.current_kind() == DmSemicolon {
            return Ok(Some(ProcStatement::new(location, ProcStatementKind::Null)));
        }

        let leading_colon = self.state.check(DmColon);
        let expression = if self.state.current_kind() != DmVar {
            self.expression()?
        } else {
            None
        };

        if leading_colon && !expression.as_ref().is_some_and(|e| e.as_identifier().is_some()) {
            return Err(self.state.error("Expected a label identifier"));
        }

        if let Some(expression) = expression {
            return self.expression_statement(location, leading_colon, expression).map(Some);
        }

        let statement = match self.state.current_kind() {
            DmIf => self.if_statement()?,
            DmReturn => {
                self.state.advance();
                self.whitespace();
                ProcStatement::new(location, ProcStatementKind::Return(self.expression()?))
            }
            DmVar | DmSlash => match self.proc_var_declaration(true)? {
                Some(statement) => statement,
                None => return Ok(None),
            },
            DmFor => self.for_statement()?,
            DmSet => self.set_statement()?,
            DmSwitch => self.switch_statement()?,
            DmContinue => {
                self.state.advance();
                self.whitespace();
                ProcStatement::new(location, ProcStatementKind::Continue(self.label_name()))
            }
            DmBreak => {
                self.state.advance();
                self.whitespace();
                ProcStatement::new(location, ProcStatementKind::Break(self.label_name()))
            }
            DmSpawn => self.spawn_statement()?,
            DmWhile => self.while_statement()?,
            DmDo => self.do_while_statement()?,
            DmThrow => {
                self.state.advance();
                self.whitespace();
                ProcStatement::new(location, ProcStatementKind::Throw(self.expression()?))
            }
            DmDel => self.del_statement()?,
            DmTry => self.try_catch_statement()?,
            DmGoto => {
                self.state.advance();
                self.whitespace();
                let Some(label) = self.label_name() else {
                    return Err(self.state.error("Expected a label"));
                };
                ProcStatement::new(location, ProcStatementKind::Goto(label))
            }
            _ => return Ok(None),
        };
        self.whitespace();
        Ok(Some(statement))
    }

    /// A statement that starts with an expression: labels, `sleep`, `<<`
    /// and `>>` get their own statements
    fn expression_statement(
        &mut self,
        location: Location,
        leading_colon: bool,
        expression: Expression,
    ) -> ParseResult<ProcStatement> {
        let expression = match expression.kind {
            ExpressionKind::Identifier(name) => {
                let trailing_colon = self.state.check(DmColon);
                if !trailing_colon && !leading_colon && name == "sleep" {
                    // `sleep 10` without parentheses
                    let delay = self
                        .expression()?
                        .unwrap_or_else(|| Expression::null(expression.location.clone()));
                    Expression::new(
                        expression.location,
                        ExpressionKind::ProcCall {
                            callable: Callable::Proc(name),
                            args: vec![CallParameter::positional(delay)],
                        },
                    )
                } else {
                    return self.label(expression.location, name);
                }
            }
            ExpressionKind::Binary {
                op: BinaryOp::RightShift,
                lhs,
                rhs,
            } => {
                let kind = ProcStatementKind::Input {
                    source: *lhs,
                    target: *rhs,
                };
                return Ok(ProcStatement::new(location, kind));
            }
            ExpressionKind::Binary {
                op: BinaryOp::LeftShift,
                lhs,
                rhs,
            } => return self.output_statement(location, *lhs, *rhs),
            kind => Expression::new(expression.location, kind),
        };
        Ok(ProcStatement::new(location, ProcStatementKind::Expression(expression)))
    }

    fn label(
        &mut self,
        location: Location,
        name: String,
    ) -> ParseResult<ProcStatement> {
        self.whitespace();
        self.newline();
        let body = self.proc_block()?;
        Ok(ProcStatement::new(location, ProcStatementKind::Label { name, body }))
    }

    /// `a << b`, where some calls on the right become dedicated statements
    fn output_statement(
        &mut self,
        location: Location,
        receiver: Expression,
        value: Expression,
    ) -> ParseResult<ProcStatement> {
        let (name, args) = match &value.unwrapped().kind {
            ExpressionKind::ProcCall {
                callable: Callable::Proc(name),
                args,
            } => (name.clone(), args.clone()),
            _ => (String::new(), Vec::new()),
        };

        let null = || Expression::null(location.clone());
        let kind = match name.as_str() {
            "browse" => {
                let mut args = self.output_args(args, 1, 2, "browse() requires 1 or 2 parameters")?;
                ProcStatementKind::Browse {
                    receiver,
                    body: args.remove(0),
                    options: args.pop().unwrap_or_else(null),
                }
            }
            "browse_rsc" => {
                let mut args = self.output_args(args, 1, 2, "browse_rsc() requires 1 or 2 parameters")?;
                ProcStatementKind::BrowseResource {
                    receiver,
                    file: args.remove(0),
                    filename: args.pop().unwrap_or_else(null),
                }
            }
            "output" => {
                let mut args = self.output_args(args, 2, 2, "output() requires 2 parameters")?;
                let control = args.remove(1);
                ProcStatementKind::OutputControl {
                    receiver,
                    message: args.remove(0),
                    control,
                }
            }
            "ftp" => {
                let mut args = self.output_args(args, 1, 2, "ftp() requires 1 or 2 parameters")?;
                ProcStatementKind::Ftp {
                    receiver,
                    file: args.remove(0),
                    name: args.pop().unwrap_or_else(null),
                }
            }
            _ => ProcStatementKind::Output { receiver, value },
        };
        Ok(ProcStatement::new(location, kind))
    }

    fn output_args(
        &mut self,
        args: Vec<CallParameter>,
        min: usize,
        max: usize,
        message: &str,
    ) -> ParseResult<Vec<Expression>> {
        if args.len() < min || args.len() > max {
            return Err(self.state.error(message));
        }
        Ok(args.into_iter().map(|p| p.value).collect())
    }

    /// Optional label after `break`, `continue` or `goto`
    fn label_name(&mut self) -> Option<String> {
        if self.state.current_kind() == DmIdentifier {
            Some(self.state.bump().text)
        } else {
            None
        }
    }

    /// `var/x = 1, y` or `var` followed by a block of declarations
    pub(crate) fn proc_var_declaration(
        &mut self,
        allow_multiple: bool,
    ) -> ParseResult<Option<ProcStatement>> {
        let location = self.state.location();
        let was_slash = self.state.check(DmSlash);
        if !self.state.check(DmVar) {
            if was_slash {
                self.state.unread();
            }
            return Ok(None);
        }
        if was_slash {
            return Err(self.state.error("Unsupported root variable declaration"));
        }

        self.whitespace();
        let Some(mut declarations) = self.proc_var_end(allow_multiple, None)? else {
            return Err(self.state.error("Expected a var declaration"));
        };
        if declarations.len() == 1 {
            return Ok(declarations.pop());
        }
        Ok(Some(ProcStatement::new(location, ProcStatementKind::Aggregate(declarations))))
    }

    /// Declarations after `var`, optionally below a parent path such as
    /// `var/obj`
    fn proc_var_end(
        &mut self,
        allow_multiple: bool,
        parent: Option<&DreamPath>,
    ) -> ParseResult<Option<Vec<ProcStatement>>> {
        let location = self.state.location();
        let var_path = self.path(false).map(|p| p.path);

        if allow_multiple {
            if let Some(block) = self.proc_var_block(var_path.as_ref())? {
                return Ok(Some(block));
            }
        }

        let Some(mut var_path) = var_path else {
            return Ok(None);
        };
        if let Some(parent) = parent {
            var_path = parent.combine(&var_path);
        }

        let mut declarations = Vec::new();
        loop {
            self.whitespace();
            let mut value = self.path_array(&mut var_path)?;
            if self.state.check(DmEquals) {
                if value.is_some() {
                    self.state.warning(self.state.location(), "List doubly initialized");
                }
                self.whitespace();
                match self.expression()? {
                    Some(expression) => value = Some(expression),
                    None => return Err(self.state.error("Expected an expression")),
                }
            }
            let types = self.as_types(false)?;
            let declaration = ProcVarDeclaration::new(&var_path, value, types);
            declarations.push(ProcStatement::new(
                location.clone(),
                ProcStatementKind::VarDeclaration(declaration),
            ));

            if !(allow_multiple && self.state.check(DmComma)) {
                break;
            }
            self.whitespace();
            match self.path(false) {
                Some(next) => var_path = next.path,
                None => return Err(self.state.error("Expected a var declaration")),
            }
        }
        Ok(Some(declarations))
    }

    /// An indented or braced block of declarations after `var`
    fn proc_var_block(
        &mut self,
        parent: Option<&DreamPath>,
    ) -> ParseResult<Option<Vec<ProcStatement>>> {
        let checkpoint = self.state.checkpoint();
        self.newline();

        let (closer, braced) = if self.state.check(DmIndent) {
            (DmDedent, false)
        } else if self.state.check(DmLeftCurlyBracket) {
            self.whitespace();
            self.newline();
            if self.state.check(DmIndent) {
                (DmDedent, true)
            } else {
                (DmRightCurlyBracket, false)
            }
        } else {
            self.state.rollback(checkpoint);
            return Ok(None);
        };
        self.state.commit(checkpoint);

        let mut declarations = Vec::new();
        while !self.state.check(closer) && !self.state.at_end() {
            let Some(more) = self.proc_var_end(true, parent)? else {
                return Err(self.state.error("Expected a var declaration"));
            };
            declarations.extend(more);
            self.whitespace();
            self.delimiter();
            self.whitespace();
        }

        if braced {
            self.newline();
            self.state.consume(DmRightCurlyBracket, "Expected '}'");
        }
        Ok(Some(declarations))
    }

    fn set_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        let Some(mut sets) = self.proc_set_end(true)? else {
            return Err(self.state.error("Expected set declaration"));
        };
        if sets.len() == 1 {
            if let Some(set) = sets.pop() {
                return Ok(set);
            }
        }
        Ok(ProcStatement::new(location, ProcStatementKind::Aggregate(sets)))
    }

    fn proc_set_end(
        &mut self,
        allow_multiple: bool,
    ) -> ParseResult<Option<Vec<ProcStatement>>> {
        if allow_multiple {
            if let Some(block) = self.proc_set_block()? {
                return Ok(Some(block));
            }
        }

        let mut sets = Vec::new();
        loop {
            let location = self.state.location();
            if self.state.current_kind() != DmIdentifier {
                return Err(self.state.error("Expected an identifier for set declaration"));
            }
            let attribute = self.state.bump().text;
            self.whitespace();
            let operator = self
                .state
                .consume_any(&[DmEquals, DmIn], "Expected a 'in' or '=' for set declaration");
            self.whitespace();
            let Some(value) = self.expression()? else {
                return Err(self.state.error("Expected an expression"));
            };
            sets.push(ProcStatement::new(
                location,
                ProcStatementKind::Set {
                    attribute,
                    value,
                    in_keyword: operator == Some(DmIn),
                },
            ));

            if !(allow_multiple && self.state.check(DmComma)) {
                break;
            }
            self.whitespace();
        }
        Ok(Some(sets))
    }

    fn proc_set_block(&mut self) -> ParseResult<Option<Vec<ProcStatement>>> {
        let checkpoint = self.state.checkpoint();
        self.newline();

        let (closer, braced) = if self.state.check(DmIndent) {
            (DmDedent, false)
        } else if self.state.check(DmLeftCurlyBracket) {
            self.whitespace();
            self.newline();
            if self.state.check(DmIndent) {
                (DmDedent, true)
            } else {
                (DmRightCurlyBracket, false)
            }
        } else {
            self.state.rollback(checkpoint);
            return Ok(None);
        };
        self.state.commit(checkpoint);

        let mut sets = Vec::new();
        while !self.state.check(closer) && !self.state.at_end() {
            let Some(more) = self.proc_set_end(false)? else {
                return Err(self.state.error("Expected set declaration"));
            };
            sets.extend(more);
            self.whitespace();
            self.delimiter();
            self.whitespace();
        }

        if braced {
            self.newline();
            self.state.consume(DmRightCurlyBracket, "Expected '}'");
        }
        Ok(Some(sets))
    }

    fn if_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        self.state.consume(DmLeftParenthesis, "Expected '('");
        self.bracket_whitespace();
        let Some(condition) = self.expression()? else {
            return Err(self.state.error("Expected a condition"));
        };
        if matches!(condition.kind, ExpressionKind::Assign { .. }) {
            self.state.emit_at(
                WarningCode::AssignmentInConditional,
                condition.location.clone(),
                "Assignment in conditional",
            );
        }
        self.bracket_whitespace();
        self.consume_right_parenthesis();
        self.whitespace();
        self.state.check(DmColon);
        self.whitespace();

        let body = self
            .statement_or_body()?
            .unwrap_or_else(|| ProcBlock::empty(location.clone()));

        let checkpoint = self.state.checkpoint();
        if self.delimiter() {
            self.whitespace();
        }
        let else_body = if self.state.check(DmElse) {
            self.state.commit(checkpoint);
            self.whitespace();
            self.state.check(DmColon);
            self.whitespace();
            Some(
                self.statement_or_body()?
                    .unwrap_or_else(|| ProcBlock::empty(location.clone())),
            )
        } else {
            self.state.rollback(checkpoint);
            None
        };

        Ok(ProcStatement::new(
            location,
            ProcStatementKind::If {
                condition,
                body,
                else_body,
            },
        ))
    }

    fn for_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        self.state.consume(DmLeftParenthesis, "Expected '('");
        self.whitespace();

        if self.state.check(DmRightParenthesis) {
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, ProcStatementKind::InfLoop(body)));
        }

        self.allow_var_decl = true;
        let first = self.expression();
        let types = match first {
            Ok(_) => self.as_types(false),
            Err(ref abort) => Err(abort.clone()),
        };
        self.allow_var_decl = false;
        let (first, types) = (first?, types?);
        self.whitespace();

        let first = match first {
            Some(expression) => expression,
            None if FOR_SEPARATORS.contains(&self.state.current_kind()) => Expression::null(location.clone()),
            None => return Err(self.state.error("Expected 1st expression in for")),
        };

        let make = |init: Expression, condition: Option<Expression>, increment: Option<Expression>, body| {
            ProcStatementKind::For {
                init: Some(init),
                condition,
                increment,
                types,
                body,
            }
        };

        if self.state.check(DmTo) {
            let ExpressionKind::Assign { target, value, .. } = first.kind else {
                return Err(self.state.error("Expected = before to in for"));
            };
            let (end, step) = self.expression_to()?;
            self.state
                .consume(DmRightParenthesis, "Expected ')' in for after to expression");
            let init = Expression::new(
                location.clone(),
                ExpressionKind::InRange {
                    value: target,
                    start: value,
                    end: Box::new(end),
                    step: step.map(Box::new),
                },
            );
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, make(init, None, None, body)));
        }

        if self.state.check(DmIn) {
            self.whitespace();
            let list = self
                .expression()?
                .unwrap_or_else(|| Expression::invalid(self.state.location()));
            self.whitespace();
            self.state
                .consume(DmRightParenthesis, "Expected ')' in for after expression 2");
            let init = Expression::binary(location.clone(), BinaryOp::In, first, list);
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, make(init, None, None, body)));
        }

        if self.state.check_any(FOR_SEPARATORS).is_none() {
            self.state
                .consume(DmRightParenthesis, "Expected ')' in for after expression 1");
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, make(first, None, None, body)));
        }
        if self.state.check(DmRightParenthesis) {
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, make(first, None, None, body)));
        }

        self.whitespace();
        let second = match self.expression()? {
            Some(expression) => expression,
            None if FOR_SEPARATORS.contains(&self.state.current_kind()) => Expression::int(location.clone(), 1),
            None => return Err(self.state.error("Expected 2nd expression in for")),
        };

        if self.state.check_any(FOR_SEPARATORS).is_none() {
            self.state
                .consume(DmRightParenthesis, "Expected ')' in for after expression 2");
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, make(first, Some(second), None, body)));
        }
        if self.state.check(DmRightParenthesis) {
            let body = self.for_body(&location)?;
            return Ok(ProcStatement::new(location, make(first, Some(second), None, body)));
        }

        self.whitespace();
        let third = match self.expression()? {
            Some(expression) => expression,
            None if self.state.current_kind() == DmRightParenthesis => Expression::null(location.clone()),
            None => return Err(self.state.error("Expected 3nd expression in for")),
        };
        self.state
            .consume(DmRightParenthesis, "Expected ')' in for after expression 3");
        let body = self.for_body(&location)?;
        Ok(ProcStatement::new(location, make(first, Some(second), Some(third), body)))
    }

    fn for_body(
        &mut self,
        for_location: &Location,
    ) -> ParseResult<ProcBlock> {
        self.whitespace();
        self.newline();
        if let Some(block) = self.proc_block()? {
            return Ok(block);
        }

        let location = self.state.location();
        let null_statement = |location: &Location| {
            ProcStatement::new(
                location.clone(),
                ProcStatementKind::Expression(Expression::null(location.clone())),
            )
        };
        let statement = if self.state.check(DmSemicolon) {
            null_statement(&location)
        } else {
            match self.proc_statement()? {
                Some(statement) => statement,
                None => {
                    self.state.emit_at(
                        WarningCode::BadExpression,
                        for_location.clone(),
                        "Expected body or statement",
                    );
                    null_statement(&location)
                }
            }
        };
        Ok(single(statement))
    }

    fn while_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        self.state.consume(DmLeftParenthesis, "Expected '('");
        self.whitespace();
        let Some(condition) = self.expression()? else {
            return Err(self.state.error("Expected conditional"));
        };
        self.consume_right_parenthesis();
        self.state.check(DmSemicolon);
        self.whitespace();

        // Loops without a body are valid
        let body = self.body_or_statement()?.unwrap_or_else(|| {
            single(ProcStatement::new(location.clone(), ProcStatementKind::Continue(None)))
        });

        let kind = match condition.kind {
            ExpressionKind::Int(value) if value != 0 => ProcStatementKind::InfLoop(body),
            _ => ProcStatementKind::While { condition, body },
        };
        Ok(ProcStatement::new(location, kind))
    }

    fn do_while_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        let Some(body) = self.body_or_statement()? else {
            return Err(self
                .state
                .error("Expected statement - do-while requires a non-empty block"));
        };

        self.newline();
        self.whitespace();
        self.state.consume(DmWhile, "Expected 'while'");
        self.whitespace();
        self.state.consume(DmLeftParenthesis, "Expected '('");
        self.whitespace();
        let Some(condition) = self.expression()? else {
            return Err(self.state.error("Expected conditional"));
        };
        self.consume_right_parenthesis();
        self.whitespace();

        Ok(ProcStatement::new(location, ProcStatementKind::DoWhile { condition, body }))
    }

    fn switch_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        self.state.consume(DmLeftParenthesis, "Expected '('");
        self.whitespace();
        let Some(value) = self.expression()? else {
            return Err(self.state.error("Expected an expression"));
        };
        self.consume_right_parenthesis();
        self.whitespace();

        let cases = match self.switch_cases()? {
            Some(cases) => cases,
            None => {
                self.state.emit(WarningCode::BadExpression, "Expected switch cases");
                Vec::new()
            }
        };
        Ok(ProcStatement::new(location, ProcStatementKind::Switch { value, cases }))
    }

    fn switch_cases(&mut self) -> ParseResult<Option<Vec<SwitchCase>>> {
        let checkpoint = self.state.checkpoint();
        self.newline();

        let result = if self.state.check(DmLeftCurlyBracket) {
            self.whitespace();
            self.newline();
            let indented = self.state.check(DmIndent);
            let cases = self.switch_inner();
            if indented {
                self.state.check(DmDedent);
            }
            self.newline();
            self.state.consume(DmRightCurlyBracket, "Expected '}'");
            cases.map(Some)
        } else if self.state.check(DmIndent) {
            let cases = self.switch_inner();
            self.state.consume(DmDedent, "Expected \"if\" or \"else\"");
            cases.map(Some)
        } else {
            Ok(None)
        };

        match result {
            Ok(None) => self.state.rollback(checkpoint),
            _ => self.state.commit(checkpoint),
        }
        result
    }

    fn switch_inner(&mut self) -> ParseResult<Vec<SwitchCase>> {
        let mut cases = Vec::new();
        while let Some(case) = self.switch_case()? {
            cases.push(case);
            self.newline();
            self.whitespace();
        }
        Ok(cases)
    }

    fn switch_case(&mut self) -> ParseResult<Option<SwitchCase>> {
        if self.state.check(DmIf) {
            self.whitespace();
            self.state.consume(DmLeftParenthesis, "Expected '('");

            let mut values = Vec::new();
            loop {
                self.bracket_whitespace();
                let Some(value) = self.expression()? else {
                    if values.is_empty() {
                        self.state.emit(WarningCode::BadExpression, "Expected an expression");
                    }
                    break;
                };

                if self.state.check(DmTo) {
                    self.whitespace();
                    let location = self.state.location();
                    let end = match self.expression()? {
                        Some(end) => end,
                        None => {
                            self.state
                                .emit_at(WarningCode::BadExpression, location.clone(), "Expected an upper limit");
                            Expression::null(location.clone())
                        }
                    };
                    values.push(Expression::new(
                        location,
                        ExpressionKind::SwitchRange {
                            start: Box::new(value),
                            end: Box::new(end),
                        },
                    ));
                } else {
                    values.push(value);
                }

                self.delimiter();
                if !self.state.check(DmComma) {
                    break;
                }
            }

            self.whitespace();
            self.consume_right_parenthesis();
            self.whitespace();
            let body = self
                .body_or_statement()?
                .unwrap_or_else(|| ProcBlock::empty(self.state.location()));
            return Ok(Some(SwitchCase::Values(values, body)));
        }

        if self.state.check(DmElse) {
            self.whitespace();
            let location = self.state.location();
            if self.state.current_kind() == DmIf {
                self.state.emit_at(
                    WarningCode::SuspiciousSwitchCase,
                    location.clone(),
                    "Expected \"if\" or \"else\" - \"else if\" is ambiguous as a switch case and may cause unintended flow",
                );
            }
            let body = self
                .body_or_statement()?
                .unwrap_or_else(|| ProcBlock::empty(location));
            return Ok(Some(SwitchCase::Default(body)));
        }

        Ok(None)
    }

    fn spawn_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();

        let mut delay = None;
        if self.state.check(DmLeftParenthesis) {
            self.whitespace();
            if !self.state.check(DmRightParenthesis) {
                match self.expression()? {
                    Some(expression) => delay = Some(expression),
                    None => return Err(self.state.error("Expected an expression")),
                }
                self.consume_right_parenthesis();
            }
            self.whitespace();
        }

        self.newline();
        let body = match self.body_or_statement()? {
            Some(body) => body,
            None => {
                self.state.emit(WarningCode::BadExpression, "Expected body or statement");
                ProcBlock::empty(location.clone())
            }
        };

        let delay = delay.unwrap_or_else(|| Expression::int(location.clone(), 0));
        Ok(ProcStatement::new(location, ProcStatementKind::Spawn { delay, body }))
    }

    fn del_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();
        let parenthesized = self.state.check(DmLeftParenthesis);
        self.whitespace();
        let Some(value) = self.expression()? else {
            return Err(self.state.error("Expected value to delete"));
        };
        if parenthesized {
            self.consume_right_parenthesis();
        }
        Ok(ProcStatement::new(location, ProcStatementKind::Del(value)))
    }

    fn try_catch_statement(&mut self) -> ParseResult<ProcStatement> {
        let location = self.state.location();
        self.state.advance();
        self.whitespace();

        let try_body = match self.body_or_statement()? {
            Some(body) => body,
            None => {
                self.state.emit(WarningCode::BadExpression, "Expected body or statement");
                ProcBlock::empty(location.clone())
            }
        };

        self.newline();
        self.whitespace();
        self.state.consume(DmCatch, "Expected catch");
        self.whitespace();

        // catch(var/exception/E)
        let mut catch_param = None;
        if self.state.check(DmLeftParenthesis) {
            self.bracket_whitespace();
            catch_param = self.proc_var_declaration(false)?.map(Box::new);
            self.bracket_whitespace();
            self.consume_right_parenthesis();
            self.whitespace();
        }

        let catch_body = self.body_or_statement()?;
        Ok(ProcStatement::new(
            location,
            ProcStatementKind::TryCatch {
                try_body,
                catch_param,
                catch_body,
            },
        ))
    }
}

/// A block holding one statement
fn single(statement: ProcStatement) -> ProcBlock {
    ProcBlock::new(statement.location.clone(), vec![statement])
}
