//! DM recursive-descent parser
//!
//! - `mod.rs` - file and object-level statements, paths, blocks, recovery
//! - [`proc`] - proc bodies and proc statements
//! - [`expr`] - the expression precedence chain and builtin calls
//! - [`string`] - string literals, escapes and interpolation
//!
//! Object-level statements extend `current_path`, so a nested block only
//! ever sees absolute paths. A `ParseAbort` unwinds to the enclosing
//! block, which skips to the next statement and keeps going.

mod expr;
mod proc;
mod string;

use crate::frontend::core::lexer::{Lexer, TokenKind};
use crate::frontend::core::parser::{ParseResult, ParserState};
use crate::frontend::dm::ast::{
    Block, DefinitionParameter, Expression, ExpressionKind, File, ObjectVarDefinition, ProcBlock, ProcDefinition,
    ProcStatement, ProcStatementKind, Statement, StatementKind, ValueType,
};
use crate::frontend::dm::ast::{AssignOp, Callable};
use crate::frontend::dm::path::{DreamPath, PathKind};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;

use TokenKind::*;

/// Tokens that may name a path element
const PATH_ELEMENT_TOKENS: &[TokenKind] = &[
    DmIdentifier,
    DmVar,
    DmProc,
    DmStep,
    DmThrow,
    DmNull,
    DmSwitch,
    DmSpawn,
    DmDo,
    DmWhile,
    DmFor,
];

/// Tokens that may follow `operator` in an overload's name
const OPERATOR_OVERLOAD_TOKENS: &[TokenKind] = &[
    DmAnd,
    DmAndEquals,
    DmAssignInto,
    DmBar,
    DmBarEquals,
    DmDoubleSquareBracket,
    DmDoubleSquareBracketEquals,
    DmGreaterThan,
    DmGreaterThanEquals,
    DmRightShift,
    DmRightShiftEquals,
    DmLeftShift,
    DmLeftShiftEquals,
    DmLessThan,
    DmLessThanEquals,
    DmMinus,
    DmMinusEquals,
    DmMinusMinus,
    DmModulus,
    DmModulusEquals,
    DmModulusModulus,
    DmModulusModulusEquals,
    DmPlus,
    DmPlusEquals,
    DmPlusPlus,
    DmSlash,
    DmSlashEquals,
    DmStar,
    DmStarEquals,
    DmStarStar,
    DmTilde,
    DmTildeEquals,
    DmTildeExclamation,
    DmXor,
    DmXorEquals,
    DmConstantString,
];

/// A path as written, before it is combined with the enclosing path
#[derive(Debug, Clone)]
pub(crate) struct ParsedPath {
    pub location: Location,
    pub path: DreamPath,
    /// Names an operator overload, e.g. `operator+`
    pub is_operator: bool,
}

/// Parser for DM code.
///
/// Generic over the token source so that map files can reuse it with
/// layout tokens filtered out.
pub struct DmParser<L: Lexer> {
    pub(crate) state: ParserState<L>,
    current_path: DreamPath,
    /// `var/x` is an expression only inside a `for` header
    allow_var_decl: bool,
}

impl<L: Lexer> DmParser<L> {
    pub fn new(
        lexer: L,
        sink: DiagnosticSink,
    ) -> Self {
        Self {
            state: ParserState::new(lexer, sink),
            current_path: DreamPath::root(),
            allow_var_decl: false,
        }
    }

    #[inline]
    pub fn sink(&self) -> &DiagnosticSink {
        self.state.sink()
    }

    /// Parse until the end of input. Errors are recorded in the sink; the
    /// returned tree holds everything that could be recovered.
    pub fn parse_file(&mut self) -> File {
        let location = self.state.location();
        let mut statements = Vec::new();

        while !self.state.at_end() {
            let start = self.state.position();
            if let Some(block) = self.block_inner() {
                statements.extend(block);
            }

            if !self.state.at_end() {
                let skip_from = self.state.location();
                self.locate_next_top_level(start);
                let skipped_to = self.state.location();
                self.state.warning(
                    skip_from,
                    format!("Error recovery had to skip to {}", skipped_to),
                );
            }
        }

        self.newline();
        self.state.consume(EndOfFile, "Expected EOF");
        tracing::debug!("Parsed {} top-level statements", statements.len());

        File {
            location: location.clone(),
            block: Block {
                location,
                statements,
            },
        }
    }

    /// One `DmWhitespace` token
    pub(crate) fn whitespace(&mut self) -> bool {
        self.state.check(DmWhitespace)
    }

    /// Any number of newlines
    pub(crate) fn newline(&mut self) -> bool {
        let mut any = false;
        while self.state.check(Newline) {
            any = true;
        }
        any
    }

    /// Any run of newlines and semicolons
    pub(crate) fn delimiter(&mut self) -> bool {
        let mut any = false;
        while self.state.check(DmSemicolon) || self.state.check(Newline) {
            any = true;
        }
        any
    }

    /// Whitespace and delimiters inside brackets
    pub(crate) fn bracket_whitespace(&mut self) {
        self.whitespace();
        self.delimiter();
        self.whitespace();
    }

    pub(crate) fn peek_delimiter(&self) -> bool {
        matches!(self.state.current_kind(), Newline | DmSemicolon)
    }

    pub(crate) fn consume_right_parenthesis(&mut self) -> bool {
        self.state.consume(DmRightParenthesis, "Expected ')'")
    }

    pub(crate) fn consume_right_bracket(&mut self) -> bool {
        self.state.consume(DmRightBracket, "Expected ']'")
    }

    /// Object-level statements up to the first missing delimiter
    fn block_inner(&mut self) -> Option<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            self.whitespace();
            match self.statement(true) {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => {
                    if statements.is_empty() {
                        return None;
                    }
                }
                Err(_) => {
                    if self.locate_next_statement() {
                        continue;
                    }
                }
            }
            self.whitespace();
            if !self.delimiter() {
                break;
            }
        }
        self.whitespace();
        Some(statements)
    }

    /// One object-level statement
    pub(crate) fn statement(
        &mut self,
        require_delimiter: bool,
    ) -> ParseResult<Option<Statement>> {
        let location = self.state.location();
        let Some(parsed) = self.path(false) else {
            return Ok(None);
        };

        let previous = self.current_path.clone();
        self.whitespace();
        self.current_path = self.current_path.combine(&parsed.path);
        let result = self.statement_body(location, parsed.is_operator);
        self.current_path = previous;
        let statement = result?;

        if require_delimiter
            && !self.peek_delimiter()
            && !matches!(self.state.current_kind(), DmDedent | DmRightCurlyBracket | EndOfFile)
        {
            self.state.emit(WarningCode::BadToken, "Expected end of object statement");
        }
        Ok(Some(statement))
    }

    fn statement_body(
        &mut self,
        location: Location,
        is_operator: bool,
    ) -> ParseResult<Statement> {
        if self.state.check(DmLeftParenthesis) {
            return self.proc_definition(location, is_operator);
        }

        if let Some(body) = self.block()? {
            let kind = StatementKind::ObjectDefinition {
                path: self.current_path.to_absolute(),
                body: Some(body),
            };
            return Ok(Statement::new(location, kind));
        }

        if self.current_path.var_element().is_some() {
            return self.object_var_definitions(location);
        }

        if self.state.check(DmEquals) {
            self.whitespace();
            let Some(value) = self.expression()? else {
                return Err(self.state.error("Expected an expression"));
            };
            let elements = self.current_path.elements();
            let name = elements.last().cloned().unwrap_or_default();
            let object_path = self.current_path.from_elements(0, elements.len().saturating_sub(1));
            let kind = StatementKind::VarOverride {
                object_path,
                name,
                value,
            };
            return Ok(Statement::new(location, kind));
        }

        let kind = StatementKind::ObjectDefinition {
            path: self.current_path.to_absolute(),
            body: None,
        };
        Ok(Statement::new(location, kind))
    }

    /// Parameters, return type and body of `name(...)`; the `(` is consumed
    fn proc_definition(
        &mut self,
        location: Location,
        is_operator: bool,
    ) -> ParseResult<Statement> {
        self.bracket_whitespace();
        let (mut parameters, mut indeterminate) = self.definition_parameters()?;

        if !matches!(self.state.current_kind(), DmRightParenthesis | DmComma) && !indeterminate {
            if let Some(last) = parameters.last() {
                let message = format!("error: {}: missing comma ',' or right-paren ')'", last.name);
                self.state.emit(WarningCode::BadToken, message);
                self.state.recover();
            }
            let (more, more_indeterminate) = self.definition_parameters()?;
            parameters.extend(more);
            indeterminate = more_indeterminate;
        }

        if !indeterminate && !matches!(self.state.current_kind(), DmRightParenthesis | EndOfFile) {
            let message = format!(
                "error: bad argument definition '{}'",
                self.state.current().printable_text()
            );
            self.state.emit(WarningCode::BadToken, message);
            self.state.advance();
            self.bracket_whitespace();
            self.state.check(DmComma);
            self.bracket_whitespace();
            let (more, _) = self.definition_parameters()?;
            parameters.extend(more);
        }

        self.bracket_whitespace();
        self.consume_right_parenthesis();
        self.whitespace();

        let return_types = self.as_types(true)?;

        let mut body = self.proc_block()?;
        if body.is_none() {
            if let Some(statement) = self.proc_statement()? {
                body = Some(ProcBlock::new(statement.location.clone(), vec![statement]));
            }
        }
        if body.as_ref().is_some_and(|b| b.statements.is_empty()) {
            self.state.emit_at(
                WarningCode::EmptyProc,
                location.clone(),
                "Empty proc detected - add an explicit \"return\" statement",
            );
        }

        if is_operator {
            self.state.emit_at(
                WarningCode::UnimplementedAccess,
                location.clone(),
                "Operator overloads are not implemented. They will be defined but never called.",
            );
            // Overloads return their own instance unless they say otherwise
            let assign = Expression::assign(
                location.clone(),
                AssignOp::Assign,
                Expression::new(location.clone(), ExpressionKind::Callable(Callable::SelfProc)),
                Expression::identifier(location.clone(), "src"),
            );
            let statement = ProcStatement::new(location.clone(), ProcStatementKind::Expression(assign));
            let block = body.get_or_insert_with(|| ProcBlock::empty(location.clone()));
            block.statements.insert(0, statement);
        }

        let definition = ProcDefinition::new(
            location.clone(),
            &self.current_path,
            parameters,
            body,
            return_types,
        );
        Ok(Statement::new(location, StatementKind::ProcDefinition(definition)))
    }

    /// `var/a = 1, b` on an object; `current_path` already holds `var/a`
    fn object_var_definitions(
        &mut self,
        location: Location,
    ) -> ParseResult<Statement> {
        let mut var_path = self.current_path.clone();
        let mut definitions = Vec::new();

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

            let value = value.unwrap_or_else(|| Expression::null(location.clone()));
            let types = self.as_types(false)?.unwrap_or(ValueType::ANYTHING);
            definitions.push(ObjectVarDefinition::new(location.clone(), &var_path, value, types));

            if !self.state.check(DmComma) {
                break;
            }
            self.whitespace();
            let Some(next) = self.path(false) else {
                return Err(self.state.error("Expected a var definition"));
            };
            if next.path.elements().len() > 1 {
                return Err(self.state.error("Invalid var name"));
            }
            var_path = self.current_path.add_to_path(&format!("../{}", next.path));
        }

        let kind = if definitions.len() == 1 {
            StatementKind::VarDefinition(definitions.remove(0))
        } else {
            StatementKind::MultipleVarDefinitions(definitions)
        };
        Ok(Statement::new(location, kind))
    }

    /// A type path, e.g. `/obj/item`, `.child`, `:desc` or `proc/foo`.
    ///
    /// In expression mode a bare identifier is not a path.
    pub(crate) fn path(
        &mut self,
        expression: bool,
    ) -> Option<ParsedPath> {
        let checkpoint = self.state.checkpoint();
        let location = self.state.location();

        let kind = if self.state.check(DmSlash) {
            // `/.foo` searches upward from the root
            if self.state.check(DmPeriod) {
                PathKind::UpwardSearch
            } else {
                PathKind::Absolute
            }
        } else if self.state.check(DmColon) {
            PathKind::DownwardSearch
        } else if self.state.check(DmPeriod) {
            PathKind::UpwardSearch
        } else {
            if expression {
                self.state.rollback(checkpoint);
                return None;
            }
            PathKind::Relative
        };

        let Some(first) = self.path_element() else {
            self.state.rollback(checkpoint);
            return None;
        };

        let mut elements = vec![first];
        let mut is_operator = false;
        while self.state.check(DmSlash) {
            let Some(mut element) = self.path_element() else {
                break;
            };
            if element == "operator" {
                let next = self.state.current().clone();
                if next.kind == DmSlash {
                    // `operator/(` is the division overload, anything else
                    // uses `operator` as a plain type name
                    if self.state.peek_nth(1).kind == DmLeftParenthesis {
                        self.state.advance();
                        is_operator = true;
                        element.push('/');
                    } else {
                        self.state.emit(
                            WarningCode::SoftReservedKeyword,
                            "Using \"operator\" as a path element is ambiguous",
                        );
                    }
                } else if self.state.check_any(OPERATOR_OVERLOAD_TOKENS).is_some() {
                    if next.kind == DmConstantString && !next.value_or_text().is_empty() {
                        self.state.emit_at(
                            WarningCode::BadToken,
                            next.location.clone(),
                            "The quotes in a stringify overload must be empty",
                        );
                    }
                    is_operator = true;
                    let suffix = if next.kind == DmConstantString {
                        "\"\"".to_string()
                    } else {
                        next.text.clone()
                    };
                    element.push_str(&suffix);
                }
            }
            elements.push(element);
        }

        self.state.commit(checkpoint);
        Some(ParsedPath {
            location,
            path: DreamPath::new(kind, elements),
            is_operator,
        })
    }

    fn path_element(&mut self) -> Option<String> {
        if PATH_ELEMENT_TOKENS.contains(&self.state.current_kind()) {
            Some(self.state.bump().text)
        } else {
            None
        }
    }

    /// `[]` and `[size]` suffixes of a var name. Turns the path into a list
    /// declaration and returns the sizes, if any.
    pub(crate) fn path_array(
        &mut self,
        path: &mut DreamPath,
    ) -> ParseResult<Option<Expression>> {
        if !matches!(self.state.current_kind(), DmLeftBracket | DmDoubleSquareBracket) {
            return Ok(None);
        }
        let location = self.state.location();

        let elements = path.elements();
        let len = elements.len();
        if !elements[..len.saturating_sub(1)].iter().any(|e| e == "list") {
            let mut elements = elements.to_vec();
            let index = path.var_element().map_or(0, |i| i + 1);
            elements.insert(index, "list".to_string());
            *path = DreamPath::new(path.kind(), elements);
        }

        let mut sizes = Vec::new();
        loop {
            if self.state.check(DmDoubleSquareBracket) {
                self.whitespace();
            } else if self.state.check(DmLeftBracket) {
                self.whitespace();
                if let Some(size) = self.expression()? {
                    sizes.push(size);
                }
                self.consume_right_bracket();
                self.whitespace();
            } else {
                break;
            }
        }

        if sizes.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Expression::new(location, ExpressionKind::DimensionalList(sizes))))
        }
    }

    /// A nested object block, braced or indented
    fn block(&mut self) -> ParseResult<Option<Block>> {
        let checkpoint = self.state.checkpoint();
        self.newline();
        let result = match self.braced_block() {
            Ok(None) => self.indented_block(),
            other => other,
        };
        match result {
            Ok(None) => self.state.rollback(checkpoint),
            _ => self.state.commit(checkpoint),
        }
        result
    }

    fn braced_block(&mut self) -> ParseResult<Option<Block>> {
        let location = self.state.location();
        if !self.state.check(DmLeftCurlyBracket) {
            return Ok(None);
        }
        self.whitespace();
        self.newline();
        let indented = self.state.check(DmIndent);
        let statements = self.block_inner().unwrap_or_default();
        if indented {
            self.state.check(DmDedent);
        }
        self.newline();
        self.state.consume(DmRightCurlyBracket, "Expected '}'");
        Ok(Some(Block {
            location,
            statements,
        }))
    }

    fn indented_block(&mut self) -> ParseResult<Option<Block>> {
        let location = self.state.location();
        if !self.state.check(DmIndent) {
            return Ok(None);
        }
        let statements = match self.block_inner() {
            Some(statements) => {
                self.newline();
                self.state.consume(DmDedent, "Expected dedent");
                statements
            }
            None => Vec::new(),
        };
        Ok(Some(Block {
            location,
            statements,
        }))
    }

    /// `as num|text` or `as (num|text)`
    pub(crate) fn as_types(
        &mut self,
        allow_path: bool,
    ) -> ParseResult<Option<ValueType>> {
        if !self.state.check(DmAs) {
            return Ok(None);
        }
        self.whitespace();
        let parenthetical = self.state.check(DmLeftParenthesis);
        let mut closed = false;
        let mut types = ValueType::ANYTHING;

        loop {
            self.whitespace();
            if parenthetical && self.state.check(DmRightParenthesis) {
                closed = true;
                break;
            }

            let token = self.state.current().clone();
            if matches!(token.kind, DmIdentifier | DmNull) {
                self.state.advance();
                match ValueType::from_keyword(&token.text) {
                    Some(flag) => types |= flag,
                    None => return Err(self.state.error(format!("Invalid value type '{}'", token.text))),
                }
            } else if allow_path {
                if self.path(false).is_none() {
                    self.state
                        .emit_at(WarningCode::BadToken, token.location, "Expected value type or path");
                }
                types |= ValueType::PATH;
            } else {
                self.state.emit_at(WarningCode::BadToken, token.location, "Expected value type");
            }

            self.whitespace();
            if !self.state.check(DmBar) {
                break;
            }
        }

        if parenthetical && !closed {
            self.whitespace();
            self.consume_right_parenthesis();
        }
        Ok(Some(types))
    }

    /// Comma-separated proc parameters. The flag is set when the list ended
    /// at `...`.
    fn definition_parameters(&mut self) -> ParseResult<(Vec<DefinitionParameter>, bool)> {
        let mut parameters = Vec::new();
        let (first, mut indeterminate) = self.definition_parameter()?;
        parameters.extend(first);
        self.bracket_whitespace();

        while self.state.check(DmComma) {
            self.bracket_whitespace();
            let (parameter, was_indeterminate) = self.definition_parameter()?;
            indeterminate = was_indeterminate;
            if let Some(parameter) = parameter {
                parameters.push(parameter);
                self.bracket_whitespace();
            }

            if self.state.current_kind() == DmNull {
                let location = self.state.location();
                if self
                    .state
                    .emit(WarningCode::SoftReservedKeyword, "'null' is not a valid variable name")
                {
                    self.state.advance();
                    self.bracket_whitespace();
                    self.state.check(DmComma);
                    self.bracket_whitespace();
                    let (more, more_indeterminate) = self.definition_parameters()?;
                    parameters.extend(more);
                    indeterminate = more_indeterminate;
                } else {
                    self.state.advance();
                    self.bracket_whitespace();
                    let path = DreamPath::parse("null");
                    parameters.push(DefinitionParameter::new(location, &path, None, None, None));
                }
            }
        }
        Ok((parameters, indeterminate))
    }

    fn definition_parameter(&mut self) -> ParseResult<(Option<DefinitionParameter>, bool)> {
        let Some(parsed) = self.path(false) else {
            return Ok((None, self.state.check(DmIndeterminateArgs)));
        };
        let location = parsed.location;
        let mut path = parsed.path;
        self.whitespace();

        let mut default = self.path_array(&mut path)?;
        if self.state.check(DmDoubleSquareBracketEquals) {
            self.whitespace();
            default = self.expression()?;
        }
        if self.state.check(DmEquals) {
            self.whitespace();
            default = self.expression()?;
        }
        let types = self.as_types(false)?;
        self.whitespace();

        let mut possible_values = None;
        if self.state.check(DmIn) {
            self.whitespace();
            possible_values = self.expression()?;
        }

        let parameter = DefinitionParameter::new(location, &path, default, types, possible_values);
        Ok((Some(parameter), false))
    }

    /// Skip to the start of the next statement at this nesting level.
    ///
    /// Returns true when it stopped after consuming a delimiter.
    pub(crate) fn locate_next_statement(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            match self.state.current_kind() {
                EndOfFile => return false,
                DmIndent | DmLeftCurlyBracket => depth += 1,
                DmDedent | DmRightCurlyBracket => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                Newline | DmSemicolon if depth == 0 => {
                    self.delimiter();
                    return true;
                }
                _ => {}
            }
            self.state.advance();
        }
    }

    /// Skip to the next statement outside of every block opened since
    /// `start`
    fn locate_next_top_level(
        &mut self,
        start: usize,
    ) {
        let mut depth: i64 = self
            .state
            .consumed_since(start)
            .iter()
            .map(|t| nesting_delta(t.kind))
            .sum();

        while !self.state.at_end() {
            let kind = self.state.current_kind();
            if depth <= 0 && matches!(kind, Newline | DmSemicolon) && self.state.peek_nth(1).kind != DmIndent {
                self.delimiter();
                return;
            }
            depth += nesting_delta(kind);
            self.state.advance();
        }
    }
}

fn nesting_delta(kind: TokenKind) -> i64 {
    match kind {
        DmIndent | DmLeftCurlyBracket => 1,
        DmDedent | DmRightCurlyBracket => -1,
        _ => 0,
    }
}
