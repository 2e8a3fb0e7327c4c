//! DM preprocessor
//!
//! - [`lexer`] - characters to preprocessor tokens
//! - [`macros`] - `#define` bodies and builtin macros
//! - [`expr`] - `#if` evaluation
//! - [`source`] - include resolution
//!
//! [`Preprocessor`] is an iterator of preprocessor tokens with directives
//! executed, macros expanded and blank lines dropped. Upstream `Error` and
//! `Warning` tokens are yielded unchanged for the next stage to report.

pub mod expr;
pub mod lexer;
pub mod macros;
pub mod source;

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use tracing::debug;

pub use lexer::PreprocessorLexer;
pub use macros::Macro;
pub use source::{FsLoader, MemoryLoader, SourceLoader};

use crate::frontend::core::lexer::{Lexer, Token, TokenKind};
use crate::frontend::dm::lexer::DmLexer;
use crate::util::diagnostic::{DiagnosticSink, ErrorLevel, WarningCode};
use crate::util::span::Location;

/// A token waiting to be reprocessed, with the macros that may not expand
/// inside it
struct Pending {
    token: Token,
    hidden: Option<Arc<[String]>>,
}

/// Preprocessor stage over a stack of included files
pub struct Preprocessor {
    /// Every include pushes a lexer that is popped once its file ends
    lexers: Vec<PreprocessorLexer>,
    loader: Arc<dyn SourceLoader>,
    sink: DiagnosticSink,
    defines: HashMap<String, Macro>,
    included: HashSet<String>,
    unprocessed: Vec<Pending>,
    output: VecDeque<Token>,
    buffered_whitespace: Vec<Token>,
    line_has_content: bool,
    can_use_directive: bool,
    directives_enabled: bool,
    /// Open conditionals: `Some(taken)` for an `#if` family branch, `None`
    /// after its `#else`
    conditions: Vec<Option<bool>>,
    last_seen_if: Location,
    maps: Vec<String>,
    interface: Option<String>,
    resource_dirs: Vec<String>,
    finished: bool,
}

impl Preprocessor {
    pub fn new(
        loader: Arc<dyn SourceLoader>,
        sink: DiagnosticSink,
    ) -> Self {
        let mut defines = HashMap::new();
        defines.insert("__LINE__".to_string(), Macro::Line);
        defines.insert("__FILE__".to_string(), Macro::File);
        defines.insert("DM_VERSION".to_string(), Macro::Number("514".to_string()));
        defines.insert("DM_BUILD".to_string(), Macro::Number("1584".to_string()));
        Self {
            lexers: Vec::new(),
            loader,
            sink,
            defines,
            included: HashSet::new(),
            unprocessed: Vec::new(),
            output: VecDeque::new(),
            buffered_whitespace: Vec::new(),
            line_has_content: false,
            can_use_directive: true,
            directives_enabled: true,
            conditions: Vec::new(),
            last_seen_if: Location::UNKNOWN,
            maps: Vec::new(),
            interface: None,
            resource_dirs: Vec::new(),
            finished: false,
        }
    }

    /// Values of `DM_VERSION` and `DM_BUILD`
    pub fn set_version(
        &mut self,
        version: &str,
        build: &str,
    ) {
        self.defines
            .insert("DM_VERSION".to_string(), Macro::Number(version.to_string()));
        self.defines
            .insert("DM_BUILD".to_string(), Macro::Number(build.to_string()));
    }

    /// Any directive becomes a `MisplacedDirective` error
    pub fn disable_directives(&mut self) {
        self.directives_enabled = false;
    }

    /// Define an object-like macro from host input, e.g. `-D NAME=VALUE`
    pub fn define(
        &mut self,
        name: &str,
        value: &str,
    ) {
        self.defines.insert(name.to_string(), Macro::from_value(value));
    }

    pub fn is_defined(
        &self,
        name: &str,
    ) -> bool {
        self.defines.contains_key(name)
    }

    /// Map files included so far
    pub fn maps(&self) -> &[String] {
        &self.maps
    }

    /// The `.dmf` interface file, if one was included
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Directories added with `#define FILE_DIR`
    pub fn resource_dirs(&self) -> &[String] {
        &self.resource_dirs
    }

    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Push a file onto the include stack.
    ///
    /// Files are processed last-pushed first, so push several in reverse.
    pub fn include_file(
        &mut self,
        path: &str,
        included_from: Option<Location>,
    ) {
        let path = source::normalize_path(path);
        let location = included_from.unwrap_or_else(|| Location::in_source(Arc::from("<internal>")));

        if self.included.contains(&path) {
            self.sink.emit(
                WarningCode::FileAlreadyIncluded,
                location,
                format!("File \"{}\" was already included", path),
            );
            return;
        }
        if !self.loader.exists(&path) {
            self.sink.emit(
                WarningCode::MissingIncludedFile,
                location,
                format!("Could not find included file \"{}\"", path),
            );
            return;
        }

        debug!("Including {}", path);
        self.included.insert(path.clone());

        match source::extension(&path).as_deref() {
            Some("dmm") | Some("dmp") => self.maps.push(path),
            Some("dmf") => match self.interface.clone() {
                Some(existing) if existing == path => {
                    self.sink.emit(
                        WarningCode::FileAlreadyIncluded,
                        location,
                        format!("Interface \"{}\" was already included", path),
                    );
                }
                Some(existing) => {
                    let message = format!(
                        "Attempted to include a second interface file ({}) while one was already included ({})",
                        path, existing
                    );
                    self.sink.emit(WarningCode::InvalidInclusion, location, message);
                }
                None => self.interface = Some(path),
            },
            Some("dms") => {
                self.sink.emit(
                    WarningCode::UnimplementedAccess,
                    location,
                    "DMS files are not supported",
                );
            }
            _ => match self.loader.load(&path) {
                Ok(text) => self.push_source(&path, &text),
                Err(err) => {
                    self.sink.emit(
                        WarningCode::MissingIncludedFile,
                        location,
                        format!("Could not read included file \"{}\": {:#}", path, err),
                    );
                }
            },
        }
    }

    /// Push source text under a logical name, bypassing the loader
    pub fn push_source(
        &mut self,
        name: &str,
        text: &str,
    ) {
        self.lexers
            .push(PreprocessorLexer::new(name, text, self.sink.clone()));
    }

    fn current_file(&self) -> &str {
        self.lexers.last().map(|l| l.file().as_ref()).unwrap_or("")
    }

    fn push_token(
        &mut self,
        token: Token,
    ) {
        self.unprocessed.push(Pending { token, hidden: None });
    }

    fn next_pending(
        &mut self,
        ignore_whitespace: bool,
    ) -> Pending {
        loop {
            let pending = match self.unprocessed.pop() {
                Some(pending) => pending,
                None => {
                    let token = match self.lexers.last_mut() {
                        Some(lexer) => lexer.next_token(),
                        None => Token::eof(Location::UNKNOWN),
                    };
                    Pending { token, hidden: None }
                }
            };
            if ignore_whitespace && pending.token.kind == TokenKind::PreprocWhitespace {
                continue;
            }
            return pending;
        }
    }

    fn next_raw(
        &mut self,
        ignore_whitespace: bool,
    ) -> Token {
        self.next_pending(ignore_whitespace).token
    }

    /// Consume a token of `kind` if it comes next, whitespace included
    fn check(
        &mut self,
        kind: TokenKind,
    ) -> bool {
        let token = self.next_raw(false);
        if token.kind == kind {
            return true;
        }
        self.push_token(token);
        false
    }

    /// Like `check` but allows one whitespace token first
    fn check_ignoring_whitespace(
        &mut self,
        kind: TokenKind,
    ) -> Option<Token> {
        let first = self.next_raw(false);
        if first.kind == kind {
            return Some(first);
        }
        if first.kind != TokenKind::PreprocWhitespace {
            self.push_token(first);
            return None;
        }
        let second = self.next_raw(false);
        if second.kind == kind {
            return Some(second);
        }
        self.push_token(second);
        self.push_token(first);
        None
    }

    fn process(&mut self) {
        let Pending { token, hidden } = self.next_pending(false);

        match token.kind {
            TokenKind::PreprocWhitespace => {
                if self.line_has_content {
                    self.output.push_back(token);
                } else {
                    self.buffered_whitespace.push(token);
                }
            }
            TokenKind::EndOfFile => {
                if let Some(lexer) = self.lexers.pop() {
                    debug!("Finished {}", lexer.file());
                }
            }
            TokenKind::Newline => {
                self.can_use_directive = true;
                if !self.line_has_content {
                    self.buffered_whitespace.clear();
                    return;
                }
                self.line_has_content = false;
                self.output.push_back(token);
            }
            TokenKind::PreprocLineSplice => {
                let mut next = self.next_raw(true);
                while next.kind == TokenKind::Newline {
                    next = self.next_raw(true);
                }
                self.can_use_directive = true;
                self.push_token(next);
            }
            TokenKind::PreprocInclude => {
                if !self.line_has_content {
                    self.buffered_whitespace.clear();
                }
                self.handle_include(&token);
            }
            TokenKind::PreprocDefine => self.handle_define(&token),
            TokenKind::PreprocUndefine => self.handle_undefine(&token),
            TokenKind::PreprocIf => {
                self.buffered_whitespace.clear();
                self.handle_if(&token);
            }
            TokenKind::PreprocIfdef => self.handle_ifdef(&token, true),
            TokenKind::PreprocIfndef => self.handle_ifdef(&token, false),
            TokenKind::PreprocElif => self.handle_elif(&token),
            TokenKind::PreprocElse => self.handle_else(&token),
            TokenKind::PreprocEndIf => {
                if self.conditions.pop().is_none() {
                    self.sink
                        .emit(WarningCode::BadDirective, token.location, "Unexpected #endif");
                }
            }
            TokenKind::PreprocError | TokenKind::PreprocWarning => {
                if self.verify_directive_usage(&token) {
                    let code = if token.kind == TokenKind::PreprocError {
                        WarningCode::ErrorDirective
                    } else {
                        WarningCode::WarningDirective
                    };
                    self.sink.emit(code, token.location, token.text);
                }
            }
            TokenKind::PreprocPragma => self.handle_pragma(),
            TokenKind::PreprocIdentifier if self.try_macro(&token, hidden.as_deref()) => {}
            TokenKind::PreprocIdentifier
            | TokenKind::PreprocPunctuator
            | TokenKind::PreprocNumber
            | TokenKind::PreprocStringBegin
            | TokenKind::PreprocStringMiddle
            | TokenKind::PreprocStringEnd
            | TokenKind::PreprocConstantString
            | TokenKind::PreprocPunctuatorComma
            | TokenKind::PreprocPunctuatorPeriod
            | TokenKind::PreprocPunctuatorColon
            | TokenKind::PreprocPunctuatorQuestion
            | TokenKind::PreprocPunctuatorLeftParenthesis
            | TokenKind::PreprocPunctuatorRightParenthesis
            | TokenKind::PreprocPunctuatorLeftBracket
            | TokenKind::PreprocPunctuatorRightBracket
            | TokenKind::PreprocPunctuatorSemicolon => {
                self.output.extend(self.buffered_whitespace.drain(..));
                self.line_has_content = true;
                self.can_use_directive = token.kind == TokenKind::PreprocPunctuatorSemicolon;
                self.output.push_back(token);
            }
            TokenKind::Error | TokenKind::Warning => self.output.push_back(token),
            _ => {
                let message = format!(
                    "Invalid token encountered while preprocessing: {} ({})",
                    token.printable_text(),
                    token.kind
                );
                self.sink.emit(WarningCode::BadToken, token.location, message);
            }
        }
    }

    fn verify_directive_usage(
        &self,
        token: &Token,
    ) -> bool {
        if !self.directives_enabled {
            self.sink.emit(
                WarningCode::MisplacedDirective,
                token.location.clone(),
                "Cannot use a preprocessor directive here",
            );
            return false;
        }
        if !self.can_use_directive {
            self.sink.emit(
                WarningCode::MisplacedDirective,
                token.location.clone(),
                "There can only be whitespace before a preprocessor directive",
            );
            return false;
        }
        true
    }

    fn handle_include(
        &mut self,
        include: &Token,
    ) {
        if !self.verify_directive_usage(include) {
            return;
        }
        let path_token = self.next_raw(true);
        if path_token.kind != TokenKind::PreprocConstantString {
            self.sink.emit(
                WarningCode::InvalidInclusion,
                include.location.clone(),
                format!("\"{}\" is not a valid include path", path_token.text),
            );
            return;
        }
        let path = source::resolve_relative(self.current_file(), path_token.value_or_text());
        self.include_file(&path, Some(include.location.clone()));
    }

    fn handle_define(
        &mut self,
        define: &Token,
    ) {
        if !self.verify_directive_usage(define) {
            return;
        }

        let name = self.next_raw(true);
        if name.kind != TokenKind::PreprocIdentifier {
            self.sink.emit(
                WarningCode::BadDirective,
                name.location.clone(),
                "Unexpected token, identifier expected for #define directive",
            );
            self.discard_line(name);
            return;
        }

        if name.text == "FILE_DIR" {
            let dir_token = self.next_raw(true);
            let dir = match dir_token.kind {
                TokenKind::PreprocConstantString => dir_token.value_or_text().to_string(),
                TokenKind::PreprocPunctuatorPeriod => ".".to_string(),
                _ => {
                    self.sink.emit(
                        WarningCode::BadDirective,
                        dir_token.location.clone(),
                        format!("\"{}\" is not a valid directory", dir_token.text),
                    );
                    return;
                }
            };
            let dir = source::resolve_relative(self.current_file(), &dir);
            debug!("Resource directory {}", dir);
            if !self.resource_dirs.contains(&dir) {
                self.resource_dirs.push(dir);
            }
            return;
        }
        if name.text == "defined" {
            self.sink.emit(
                WarningCode::SoftReservedKeyword,
                name.location.clone(),
                "Reserved keyword 'defined' cannot be used as macro name",
            );
        }

        let mut parameters = None;
        let mut body = Vec::new();
        let mut token = self.next_raw(false);

        if token.kind == TokenKind::PreprocPunctuatorLeftParenthesis {
            match self.macro_parameters(&token) {
                Some(list) => parameters = Some(list),
                None => return,
            }
            token = self.next_raw(true);
        } else if token.kind == TokenKind::PreprocWhitespace {
            // Whitespace before `(` makes an object-like macro
            token = self.next_raw(false);
        }

        while !matches!(token.kind, TokenKind::Newline | TokenKind::EndOfFile) {
            if token.kind == TokenKind::PreprocLineSplice {
                // A splice followed by a blank line ends the body
                let next = self.next_raw(true);
                if next.kind == TokenKind::Newline {
                    token = next;
                    break;
                }
                body.push(token);
                token = next;
            } else {
                body.push(token);
                token = self.next_raw(false);
            }
        }
        if body.last().is_some_and(|t| t.kind == TokenKind::PreprocWhitespace) {
            body.pop();
        }

        self.defines.insert(name.text.clone(), Macro::text(parameters, body));
        self.push_token(token);
    }

    /// Parameter list of a function-like macro, after its `(`. `None` when
    /// the list is malformed badly enough to drop the definition.
    fn macro_parameters(
        &mut self,
        open: &Token,
    ) -> Option<Vec<String>> {
        let mut parameters: Vec<String> = Vec::new();
        let mut can_consume_comma = false;
        let mut found_variadic = false;

        loop {
            let token = self.next_raw(true);
            match token.kind {
                TokenKind::PreprocIdentifier => {
                    can_consume_comma = true;
                    if found_variadic {
                        self.variadic_not_last(&token, &parameters);
                        found_variadic = false;
                        continue;
                    }
                    if self.check(TokenKind::PreprocPunctuatorPeriod) {
                        if !self.check(TokenKind::PreprocPunctuatorPeriod) || !self.check(TokenKind::PreprocPunctuatorPeriod) {
                            self.sink.emit(
                                WarningCode::BadDirective,
                                token.location.clone(),
                                format!("Invalid macro parameter, '{}...' expected", token.text),
                            );
                        }
                        parameters.push(format!("{}...", token.text));
                        found_variadic = true;
                        continue;
                    }
                    parameters.push(token.text);
                }
                TokenKind::PreprocPunctuatorPeriod => {
                    if !self.check(TokenKind::PreprocPunctuatorPeriod) || !self.check(TokenKind::PreprocPunctuatorPeriod) {
                        self.sink.emit(
                            WarningCode::BadDirective,
                            token.location.clone(),
                            "Invalid macro parameter, '...' expected",
                        );
                    }
                    can_consume_comma = true;
                    if found_variadic {
                        self.variadic_not_last(&token, &parameters);
                        found_variadic = false;
                        continue;
                    }
                    parameters.push("...".to_string());
                }
                TokenKind::PreprocPunctuatorComma => {
                    if !can_consume_comma {
                        self.sink.emit(
                            WarningCode::BadDirective,
                            token.location.clone(),
                            "Unexpected ',' in macro parameter list",
                        );
                    }
                    can_consume_comma = false;
                }
                TokenKind::PreprocPunctuatorRightParenthesis => return Some(parameters),
                TokenKind::EndOfFile => {
                    self.sink.emit(
                        WarningCode::BadDirective,
                        open.location.clone(),
                        "Missing ')' in macro definition",
                    );
                    self.push_token(token);
                    return Some(parameters);
                }
                _ => {
                    self.sink.emit(
                        WarningCode::BadDirective,
                        token.location.clone(),
                        "Expected a macro parameter",
                    );
                    return None;
                }
            }
        }
    }

    fn variadic_not_last(
        &self,
        token: &Token,
        parameters: &[String],
    ) {
        let last = parameters.last().map(String::as_str).unwrap_or("...");
        self.sink.emit(
            WarningCode::BadDirective,
            token.location.clone(),
            format!("Variadic argument '{}' must be the last argument", last),
        );
    }

    fn handle_undefine(
        &mut self,
        undef: &Token,
    ) {
        if !self.verify_directive_usage(undef) {
            return;
        }
        let name = self.next_raw(true);
        if name.kind != TokenKind::PreprocIdentifier {
            self.sink
                .emit(WarningCode::BadDirective, name.location, "Invalid macro identifier");
            return;
        }
        if self.defines.remove(&name.text).is_none() {
            self.sink.emit(
                WarningCode::UndefineMissingDirective,
                name.location.clone(),
                format!("No macro named \"{}\"", name.printable_text()),
            );
        }
    }

    /// Drop the rest of a directive line, starting at `token`. The line end
    /// is left for the main loop.
    fn discard_line(
        &mut self,
        mut token: Token,
    ) {
        while !matches!(token.kind, TokenKind::Newline | TokenKind::EndOfFile) {
            token = self.next_raw(true);
        }
        self.push_token(token);
    }

    /// Rest of the current line as DM tokens, macros expanded except inside
    /// `defined(..)` and `fexists(..)`
    fn line_of_tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut expand_macros = true;
        loop {
            let Pending { token, hidden } = self.next_pending(true);
            match token.kind {
                TokenKind::Newline => break,
                TokenKind::EndOfFile => {
                    self.push_token(token);
                    break;
                }
                TokenKind::PreprocLineSplice => continue,
                TokenKind::PreprocIdentifier => {
                    if token.text == "defined" || token.text == "fexists" {
                        expand_macros = false;
                    } else if expand_macros && self.try_macro(&token, hidden.as_deref()) {
                        continue;
                    }
                }
                TokenKind::PreprocPunctuatorRightParenthesis => expand_macros = true,
                _ => {}
            }
            tokens.push(token);
        }

        let start = tokens
            .first()
            .map(|t| t.location.clone())
            .unwrap_or(Location::UNKNOWN);
        tokens.push(Token::simple(TokenKind::Newline, "\n", Location::UNKNOWN));
        DmLexer::new(tokens.into_iter(), start)
            .without_indentation()
            .into_tokens()
            .collect()
    }

    /// Expand `token` if it names a macro. Expanded tokens are pushed back
    /// for reprocessing.
    fn try_macro(
        &mut self,
        token: &Token,
        hidden: Option<&[String]>,
    ) -> bool {
        if hidden.is_some_and(|names| names.iter().any(|n| *n == token.text)) {
            return false;
        }
        let Some(definition) = self.defines.get(&token.text) else {
            return false;
        };
        let definition = definition.clone();

        let arguments = if definition.has_parameters() {
            match self.macro_arguments() {
                Some(arguments) => Some(arguments),
                None => return false,
            }
        } else {
            None
        };

        let mut names: Vec<String> = hidden.map(|h| h.to_vec()).unwrap_or_default();
        names.push(token.text.clone());
        let hidden: Arc<[String]> = names.into();

        let expanded = definition.expand(token, arguments.as_deref());
        for mut expanded_token in expanded.into_iter().rev() {
            expanded_token.location = token.location.clone();
            self.unprocessed.push(Pending {
                token: expanded_token,
                hidden: Some(hidden.clone()),
            });
        }
        true
    }

    /// Arguments of a function-like macro call. `None` when the name is not
    /// followed by `(`, or the call is unterminated.
    fn macro_arguments(&mut self) -> Option<Vec<Vec<Token>>> {
        let open = self.check_ignoring_whitespace(TokenKind::PreprocPunctuatorLeftParenthesis)?;

        let mut arguments = Vec::new();
        let mut current = Vec::new();
        let mut token = self.next_raw(true);
        while token.kind == TokenKind::Newline {
            token = self.next_raw(true);
        }

        let mut nesting = 1usize;
        loop {
            match token.kind {
                TokenKind::PreprocPunctuatorComma if nesting == 1 => {
                    arguments.push(std::mem::take(&mut current));
                    token = self.next_raw(true);
                    while token.kind == TokenKind::Newline {
                        current.push(Token::simple(TokenKind::PreprocLineSplice, "", token.location.clone()));
                        token = self.next_raw(true);
                    }
                    continue;
                }
                TokenKind::PreprocPunctuatorLeftParenthesis => nesting += 1,
                TokenKind::PreprocPunctuatorRightParenthesis => {
                    nesting -= 1;
                    if nesting == 0 {
                        break;
                    }
                }
                TokenKind::EndOfFile => {
                    self.push_token(token.clone());
                    break;
                }
                _ => {}
            }
            current.push(token);
            token = self.next_raw(false);
        }
        arguments.push(current);

        if token.kind != TokenKind::PreprocPunctuatorRightParenthesis {
            self.sink.emit(
                WarningCode::BadDirective,
                open.location,
                "Missing ')' in macro call",
            );
            return None;
        }
        Some(arguments)
    }

    /// A malformed conditional counts as false
    fn degenerate_if(&mut self) {
        self.conditions.push(Some(false));
        self.skip_if_body(false);
    }

    fn handle_if(
        &mut self,
        directive: &Token,
    ) {
        self.last_seen_if = directive.location.clone();
        if !self.verify_directive_usage(directive) {
            return;
        }

        let tokens = self.line_of_tokens();
        let has_expression = tokens
            .iter()
            .any(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::DmWhitespace));
        if !has_expression {
            self.sink.emit(
                WarningCode::BadDirective,
                directive.location.clone(),
                "Expression expected for #if",
            );
            self.degenerate_if();
            return;
        }

        let context = IfScope {
            defines: &self.defines,
            loader: self.loader.as_ref(),
            file: self.current_file(),
        };
        match expr::evaluate(&tokens, &context, &self.sink) {
            Ok(value) => {
                let taken = value != 0.0;
                self.conditions.push(Some(taken));
                if !taken {
                    self.skip_if_body(false);
                }
            }
            Err(err) => {
                debug!("#if evaluation failed: {}", err);
                self.sink.emit(
                    WarningCode::BadDirective,
                    directive.location.clone(),
                    "Expression is invalid",
                );
                self.degenerate_if();
            }
        }
    }

    fn handle_ifdef(
        &mut self,
        directive: &Token,
        want_defined: bool,
    ) {
        self.last_seen_if = directive.location.clone();
        if !self.verify_directive_usage(directive) {
            return;
        }
        let name = self.next_raw(true);
        if name.kind != TokenKind::PreprocIdentifier {
            self.sink.emit(
                WarningCode::BadDirective,
                directive.location.clone(),
                "Expected a define identifier",
            );
            self.degenerate_if();
            return;
        }
        let taken = self.defines.contains_key(&name.text) == want_defined;
        self.conditions.push(Some(taken));
        if !taken {
            self.skip_if_body(false);
        }
    }

    fn handle_elif(
        &mut self,
        directive: &Token,
    ) {
        match self.conditions.last().copied() {
            None => {
                self.sink
                    .emit(WarningCode::BadDirective, directive.location.clone(), "Unexpected #elif");
                self.handle_if(directive);
            }
            Some(None) => {
                self.sink.emit(
                    WarningCode::BadDirective,
                    directive.location.clone(),
                    "Directive #elif cannot appear after #else in its flow control",
                );
                self.skip_if_body(false);
            }
            Some(Some(true)) => {
                self.skip_if_body(false);
            }
            Some(Some(false)) => {
                self.conditions.pop();
                self.handle_if(directive);
            }
        }
    }

    fn handle_else(
        &mut self,
        directive: &Token,
    ) {
        match self.conditions.pop() {
            Some(Some(true)) => {
                self.skip_if_body(true);
            }
            Some(Some(false)) => self.conditions.push(None),
            Some(None) => {
                self.sink
                    .emit(WarningCode::BadDirective, directive.location.clone(), "Unexpected #else");
                self.skip_if_body(true);
            }
            None => {
                self.sink
                    .emit(WarningCode::BadDirective, directive.location.clone(), "Unexpected #else");
            }
        }
    }

    /// Skip to the end of a conditional body.
    ///
    /// Stops before an `#else`/`#elif` at this depth, or before the matching
    /// `#endif`. An `#else` body has no further branches, so then a branch
    /// is an error and the `#endif` is consumed.
    fn skip_if_body(
        &mut self,
        called_by_else: bool,
    ) -> bool {
        let mut depth = 1usize;
        loop {
            let token = self.next_raw(true);
            match token.kind {
                TokenKind::EndOfFile => {
                    self.push_token(token);
                    self.sink
                        .emit(WarningCode::BadDirective, Location::UNKNOWN, "Missing #endif directive");
                    return false;
                }
                TokenKind::PreprocIf | TokenKind::PreprocIfdef | TokenKind::PreprocIfndef => depth += 1,
                TokenKind::PreprocEndIf => {
                    depth -= 1;
                    if depth == 0 {
                        if !called_by_else {
                            self.push_token(token);
                        }
                        return false;
                    }
                }
                TokenKind::PreprocElse | TokenKind::PreprocElif if depth == 1 => {
                    if called_by_else {
                        self.sink.emit(
                            WarningCode::BadDirective,
                            token.location.clone(),
                            format!("Unexpected {} directive", token.printable_text()),
                        );
                    }
                    self.push_token(token);
                    return true;
                }
                _ => {}
            }
        }
    }

    fn handle_pragma(&mut self) {
        let name = self.next_raw(true);
        let code = match name.kind {
            TokenKind::PreprocIdentifier | TokenKind::PreprocNumber => WarningCode::parse(&name.text),
            _ => {
                self.sink.emit(
                    WarningCode::BadDirective,
                    name.location.clone(),
                    format!("Invalid warning identifier '{}'", name.printable_text()),
                );
                self.discard_line(name);
                return;
            }
        };
        let Some(code) = code else {
            self.sink.emit(
                WarningCode::InvalidWarningCode,
                name.location.clone(),
                format!("Warning '{}' does not exist", name.printable_text()),
            );
            self.discard_line(name);
            return;
        };
        if code.is_fatal_class() {
            self.sink.emit(
                WarningCode::BadDirective,
                name.location.clone(),
                format!("Warning {} cannot be set - it must always be an error", code),
            );
            self.discard_line(name);
            return;
        }

        let level_token = self.next_raw(true);
        let level = match level_token.kind {
            TokenKind::PreprocIdentifier => ErrorLevel::parse(&level_token.text),
            _ => None,
        };
        let applied = level.map(|level| self.sink.set_pragma(code, level));
        if !matches!(applied, Some(Ok(()))) {
            self.sink.emit(
                WarningCode::BadDirective,
                level_token.location.clone(),
                "Warnings can only be set to disabled, notice, warning, or error",
            );
        }
        if level_token.kind == TokenKind::Newline {
            self.push_token(level_token);
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let open = self.conditions.len();
        if open > 0 {
            let plural = if open != 1 { "s" } else { "" };
            self.sink.emit(
                WarningCode::BadDirective,
                self.last_seen_if.clone(),
                format!("Missing {} #endif directive{}", open, plural),
            );
        }
    }
}

impl Iterator for Preprocessor {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.output.pop_front() {
                return Some(token);
            }
            if self.lexers.is_empty() && self.unprocessed.is_empty() {
                self.finish();
                return None;
            }
            self.process();
        }
    }
}

struct IfScope<'a> {
    defines: &'a HashMap<String, Macro>,
    loader: &'a dyn SourceLoader,
    file: &'a str,
}

impl expr::IfContext for IfScope<'_> {
    fn is_defined(
        &self,
        name: &str,
    ) -> bool {
        self.defines.contains_key(name)
    }

    fn file_exists(
        &self,
        path: &str,
    ) -> bool {
        self.loader.exists(&source::resolve_relative(self.file, path)) || self.loader.exists(path)
    }
}

/// Render preprocessed tokens back to text. Diagnostic tokens are reported
/// to `sink` instead of printed.
pub fn render_text(
    tokens: impl IntoIterator<Item = Token>,
    sink: &DiagnosticSink,
) -> String {
    let mut text = String::new();
    for token in tokens {
        match token.kind {
            TokenKind::Error => {
                sink.emit(WarningCode::BadToken, token.location.clone(), token.value_or_text());
            }
            TokenKind::Warning => sink.forced_warning(token.location.clone(), token.value_or_text()),
            _ => text.push_str(&token.text),
        }
    }
    text
}

#[cfg(test)]
mod tests;
