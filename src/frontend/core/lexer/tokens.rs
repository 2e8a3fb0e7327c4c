//! Token types shared by every grammar

use crate::util::span::Location;

/// Token kind.
///
/// One flat set covers the base lexer, the preprocessor, DM and NTSL so that
/// layered lexers can hand tokens to each other without conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Base lexer
    /// Finalized diagnostic; the value holds the message
    Error,
    /// Finalized diagnostic; the value holds the message
    Warning,
    Unknown,
    /// Dropped by `Lexer::next_token`
    Skip,

    // Text
    Newline,
    EndOfFile,

    // Preprocessor
    PreprocConstantString,
    PreprocDefine,
    PreprocElse,
    PreprocEndIf,
    PreprocError,
    PreprocIdentifier,
    PreprocIf,
    PreprocIfdef,
    PreprocIfndef,
    PreprocElif,
    PreprocInclude,
    PreprocLineSplice,
    PreprocNumber,
    PreprocParameterStringify,
    PreprocPragma,
    PreprocPunctuator,
    PreprocPunctuatorColon,
    PreprocPunctuatorComma,
    PreprocPunctuatorLeftBracket,
    PreprocPunctuatorLeftParenthesis,
    PreprocPunctuatorPeriod,
    PreprocPunctuatorQuestion,
    PreprocPunctuatorRightBracket,
    PreprocPunctuatorRightParenthesis,
    PreprocPunctuatorSemicolon,
    PreprocStringBegin,
    PreprocStringMiddle,
    PreprocStringEnd,
    PreprocTokenConcat,
    PreprocUndefine,
    PreprocWarning,
    PreprocWhitespace,

    // DM
    DmAnd,
    DmAndAnd,
    DmAndEquals,
    DmAndAndEquals,
    DmAs,
    DmAssignInto,
    DmBar,
    DmBarBar,
    DmBarEquals,
    DmBarBarEquals,
    DmBreak,
    DmCall,
    DmCatch,
    DmColon,
    DmComma,
    DmConstantString,
    DmContinue,
    DmDedent,
    DmDel,
    DmDo,
    DmDoubleColon,
    DmDoubleSquareBracket,
    DmDoubleSquareBracketEquals,
    DmElse,
    DmEquals,
    DmEqualsEquals,
    DmExclamation,
    DmExclamationEquals,
    DmFloat,
    DmFor,
    DmGoto,
    DmGreaterThan,
    DmGreaterThanEquals,
    DmIdentifier,
    DmIf,
    DmIn,
    DmIndent,
    DmIndeterminateArgs,
    DmRightShift,
    DmRightShiftEquals,
    DmInteger,
    DmLeftBracket,
    DmLeftCurlyBracket,
    DmLeftParenthesis,
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
    DmNew,
    DmNull,
    DmPeriod,
    DmPlus,
    DmPlusEquals,
    DmPlusPlus,
    DmProc,
    DmQuestion,
    DmQuestionColon,
    DmQuestionLeftBracket,
    DmQuestionPeriod,
    DmRawString,
    DmResource,
    DmReturn,
    DmRightBracket,
    DmRightCurlyBracket,
    DmRightParenthesis,
    DmSemicolon,
    DmSet,
    DmSlash,
    DmSlashEquals,
    DmSpawn,
    DmStar,
    DmStarEquals,
    DmStarStar,
    DmStep,
    DmStringBegin,
    DmStringMiddle,
    DmStringEnd,
    DmSuperProc,
    DmSwitch,
    DmThrow,
    DmTilde,
    DmTildeEquals,
    DmTildeExclamation,
    DmTo,
    DmTry,
    DmVar,
    DmWhile,
    DmWhitespace,
    DmXor,
    DmXorEquals,

    // NTSL
    NtslAdd,
    NtslComma,
    NtslDef,
    NtslEndFile,
    NtslEquals,
    NtslIdentifier,
    NtslLeftCurlyBracket,
    NtslLeftParenthesis,
    NtslNumber,
    NtslReturn,
    NtslRightCurlyBracket,
    NtslRightParenthesis,
    NtslSemicolon,
    NtslStartFile,
    NtslString,
    NtslVarIdentifierPrefix,
}

impl TokenKind {
    /// Diagnostic tokens are routed to the sink, never parsed
    #[inline]
    pub fn is_diagnostic(self) -> bool {
        matches!(self, TokenKind::Error | TokenKind::Warning)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Decoded literal value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TokenValue {
    #[default]
    None,
    Int(i32),
    Float(f32),
    Str(String),
}

/// Token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text exactly as written
    pub text: String,
    pub location: Location,
    pub value: TokenValue,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        location: Location,
        value: TokenValue,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            location,
            value,
        }
    }

    /// Token with no decoded value
    pub fn simple(
        kind: TokenKind,
        text: impl Into<String>,
        location: Location,
    ) -> Self {
        Self::new(kind, text, location, TokenValue::None)
    }

    /// An `Error` token carrying `message`
    pub fn error(
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            TokenKind::Error,
            String::new(),
            location,
            TokenValue::Str(message.into()),
        )
    }

    /// A `Warning` token carrying `message`
    pub fn warning(
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            TokenKind::Warning,
            String::new(),
            location,
            TokenValue::Str(message.into()),
        )
    }

    pub fn eof(location: Location) -> Self {
        Self::simple(TokenKind::EndOfFile, "\0", location)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            TokenValue::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.value {
            TokenValue::Float(v) => Some(v),
            TokenValue::Int(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The string value, or the raw text when there is none
    pub fn value_or_text(&self) -> &str {
        self.as_str().unwrap_or(&self.text)
    }

    /// Text with control characters escaped, for messages
    pub fn printable_text(&self) -> String {
        self.text
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }
}

impl std::fmt::Display for Token {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}({}, {})", self.kind, self.location, self.printable_text())
    }
}
