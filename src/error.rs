//! Error taxonomy for parsing and serialization.
//!
//! Parsing fails at the first error, with no speculative recovery. Every
//! failure is one of four kinds: lexical (token-level), grammar
//! (token-sequence level), string semantics (multiline/dedent rules), or
//! resource (limits and I/O). The descriptor carries the 1-based
//! line/column and the absolute byte offset when they are known.

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::LineCol;

/// Crate-wide parse result.
pub type Result<T> = std::result::Result<T, ParseError>;

/// A parse failure with its source location.
#[derive(Debug, Error)]
#[error("{kind} at {position} (byte {offset})")]
pub struct ParseError {
    #[source]
    pub kind: ErrorKind,
    /// 1-based line/column of the failure.
    pub position: LineCol,
    /// Absolute byte offset of the failure.
    pub offset: u64,
}

impl ParseError {
    pub fn new(kind: impl Into<ErrorKind>, position: LineCol, offset: u64) -> Self {
        Self {
            kind: kind.into(),
            position,
            offset,
        }
    }

    /// Attach a position to a kind produced by position-blind code (the
    /// text processors work on detached slices).
    pub fn at(kind: impl Into<ErrorKind>, position: LineCol, offset: u64) -> Self {
        Self::new(kind, position, offset)
    }
}

/// The four failure categories.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    String(#[from] StringError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Token-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexicalError {
    #[error("malformed UTF-8")]
    MalformedUtf8,
    #[error("disallowed codepoint {0:?}")]
    DisallowedCodepoint(char),
    #[error("invalid escape `\\{0}`")]
    InvalidEscape(SmolStr),
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,
    #[error("invalid number `{0}`")]
    InvalidNumber(SmolStr),
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedBlockComment,
    #[error("raw string terminator needs {expected} `#`")]
    MismatchedRawHashes { expected: u32 },
    #[error("unknown keyword `#{0}`")]
    UnknownKeyword(SmolStr),
}

/// Token-sequence failures raised by the builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: &'static str,
        found: SmolStr,
    },
    #[error("`{0}` must be written `#{0}` or quoted")]
    ReservedKeyword(SmolStr),
    #[error("missing whitespace before entry")]
    MissingWhitespace,
    #[error("property key must be a string")]
    PropertyKeyNotString,
    #[error("type annotation is not allowed on a property key")]
    PropertyKeyTypeAnnotation,
    #[error("node already has a children block")]
    MultipleChildrenBlocks,
    #[error("entries are not allowed after a children block")]
    EntryAfterChildren,
    #[error("unclosed children block")]
    UnclosedBrace,
    #[error("unmatched `}}`")]
    UnexpectedCloseBrace,
    #[error("missing terminator after node")]
    MissingNodeTerminator,
}

/// Multiline-string semantics failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StringError {
    #[error("multiline string must start with a newline after `\"\"\"`")]
    FirstLineNotEmpty,
    #[error("multiline string line does not start with the closing-line prefix")]
    DedentMismatch,
    #[error("characters before closing `\"\"\"` must be whitespace")]
    FinalLineNotWhitespace,
}

/// Limit and I/O failures.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("nesting exceeds maximum depth {0}")]
    NestingTooDeep(u16),
    #[error("stream exceeds maximum document size {0}")]
    StreamTooLong(usize),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable diagnostic codes for filtering and tooling.
///
/// - `E01xx`: lexical errors
/// - `E02xx`: grammar errors
/// - `E03xx`: string-semantics errors
/// - `E04xx`: resource errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    E0101,
    E0102,
    E0103,
    E0104,
    E0105,
    E0106,
    E0107,
    E0108,
    E0109,
    E0201,
    E0202,
    E0203,
    E0204,
    E0205,
    E0206,
    E0207,
    E0208,
    E0209,
    E0210,
    E0301,
    E0302,
    E0303,
    E0401,
    E0402,
    E0403,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl ErrorKind {
    /// The stable code for this kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            ErrorKind::Lexical(e) => match e {
                LexicalError::MalformedUtf8 => ErrorCode::E0101,
                LexicalError::DisallowedCodepoint(_) => ErrorCode::E0102,
                LexicalError::InvalidEscape(_) => ErrorCode::E0103,
                LexicalError::InvalidUnicodeEscape => ErrorCode::E0104,
                LexicalError::InvalidNumber(_) => ErrorCode::E0105,
                LexicalError::UnterminatedString => ErrorCode::E0106,
                LexicalError::UnterminatedBlockComment => ErrorCode::E0107,
                LexicalError::MismatchedRawHashes { .. } => ErrorCode::E0108,
                LexicalError::UnknownKeyword(_) => ErrorCode::E0109,
            },
            ErrorKind::Grammar(e) => match e {
                GrammarError::UnexpectedToken { .. } => ErrorCode::E0201,
                GrammarError::ReservedKeyword(_) => ErrorCode::E0202,
                GrammarError::MissingWhitespace => ErrorCode::E0203,
                GrammarError::PropertyKeyNotString => ErrorCode::E0204,
                GrammarError::PropertyKeyTypeAnnotation => ErrorCode::E0205,
                GrammarError::MultipleChildrenBlocks => ErrorCode::E0206,
                GrammarError::EntryAfterChildren => ErrorCode::E0207,
                GrammarError::UnclosedBrace => ErrorCode::E0208,
                GrammarError::UnexpectedCloseBrace => ErrorCode::E0209,
                GrammarError::MissingNodeTerminator => ErrorCode::E0210,
            },
            ErrorKind::String(e) => match e {
                StringError::FirstLineNotEmpty => ErrorCode::E0301,
                StringError::DedentMismatch => ErrorCode::E0302,
                StringError::FinalLineNotWhitespace => ErrorCode::E0303,
            },
            ErrorKind::Resource(e) => match e {
                ResourceError::NestingTooDeep(_) => ErrorCode::E0401,
                ResourceError::StreamTooLong(_) => ErrorCode::E0402,
                ResourceError::Io(_) => ErrorCode::E0403,
            },
        }
    }
}

impl ParseError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        self.kind.code()
    }
}

/// Truncate token text for embedding in an error message.
pub(crate) fn excerpt(text: &[u8]) -> SmolStr {
    const MAX: usize = 24;
    let text = String::from_utf8_lossy(text);
    if text.len() <= MAX {
        SmolStr::new(&*text)
    } else {
        let mut cut = MAX;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        SmolStr::new(format!("{}…", &text[..cut]))
    }
}
