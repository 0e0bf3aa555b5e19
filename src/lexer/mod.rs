//! Token vocabulary and the streaming tokenizer.
//!
//! The tokenizer is a buffered single-pass lexer over a [`ByteSource`]. It
//! emits typed tokens that reference bytes still sitting in the source
//! window; a token's text stays addressable until the *next* call to
//! [`Tokenizer::next_token`], which is when its bytes are consumed.

mod source;
mod tokenizer;

pub use source::{ByteSource, ReaderSource, SliceSource};
pub use tokenizer::Tokenizer;

/// Token tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    QuotedString,
    RawString,
    MultilineString,
    RawMultilineString,
    Integer,
    Float,
    HexInteger,
    OctalInteger,
    BinaryInteger,
    KeywordTrue,
    KeywordFalse,
    KeywordNull,
    KeywordInf,
    KeywordNegInf,
    KeywordNan,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Equals,
    Semicolon,
    Slashdash,
    Newline,
    Eof,
    /// A lexed run that is not a legal token on its own (e.g. a bare
    /// reserved keyword, or a stray `/`). The builder reports it.
    Invalid,
}

impl TokenKind {
    /// True for the string-shaped kinds (node names, property keys).
    #[inline]
    pub fn is_string(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::QuotedString
                | TokenKind::RawString
                | TokenKind::MultilineString
                | TokenKind::RawMultilineString
        )
    }

    /// True for kinds that can be an entry value.
    #[inline]
    pub fn is_value(self) -> bool {
        self.is_string()
            || matches!(
                self,
                TokenKind::Integer
                    | TokenKind::Float
                    | TokenKind::HexInteger
                    | TokenKind::OctalInteger
                    | TokenKind::BinaryInteger
                    | TokenKind::KeywordTrue
                    | TokenKind::KeywordFalse
                    | TokenKind::KeywordNull
                    | TokenKind::KeywordInf
                    | TokenKind::KeywordNegInf
                    | TokenKind::KeywordNan
            )
    }
}

/// Human-readable name for error messages.
pub fn kind_to_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Identifier => "identifier",
        TokenKind::QuotedString => "string",
        TokenKind::RawString => "raw string",
        TokenKind::MultilineString => "multiline string",
        TokenKind::RawMultilineString => "raw multiline string",
        TokenKind::Integer => "integer",
        TokenKind::Float => "number",
        TokenKind::HexInteger => "hex integer",
        TokenKind::OctalInteger => "octal integer",
        TokenKind::BinaryInteger => "binary integer",
        TokenKind::KeywordTrue => "'#true'",
        TokenKind::KeywordFalse => "'#false'",
        TokenKind::KeywordNull => "'#null'",
        TokenKind::KeywordInf => "'#inf'",
        TokenKind::KeywordNegInf => "'#-inf'",
        TokenKind::KeywordNan => "'#nan'",
        TokenKind::OpenParen => "'('",
        TokenKind::CloseParen => "')'",
        TokenKind::OpenBrace => "'{'",
        TokenKind::CloseBrace => "'}'",
        TokenKind::Equals => "'='",
        TokenKind::Semicolon => "';'",
        TokenKind::Slashdash => "'/-'",
        TokenKind::Newline => "newline",
        TokenKind::Eof => "end of file",
        TokenKind::Invalid => "invalid token",
    }
}

/// A lexed token. Spans are absolute byte offsets into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: u64,
    pub end: u64,
    /// 1-based position of the first byte.
    pub line: u32,
    pub col: u32,
    /// Whether whitespace, a comment, or a line continuation was skipped
    /// immediately before this token.
    pub preceded_by_whitespace: bool,
}

impl Token {
    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Classify a number-like run by radix prefix and shape.
pub(crate) fn classify_number(text: &str) -> TokenKind {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned.starts_with("0x") {
        TokenKind::HexInteger
    } else if unsigned.starts_with("0o") {
        TokenKind::OctalInteger
    } else if unsigned.starts_with("0b") {
        TokenKind::BinaryInteger
    } else if unsigned.contains(['.', 'e', 'E']) {
        TokenKind::Float
    } else {
        TokenKind::Integer
    }
}

/// Delimiter widths of a string token: bytes before and after the content.
pub(crate) fn content_bounds(kind: TokenKind, text: &[u8]) -> (usize, usize) {
    match kind {
        TokenKind::QuotedString => (1, 1),
        TokenKind::MultilineString => (3, 3),
        TokenKind::RawString | TokenKind::RawMultilineString => {
            let hashes = text.iter().take_while(|&&b| b == b'#').count();
            let quotes = if kind == TokenKind::RawString { 1 } else { 3 };
            (hashes + quotes, hashes + quotes)
        }
        _ => (0, 0),
    }
}

/// Strip string delimiters from a token's text: returns the content slice
/// between the quotes (and outside the `#` runs for raw strings).
pub fn string_content(kind: TokenKind, text: &[u8]) -> &[u8] {
    let (lead, trail) = content_bounds(kind, text);
    &text[lead..text.len() - trail]
}
