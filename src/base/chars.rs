//! Codepoint classification for the KDL 2.0 grammar.
//!
//! KDL defines identifiers by *exclusion*: any codepoint that is not
//! whitespace, not a newline, not disallowed, and not one of the ASCII
//! token terminators continues an identifier. The predicates here are the
//! single source of truth for those classes; the tokenizer, the structural
//! scanner, and the serializer's bare-string decision all go through them.

/// The byte-order mark. Consumed when it is the first codepoint of a
/// document, disallowed everywhere else.
pub const BOM: char = '\u{FEFF}';

// =============================================================================
// UTF-8 decoding
// =============================================================================

/// Number of bytes in the UTF-8 sequence introduced by `byte`.
///
/// Continuation and invalid lead bytes report 1 so the caller can emit a
/// malformed-UTF-8 error at that exact offset.
#[inline]
pub fn utf8_len(byte: u8) -> usize {
    match byte {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

/// Decode one codepoint from the front of `bytes`.
///
/// Returns `Some((char, len))` for a well-formed sequence, `None` for
/// malformed UTF-8 (bad lead byte, truncated sequence, overlong form, or a
/// surrogate encoding). `None` with an empty slice means "need more bytes"
/// to the streaming tokenizer, which distinguishes the two by length.
pub fn decode_utf8(bytes: &[u8]) -> Option<(char, usize)> {
    let first = *bytes.first()?;
    if first < 0x80 {
        return Some((first as char, 1));
    }
    let len = utf8_len(first);
    if len == 1 || bytes.len() < len {
        return None;
    }
    let mut cp = (first as u32) & (0x7F >> len);
    for &b in &bytes[1..len] {
        if b & 0xC0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | (b & 0x3F) as u32;
    }
    // Reject overlong encodings; char::from_u32 rejects surrogates.
    let min = match len {
        2 => 0x80,
        3 => 0x800,
        _ => 0x1_0000,
    };
    if cp < min {
        return None;
    }
    char::from_u32(cp).map(|c| (c, len))
}

// =============================================================================
// Character classes
// =============================================================================

/// Non-newline unicode whitespace recognized by KDL 2.0.
#[inline]
pub fn is_unicode_space(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{20}'
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Newline codepoints. CR+LF is folded into a single newline by the
/// tokenizer, not here.
#[inline]
pub fn is_newline(c: char) -> bool {
    matches!(
        c,
        '\u{A}' | '\u{B}' | '\u{C}' | '\u{D}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Codepoints disallowed in strings and identifiers: C0/C1 controls that
/// are not whitespace or newlines, direction-control characters, and the
/// BOM (the leading-BOM exception is handled by the tokenizer). Surrogates
/// never reach this predicate; they are rejected as malformed UTF-8.
#[inline]
pub fn is_disallowed(c: char) -> bool {
    matches!(
        c,
        '\u{0}'..='\u{8}'
            | '\u{E}'..='\u{1F}'
            | '\u{7F}'..='\u{84}'
            | '\u{86}'..='\u{9F}'
            | '\u{200E}'
            | '\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}'
    )
}

/// Fast ASCII predicate used by inner loops: bytes that terminate an
/// identifier or number token. Non-ASCII bytes are never terminators at the
/// byte level; the codepoint-level classes above decide those.
#[inline]
pub fn is_token_terminator(byte: u8) -> bool {
    TOKEN_TERMINATOR[byte as usize]
}

/// Lookup table behind [`is_token_terminator`].
pub(crate) static TOKEN_TERMINATOR: [bool; 256] = build_terminator_table();

const fn build_terminator_table() -> [bool; 256] {
    let mut table = [false; 256];
    let terminators = [
        b'{', b'}', b'(', b')', b'[', b']', b'/', b'\\', b'"', b'#', b';', b'=',
        // ASCII whitespace and newlines
        b'\t', b' ', b'\n', 0x0B, 0x0C, b'\r',
    ];
    let mut i = 0;
    while i < terminators.len() {
        table[terminators[i] as usize] = true;
        i += 1;
    }
    table
}

/// True if `c` may appear inside an identifier.
#[inline]
pub fn is_identifier_char(c: char) -> bool {
    if c.is_ascii() {
        !is_token_terminator(c as u8) && !is_disallowed(c)
    } else {
        !is_unicode_space(c) && !is_newline(c) && !is_disallowed(c)
    }
}

/// True if `text` would lex as a number rather than an identifier: an
/// optional sign, an optional dot, then an ASCII digit.
#[inline]
pub fn is_number_like(text: &str) -> bool {
    let text = text.strip_prefix(['+', '-']).unwrap_or(text);
    let text = text.strip_prefix('.').unwrap_or(text);
    text.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Words that must be written `#true`, `"true"`, etc. and are invalid as
/// bare identifiers. `-inf` is included: `#-inf` exists, so the bare
/// spelling is reserved alongside the others.
#[inline]
pub fn is_forbidden_bare(text: &str) -> bool {
    matches!(text, "true" | "false" | "null" | "inf" | "-inf" | "nan")
}

/// True if `text` is a valid bare identifier: non-empty, every codepoint an
/// identifier char, not number-like, and not a reserved keyword spelling.
pub fn is_valid_identifier(text: &str) -> bool {
    !text.is_empty()
        && !is_number_like(text)
        && !is_forbidden_bare(text)
        && text.chars().all(is_identifier_char)
}
