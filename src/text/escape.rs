//! String content processing: escapes and multiline dedent.
//!
//! These routines work on *delimited* content — the text between the
//! quotes, with the quotes and any raw-string hashes already stripped by
//! the tokenizer or index builder. They are position-blind; callers attach
//! line/column to any error.
//!
//! Multiline processing runs in two passes. The first pass walks the
//! content collecting line starts while skipping over escape extents, so a
//! whitespace escape that swallows a newline does not create a line
//! boundary. The second pass validates the closing line's whitespace-only
//! prefix (the dedent), strips it from every content line, and joins the
//! survivors with LF.

use std::borrow::Cow;

use thiserror::Error;

use crate::base::chars;

/// Lines whose raw whitespace-only status is tracked in a multiline
/// string. Lines past this limit are conservatively treated as content
/// lines and must carry the dedent prefix.
const MAX_TRACKED_LINES: usize = 256;

/// Failures from escape decoding or multiline-string semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EscapeError {
    #[error("invalid escape `\\{0}`")]
    InvalidEscape(char),
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,
    #[error("disallowed codepoint {0:?}")]
    DisallowedCodepoint(char),
    #[error("newline in single-line string")]
    NewlineInString,
    #[error("multiline string must start with a newline")]
    FirstLineNotEmpty,
    #[error("line does not start with the closing-line prefix")]
    DedentMismatch,
    #[error("closing line must be whitespace-only")]
    FinalLineNotWhitespace,
    #[error("string ended inside an escape")]
    TruncatedEscape,
}

/// Decode the escape starting *after* a backslash.
///
/// Returns the number of bytes consumed from `rest` and the decoded
/// codepoint, or `None` for a whitespace escape (which folds away). The
/// whitespace escape consumes a run of unicode whitespace containing at
/// most one newline (CR+LF counts as one).
pub fn escape_extent(rest: &str) -> Result<(usize, Option<char>), EscapeError> {
    let mut iter = rest.chars();
    let first = iter.next().ok_or(EscapeError::TruncatedEscape)?;
    let decoded = match first {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '\\' => '\\',
        '"' => '"',
        'b' => '\u{8}',
        'f' => '\u{C}',
        's' => ' ',
        'u' => {
            if iter.next() != Some('{') {
                return Err(EscapeError::InvalidUnicodeEscape);
            }
            let digits_start = 2;
            let mut end = digits_start;
            let bytes = rest.as_bytes();
            while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
                end += 1;
            }
            let digit_count = end - digits_start;
            if digit_count == 0 || digit_count > 6 || bytes.get(end) != Some(&b'}') {
                return Err(EscapeError::InvalidUnicodeEscape);
            }
            let cp = u32::from_str_radix(&rest[digits_start..end], 16)
                .map_err(|_| EscapeError::InvalidUnicodeEscape)?;
            // char::from_u32 rejects surrogates and > U+10FFFF.
            let c = char::from_u32(cp).ok_or(EscapeError::InvalidUnicodeEscape)?;
            return Ok((end + 1, Some(c)));
        }
        c if chars::is_unicode_space(c) || chars::is_newline(c) => {
            let mut consumed = 0;
            let mut newline_seen = false;
            let mut it = rest.chars().peekable();
            while let Some(&c) = it.peek() {
                if chars::is_unicode_space(c) {
                    consumed += c.len_utf8();
                    it.next();
                } else if chars::is_newline(c) && !newline_seen {
                    newline_seen = true;
                    consumed += c.len_utf8();
                    it.next();
                    if c == '\r' && it.peek() == Some(&'\n') {
                        consumed += 1;
                        it.next();
                    }
                } else {
                    break;
                }
            }
            return Ok((consumed, None));
        }
        other => return Err(EscapeError::InvalidEscape(other)),
    };
    Ok((first.len_utf8(), Some(decoded)))
}

/// Decode escapes in single-line quoted-string content.
///
/// Borrows when the content contains no backslash. Raw newlines are
/// rejected: a single-line string cannot span lines except through a
/// whitespace escape.
pub fn decode_escapes(content: &str) -> Result<Cow<'_, str>, EscapeError> {
    validate_plain(content, true)?;
    let Some(first_backslash) = content.find('\\') else {
        return Ok(Cow::Borrowed(content));
    };
    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..first_backslash]);
    let mut rest = &content[first_backslash..];
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let (consumed, decoded) = escape_extent(&rest[pos + 1..])?;
        out.extend(decoded);
        rest = &rest[pos + 1 + consumed..];
    }
    out.push_str(rest);
    Ok(out.into())
}

/// Validate raw single-line string content (no escape processing).
pub fn validate_raw_single(content: &str) -> Result<(), EscapeError> {
    validate_plain(content, false)
}

/// Shared content validation: disallowed codepoints everywhere, newlines
/// outside escape extents.
fn validate_plain(content: &str, skip_escapes: bool) -> Result<(), EscapeError> {
    let mut rest = content;
    while let Some(c) = rest.chars().next() {
        if skip_escapes && c == '\\' {
            let (consumed, _) = escape_extent(&rest[1..])?;
            rest = &rest[1 + consumed..];
            continue;
        }
        if chars::is_newline(c) {
            return Err(EscapeError::NewlineInString);
        }
        if chars::is_disallowed(c) {
            return Err(EscapeError::DisallowedCodepoint(c));
        }
        rest = &rest[c.len_utf8()..];
    }
    Ok(())
}

/// Process multiline string content (between the opening `"""` and the
/// closing `"""`, both exclusive). `process_escapes` is false for raw
/// multiline strings, whose dedent and structure rules are identical.
pub fn process_multiline(content: &str, process_escapes: bool) -> Result<String, EscapeError> {
    // Pass 1: collect line starts, skipping escape extents so a whitespace
    // escape that consumes a newline does not split a line. Also validates
    // escape syntax and disallowed codepoints once.
    let mut line_starts: Vec<usize> = Vec::new();
    let mut pos = 0;
    while let Some(c) = content[pos..].chars().next() {
        if process_escapes && c == '\\' {
            let (consumed, decoded) = escape_extent(&content[pos + 1..])?;
            if line_starts.is_empty() && decoded.is_some() {
                return Err(EscapeError::FirstLineNotEmpty);
            }
            pos += 1 + consumed;
            continue;
        }
        if chars::is_newline(c) {
            pos += c.len_utf8();
            if c == '\r' && content.as_bytes().get(pos) == Some(&b'\n') {
                pos += 1;
            }
            line_starts.push(pos);
            continue;
        }
        if chars::is_disallowed(c) {
            return Err(EscapeError::DisallowedCodepoint(c));
        }
        if line_starts.is_empty() {
            return Err(EscapeError::FirstLineNotEmpty);
        }
        pos += c.len_utf8();
    }

    // The closing line is mandatory: content must contain at least the
    // newline that ends the (empty) first line.
    let Some(&last_start) = line_starts.last() else {
        return Err(EscapeError::FirstLineNotEmpty);
    };
    let body_lines = &line_starts[..line_starts.len() - 1];

    // Pass 2a: the closing line is whitespace-only after escape processing;
    // its raw whitespace prefix (before any escape) is the dedent.
    let closing = &content[last_start..];
    let mut dedent_end = closing.len();
    {
        let mut rest = closing;
        let mut offset = 0;
        let mut prefix_open = true;
        while let Some(c) = rest.chars().next() {
            if process_escapes && c == '\\' {
                let (consumed, decoded) = escape_extent(&rest[1..])?;
                if decoded.is_some() {
                    return Err(EscapeError::FinalLineNotWhitespace);
                }
                if prefix_open {
                    dedent_end = offset;
                    prefix_open = false;
                }
                offset += 1 + consumed;
                rest = &rest[1 + consumed..];
                continue;
            }
            if !chars::is_unicode_space(c) {
                return Err(EscapeError::FinalLineNotWhitespace);
            }
            offset += c.len_utf8();
            rest = &rest[c.len_utf8()..];
        }
        if prefix_open {
            dedent_end = offset;
        }
    }
    let dedent = &closing[..dedent_end];

    // Pass 2b: strip the dedent from every body line and decode content.
    let mut out_lines: Vec<String> = Vec::with_capacity(body_lines.len());
    for (line_no, &start) in body_lines.iter().enumerate() {
        // Raw whitespace-only lines emit as empty, but only while the line
        // is within the tracked range.
        if line_no < MAX_TRACKED_LINES && raw_line_is_whitespace(&content[start..]) {
            out_lines.push(String::new());
            continue;
        }
        let line = &content[start..];
        if !line.starts_with(dedent) {
            return Err(EscapeError::DedentMismatch);
        }
        let mut rest = &line[dedent.len()..];
        let mut text = String::new();
        while let Some(c) = rest.chars().next() {
            if process_escapes && c == '\\' {
                let (consumed, decoded) = escape_extent(&rest[1..])?;
                text.extend(decoded);
                rest = &rest[1 + consumed..];
                continue;
            }
            if chars::is_newline(c) {
                break;
            }
            text.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out_lines.push(text);
    }
    Ok(out_lines.join("\n"))
}

/// True if the line (text from a line start up to its own newline) is made
/// entirely of unicode whitespace in its raw, pre-escape form.
fn raw_line_is_whitespace(line: &str) -> bool {
    for c in line.chars() {
        if chars::is_newline(c) {
            return true;
        }
        if !chars::is_unicode_space(c) {
            return false;
        }
    }
    // Unterminated line: this is the closing line, never queried here, but
    // whitespace-only content still counts.
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_borrows() {
        let out = decode_escapes("hello world").unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(decode_escapes(r"a\nb").unwrap(), "a\nb");
        assert_eq!(decode_escapes(r"a\tb\\c").unwrap(), "a\tb\\c");
        assert_eq!(decode_escapes(r#"say \"hi\""#).unwrap(), "say \"hi\"");
        assert_eq!(decode_escapes(r"x\sy").unwrap(), "x y");
        assert_eq!(decode_escapes(r"\b\f").unwrap(), "\u{8}\u{C}");
    }

    #[test]
    fn test_unicode_escapes() {
        assert_eq!(decode_escapes(r"\u{41}").unwrap(), "A");
        assert_eq!(decode_escapes(r"\u{1F980}").unwrap(), "🦀");
        assert_eq!(
            decode_escapes(r"\u{D800}"),
            Err(EscapeError::InvalidUnicodeEscape)
        );
        assert_eq!(
            decode_escapes(r"\u{}"),
            Err(EscapeError::InvalidUnicodeEscape)
        );
        assert_eq!(
            decode_escapes(r"\u{1234567}"),
            Err(EscapeError::InvalidUnicodeEscape)
        );
    }

    #[test]
    fn test_whitespace_escape_folds() {
        assert_eq!(decode_escapes("a\\   b").unwrap(), "ab");
        assert_eq!(decode_escapes("a\\ \n  b").unwrap(), "ab");
        assert_eq!(decode_escapes("a\\\r\n  b").unwrap(), "ab");
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(decode_escapes(r"a\qb"), Err(EscapeError::InvalidEscape('q')));
    }

    #[test]
    fn test_raw_newline_rejected() {
        assert_eq!(decode_escapes("a\nb"), Err(EscapeError::NewlineInString));
        assert_eq!(validate_raw_single("a\nb"), Err(EscapeError::NewlineInString));
        assert!(validate_raw_single(r"a\qb").is_ok());
    }

    #[test]
    fn test_multiline_dedent_keeps_surplus() {
        // Closing-line prefix is two spaces; content keeps its surplus.
        let content = "\n    hey\n   everyone\n     how goes?\n  ";
        assert_eq!(
            process_multiline(content, true).unwrap(),
            "  hey\n everyone\n   how goes?"
        );
    }

    #[test]
    fn test_multiline_whitespace_only_lines_emit_empty() {
        let content = "\n    a\n\n      \n    b\n    ";
        assert_eq!(process_multiline(content, true).unwrap(), "a\n\n\nb");
    }

    #[test]
    fn test_multiline_first_line_must_be_empty() {
        assert_eq!(
            process_multiline("x\n  ", true),
            Err(EscapeError::FirstLineNotEmpty)
        );
        assert_eq!(
            process_multiline(" \nx\n ", true),
            Err(EscapeError::FirstLineNotEmpty)
        );
    }

    #[test]
    fn test_multiline_dedent_mismatch() {
        let content = "\n\ta\n  ";
        assert_eq!(
            process_multiline(content, true),
            Err(EscapeError::DedentMismatch)
        );
    }

    #[test]
    fn test_multiline_tabs_and_spaces_not_interchangeable() {
        // Closing prefix is one tab; a space-indented line must not match.
        let content = "\n a\n\t";
        assert_eq!(
            process_multiline(content, true),
            Err(EscapeError::DedentMismatch)
        );
    }

    #[test]
    fn test_multiline_final_line_content_rejected() {
        assert_eq!(
            process_multiline("\n  a\n  b", true),
            Err(EscapeError::FinalLineNotWhitespace)
        );
    }

    #[test]
    fn test_multiline_escape_consumed_dedent() {
        // The whitespace escape at the end of the content line swallows the
        // newline and the would-be closing line, so the line holding `a`
        // becomes the closing line; re-validating it catches the content.
        let content = "\n  a\\\n  ";
        assert_eq!(
            process_multiline(content, true),
            Err(EscapeError::FinalLineNotWhitespace)
        );
    }

    #[test]
    fn test_multiline_ws_escape_joins_lines() {
        let content = "\n  a \\\n     more\n  ";
        assert_eq!(process_multiline(content, true).unwrap(), "a more");
    }

    #[test]
    fn test_multiline_escape_producing_on_final_line() {
        assert_eq!(
            process_multiline("\n  a\n  \\t", true),
            Err(EscapeError::FinalLineNotWhitespace)
        );
    }

    #[test]
    fn test_multiline_raw_keeps_backslashes() {
        let content = "\n  a\\nb\n  ";
        assert_eq!(process_multiline(content, false).unwrap(), "a\\nb");
    }

    #[test]
    fn test_multiline_crlf_normalized() {
        let content = "\r\n  a\r\n  b\r\n  ";
        assert_eq!(process_multiline(content, true).unwrap(), "a\nb");
    }

    #[test]
    fn test_multiline_empty_value() {
        assert_eq!(process_multiline("\n", true).unwrap(), "");
        assert_eq!(process_multiline("\n  ", true).unwrap(), "");
    }

    #[test]
    fn test_multiline_ws_escape_in_closing_prefix() {
        // Escape in the closing line: the dedent is the raw whitespace
        // before it.
        let content = "\n  a\n  \\ ";
        assert_eq!(process_multiline(content, true).unwrap(), "a");
    }
}
