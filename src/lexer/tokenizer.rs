//! The buffered streaming tokenizer.
//!
//! One pass over a [`ByteSource`]. Intertoken whitespace, comments, and
//! line continuations are consumed eagerly; token bytes are left in the
//! window until the next [`next_token`](Tokenizer::next_token) call so the
//! caller can read the token's text without a copy.

use smol_str::SmolStr;

use crate::base::chars::{
    decode_utf8, is_disallowed, is_forbidden_bare, is_identifier_char, is_newline,
    is_number_like, is_unicode_space, utf8_len,
};
use crate::base::scan::{find_identifier_end, find_string_terminator, leading_indent_len};
use crate::base::{LineCol, PositionTracker};
use crate::error::{LexicalError, ParseError, Result, excerpt};

use super::source::ByteSource;
use super::{Token, TokenKind, classify_number};

/// Streaming lexer over a byte source.
pub struct Tokenizer<S> {
    source: S,
    tracker: PositionTracker,
    /// Bytes of the most recent token, not yet consumed from the window.
    pending: usize,
    at_start: bool,
}

impl<S: ByteSource> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            tracker: PositionTracker::new(),
            pending: 0,
            at_start: true,
        }
    }

    /// The underlying source (for borrowed string refs on slice inputs).
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Text of the most recent token. Valid until the next `next_token`.
    pub fn text(&self, token: &Token) -> &[u8] {
        debug_assert_eq!(token.start, self.source.offset());
        &self.source.window()[..token.len()]
    }

    /// Lex the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        if self.pending > 0 {
            let n = self.pending;
            self.pending = 0;
            self.consume_tracked(n);
        }
        if self.at_start {
            self.at_start = false;
            let w = self.fill(3)?;
            if w.starts_with(&[0xEF, 0xBB, 0xBF]) {
                // Leading BOM is invisible: consumed without a column.
                self.source.consume(3);
            }
        }

        let ws = self.skip_trivia()?;
        let start = self.source.offset();
        let pos = self.tracker.current();

        let token = |kind: TokenKind, len: usize| Token {
            kind,
            start,
            end: start + len as u64,
            line: pos.line,
            col: pos.col,
            preceded_by_whitespace: ws,
        };

        let w = self.fill(4)?;
        let Some(&b) = w.first() else {
            return Ok(token(TokenKind::Eof, 0));
        };

        let (kind, len) = match b {
            b'\n' | 0x0B | 0x0C | b'\r' => {
                let len = if b == b'\r' && w.get(1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                (TokenKind::Newline, len)
            }
            b'{' => (TokenKind::OpenBrace, 1),
            b'}' => (TokenKind::CloseBrace, 1),
            b'(' => (TokenKind::OpenParen, 1),
            b')' => (TokenKind::CloseParen, 1),
            b';' => (TokenKind::Semicolon, 1),
            b'=' => (TokenKind::Equals, 1),
            b'/' => {
                if w.get(1) == Some(&b'-') {
                    (TokenKind::Slashdash, 2)
                } else {
                    (TokenKind::Invalid, 1)
                }
            }
            b'[' | b']' => (TokenKind::Invalid, 1),
            b'"' => self.scan_string(0)?,
            b'#' => self.scan_hash()?,
            b if b < 0x20 || b == 0x7F => {
                return Err(self.error_at(LexicalError::DisallowedCodepoint(b as char), 0));
            }
            b if b < 0x80 => self.scan_word()?,
            _ => match decode_utf8(w) {
                None => return Err(self.error_at(LexicalError::MalformedUtf8, 0)),
                Some((c, len)) if is_newline(c) => (TokenKind::Newline, len),
                Some((c, _)) if is_identifier_char(c) => self.scan_word()?,
                Some((c, _)) => {
                    return Err(self.error_at(LexicalError::DisallowedCodepoint(c), 0));
                }
            },
        };

        self.pending = len;
        Ok(token(kind, len))
    }

    // =========================================================================
    // Trivia
    // =========================================================================

    /// Consume whitespace, comments, and line continuations. Returns true
    /// if anything was skipped.
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut skipped = false;
        loop {
            let w = self.fill(4)?;
            let Some(&b) = w.first() else {
                return Ok(skipped);
            };
            match b {
                b' ' | b'\t' => {
                    let n = leading_indent_len(w);
                    self.tracker.advance_ascii(n);
                    self.source.consume(n);
                    skipped = true;
                }
                b'\\' => {
                    self.consume_escline()?;
                    skipped = true;
                }
                b'/' => match w.get(1) {
                    Some(b'/') => {
                        self.skip_line_comment()?;
                        skipped = true;
                    }
                    Some(b'*') => {
                        self.skip_block_comment()?;
                        skipped = true;
                    }
                    _ => return Ok(skipped),
                },
                b if b < 0x80 => return Ok(skipped),
                _ => match decode_utf8(w) {
                    Some((c, len)) if is_unicode_space(c) => {
                        self.tracker.advance(c);
                        self.source.consume(len);
                        skipped = true;
                    }
                    _ => return Ok(skipped),
                },
            }
        }
    }

    /// Skip a `//` comment up to — but not including — its newline.
    fn skip_line_comment(&mut self) -> Result<()> {
        self.consume_tracked(2);
        loop {
            let w = self.fill(4)?;
            if w.is_empty() {
                return Ok(());
            }
            let Some((c, len)) = decode_utf8(w) else {
                return Err(self.error_at(LexicalError::MalformedUtf8, 0));
            };
            if is_newline(c) {
                return Ok(());
            }
            if is_disallowed(c) {
                return Err(self.error_at(LexicalError::DisallowedCodepoint(c), 0));
            }
            self.tracker.advance(c);
            self.source.consume(len);
        }
    }

    /// Skip a `/* ... */` comment, tracking nesting depth.
    fn skip_block_comment(&mut self) -> Result<()> {
        let open_pos = self.tracker.current();
        let open_offset = self.source.offset();
        self.consume_tracked(2);
        let mut depth = 1u32;
        loop {
            let w = self.fill(4)?;
            if w.is_empty() {
                return Err(ParseError::new(
                    LexicalError::UnterminatedBlockComment,
                    open_pos,
                    open_offset,
                ));
            }
            if w.starts_with(b"*/") {
                self.consume_tracked(2);
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
                continue;
            }
            if w.starts_with(b"/*") {
                self.consume_tracked(2);
                depth += 1;
                continue;
            }
            let Some((c, len)) = decode_utf8(w) else {
                return Err(self.error_at(LexicalError::MalformedUtf8, 0));
            };
            if is_disallowed(c) {
                return Err(self.error_at(LexicalError::DisallowedCodepoint(c), 0));
            }
            self.tracker.advance(c);
            self.source.consume(len);
        }
    }

    /// Consume a line continuation: `\` then horizontal whitespace and
    /// comments, then a newline (or EOF). The newline is consumed as
    /// whitespace.
    fn consume_escline(&mut self) -> Result<()> {
        self.consume_tracked(1);
        loop {
            let w = self.fill(4)?;
            let Some(&b) = w.first() else {
                return Ok(());
            };
            match b {
                b' ' | b'\t' => {
                    let n = leading_indent_len(w);
                    self.tracker.advance_ascii(n);
                    self.source.consume(n);
                }
                b'/' if w.get(1) == Some(&b'*') => self.skip_block_comment()?,
                b'/' if w.get(1) == Some(&b'/') => {
                    self.skip_line_comment()?;
                    // The comment's newline terminates the continuation.
                    return self.consume_newline();
                }
                b'\n' | 0x0B | 0x0C | b'\r' => return self.consume_newline(),
                _ => match decode_utf8(w) {
                    Some((c, _)) if is_newline(c) => return self.consume_newline(),
                    Some((c, len)) if is_unicode_space(c) => {
                        self.tracker.advance(c);
                        self.source.consume(len);
                    }
                    Some((c, _)) => {
                        return Err(
                            self.error_at(LexicalError::InvalidEscape(SmolStr::new(c.to_string())), 0)
                        );
                    }
                    None => return Err(self.error_at(LexicalError::MalformedUtf8, 0)),
                },
            }
        }
    }

    /// Consume one newline (CR+LF folded). EOF is acceptable.
    fn consume_newline(&mut self) -> Result<()> {
        let w = self.fill(4)?;
        let Some((c, len)) = decode_utf8(w) else {
            return Ok(());
        };
        if is_newline(c) {
            let mut len = len;
            if c == '\r' && w.get(1) == Some(&b'\n') {
                len = 2;
                self.tracker.advance('\r');
                self.tracker.advance('\n');
            } else {
                self.tracker.advance(c);
            }
            self.source.consume(len);
        }
        Ok(())
    }

    // =========================================================================
    // Token scanners (look ahead without consuming)
    // =========================================================================

    /// Scan a string starting at `window[hashes]` (a `"`). `hashes` is the
    /// raw-string hash count, 0 for escaped strings.
    fn scan_string(&mut self, hashes: usize) -> Result<(TokenKind, usize)> {
        let raw = hashes > 0;
        let w = self.fill(hashes + 3)?;
        let multiline =
            w.len() >= hashes + 3 && w[hashes + 1] == b'"' && w[hashes + 2] == b'"';
        if multiline {
            self.scan_multiline_body(hashes, raw)
        } else {
            self.scan_single_body(hashes, raw)
        }
    }

    /// Unterminated-string error: for raw strings the usual cause is a
    /// closing delimiter with the wrong number of hashes.
    fn unterminated(&self, hashes: usize) -> ParseError {
        if hashes > 0 {
            self.error_at(
                LexicalError::MismatchedRawHashes {
                    expected: hashes as u32,
                },
                0,
            )
        } else {
            self.error_at(LexicalError::UnterminatedString, 0)
        }
    }

    fn scan_single_body(&mut self, hashes: usize, raw: bool) -> Result<(TokenKind, usize)> {
        let mut p = hashes + 1;
        loop {
            let w = self.fill(p + 1)?;
            if p >= w.len() {
                return Err(self.unterminated(hashes));
            }
            match find_string_terminator(&w[p..]) {
                None => {
                    // All content; extend the window.
                    let old = w.len();
                    let w = self.fill(old + 1)?;
                    if w.len() == old {
                        return Err(self.unterminated(hashes));
                    }
                    p = old;
                }
                Some(off) => {
                    p += off;
                    let w = self.fill(p + 2)?;
                    match w[p] {
                        b'\\' if !raw => {
                            if p + 1 >= w.len() {
                                return Err(self.error_at(LexicalError::UnterminatedString, 0));
                            }
                            p += 1 + utf8_len(w[p + 1]);
                        }
                        b'"' => {
                            let need = p + 1 + hashes;
                            let w = self.fill(need)?;
                            if w.len() >= need && w[p + 1..need].iter().all(|&x| x == b'#') {
                                let kind = if raw {
                                    TokenKind::RawString
                                } else {
                                    TokenKind::QuotedString
                                };
                                return Ok((kind, need));
                            }
                            // Quote with too few trailing hashes: content.
                            p += 1;
                        }
                        b'\\' => p += 1,
                        _ => {
                            // LF or CR: single-line strings cannot span lines.
                            return Err(self.error_at(LexicalError::UnterminatedString, p));
                        }
                    }
                }
            }
        }
    }

    fn scan_multiline_body(&mut self, hashes: usize, raw: bool) -> Result<(TokenKind, usize)> {
        let mut p = hashes + 3;
        loop {
            let w = self.fill(p + 1)?;
            if p >= w.len() {
                return Err(self.unterminated(hashes));
            }
            let next = if raw {
                memchr::memchr(b'"', &w[p..])
            } else {
                memchr::memchr2(b'"', b'\\', &w[p..])
            };
            match next {
                None => {
                    let old = w.len();
                    let w = self.fill(old + 1)?;
                    if w.len() == old {
                        return Err(self.unterminated(hashes));
                    }
                    p = old;
                }
                Some(off) => {
                    p += off;
                    let w = self.fill(p + 2)?;
                    if w[p] == b'\\' {
                        if p + 1 >= w.len() {
                            return Err(self.error_at(LexicalError::UnterminatedString, 0));
                        }
                        p += 1 + utf8_len(w[p + 1]);
                        continue;
                    }
                    // Candidate close: `"""` plus the hash run.
                    let need = p + 3 + hashes;
                    let w = self.fill(need)?;
                    if w.len() >= need
                        && w[p + 1] == b'"'
                        && w[p + 2] == b'"'
                        && w[p + 3..need].iter().all(|&x| x == b'#')
                    {
                        let kind = if raw {
                            TokenKind::RawMultilineString
                        } else {
                            TokenKind::MultilineString
                        };
                        return Ok((kind, need));
                    }
                    p += 1;
                }
            }
        }
    }

    /// Dispatch after a `#`: raw string or keyword.
    fn scan_hash(&mut self) -> Result<(TokenKind, usize)> {
        // Count the hash run.
        let mut hashes = 1;
        loop {
            let w = self.fill(hashes + 2)?;
            match w.get(hashes) {
                Some(b'#') => hashes += 1,
                Some(b'"') => return self.scan_string(hashes),
                Some(_) if hashes == 1 => break,
                _ => {
                    return Err(self.error_at(
                        LexicalError::UnknownKeyword(SmolStr::new_static("")),
                        0,
                    ));
                }
            }
        }
        // `#` + identifier run: a keyword literal.
        let run = self.scan_identifier_run(1)?;
        let w = self.source.window();
        let text = &w[1..run];
        let kind = match text {
            b"true" => TokenKind::KeywordTrue,
            b"false" => TokenKind::KeywordFalse,
            b"null" => TokenKind::KeywordNull,
            b"inf" => TokenKind::KeywordInf,
            b"-inf" => TokenKind::KeywordNegInf,
            b"nan" => TokenKind::KeywordNan,
            other => {
                return Err(self.error_at(LexicalError::UnknownKeyword(excerpt(other)), 0));
            }
        };
        Ok((kind, run))
    }

    /// Scan an identifier-shaped run and classify it as an identifier, a
    /// number, or an invalid reserved word.
    fn scan_word(&mut self) -> Result<(TokenKind, usize)> {
        let len = self.scan_identifier_run(0)?;
        let w = self.source.window();
        // SAFETY: every non-ASCII codepoint in the run was decoded during
        // the scan; ASCII bytes are trivially UTF-8.
        let text = unsafe { std::str::from_utf8_unchecked(&w[..len]) };
        let kind = if is_number_like(text) {
            classify_number(text)
        } else if is_forbidden_bare(text) {
            TokenKind::Invalid
        } else {
            TokenKind::Identifier
        };
        Ok((kind, len))
    }

    /// Extend an identifier run starting at window offset `from` until a
    /// terminator. Returns the end offset (window-relative).
    fn scan_identifier_run(&mut self, from: usize) -> Result<usize> {
        let mut p = from;
        loop {
            let w = self.fill(p + 4)?;
            if p >= w.len() {
                return Ok(p);
            }
            let n = find_identifier_end(&w[p..]);
            p += n;
            if p < w.len() {
                let b = w[p];
                if b < 0x80 {
                    return Ok(p);
                }
                match decode_utf8(&w[p..]) {
                    Some((c, l)) if is_identifier_char(c) => p += l,
                    Some(_) => return Ok(p),
                    None => {
                        // Truncated sequence at the window edge?
                        let old = w.len();
                        let w = self.fill(p + 4)?;
                        if w.len() == old {
                            return Err(self.error_at(LexicalError::MalformedUtf8, p));
                        }
                    }
                }
            } else {
                // Ran to the window edge; try to extend.
                let old = w.len();
                let w = self.fill(p + 4)?;
                if w.len() == old {
                    return Ok(p);
                }
            }
        }
    }

    // =========================================================================
    // Bookkeeping
    // =========================================================================

    #[inline]
    fn fill(&mut self, min: usize) -> Result<&[u8]> {
        let position = self.tracker.current();
        let offset = self.source.offset();
        self.source
            .fill(min)
            .map_err(|e| ParseError::new(e, position, offset))
    }

    /// Consume `n` bytes, advancing the line/column tracker over them.
    fn consume_tracked(&mut self, n: usize) {
        let w = self.source.window();
        let mut i = 0;
        while i < n {
            match decode_utf8(&w[i..n]) {
                Some((c, len)) => {
                    self.tracker.advance(c);
                    i += len;
                }
                None => {
                    self.tracker.advance_ascii(1);
                    i += 1;
                }
            }
        }
        self.source.consume(n);
    }

    /// Error at window offset `rel`, with the position computed by walking
    /// the window up to it.
    fn error_at(&self, kind: LexicalError, rel: usize) -> ParseError {
        let mut tracker = self.tracker;
        let w = self.source.window();
        let mut i = 0;
        while i < rel.min(w.len()) {
            match decode_utf8(&w[i..]) {
                Some((c, len)) => {
                    tracker.advance(c);
                    i += len;
                }
                None => {
                    tracker.advance_ascii(1);
                    i += 1;
                }
            }
        }
        ParseError::new(kind, tracker.current(), self.source.offset() + rel as u64)
    }

    /// Position of the cursor, for callers reporting their own errors.
    pub fn position(&self) -> LineCol {
        self.tracker.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::SliceSource;

    fn lex(input: &str) -> Vec<(TokenKind, String, bool)> {
        let mut tok = Tokenizer::new(SliceSource::new(input.as_bytes()));
        let mut out = Vec::new();
        loop {
            let t = tok.next_token().expect("lex failure");
            if t.kind == TokenKind::Eof {
                return out;
            }
            let text = String::from_utf8(tok.text(&t).to_vec()).unwrap();
            out.push((t.kind, text, t.preceded_by_whitespace));
        }
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).into_iter().map(|(k, _, _)| k).collect()
    }

    fn lex_err(input: &str) -> ParseError {
        let mut tok = Tokenizer::new(SliceSource::new(input.as_bytes()));
        loop {
            match tok.next_token() {
                Ok(t) if t.kind == TokenKind::Eof => panic!("expected error for {input:?}"),
                Ok(_) => {}
                Err(e) => return e,
            }
        }
    }

    #[test]
    fn test_lex_simple_node() {
        let tokens = lex("node 42 key=\"value\"");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "node".into(), false),
                (TokenKind::Integer, "42".into(), true),
                (TokenKind::Identifier, "key".into(), true),
                (TokenKind::Equals, "=".into(), false),
                (TokenKind::QuotedString, "\"value\"".into(), false),
            ]
        );
    }

    #[test]
    fn test_lex_punctuation() {
        assert_eq!(
            kinds("{};()="),
            vec![
                TokenKind::OpenBrace,
                TokenKind::CloseBrace,
                TokenKind::Semicolon,
                TokenKind::OpenParen,
                TokenKind::CloseParen,
                TokenKind::Equals,
            ]
        );
    }

    #[test]
    fn test_lex_keywords() {
        assert_eq!(
            kinds("#true #false #null #inf #-inf #nan"),
            vec![
                TokenKind::KeywordTrue,
                TokenKind::KeywordFalse,
                TokenKind::KeywordNull,
                TokenKind::KeywordInf,
                TokenKind::KeywordNegInf,
                TokenKind::KeywordNan,
            ]
        );
    }

    #[test]
    fn test_lex_numbers() {
        assert_eq!(
            kinds("1 -2 1.5 1e5 0x1F 0o17 0b11"),
            vec![
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::HexInteger,
                TokenKind::OctalInteger,
                TokenKind::BinaryInteger,
            ]
        );
    }

    #[test]
    fn test_hex_with_e_is_not_float() {
        assert_eq!(kinds("0xE1"), vec![TokenKind::HexInteger]);
    }

    #[test]
    fn test_lex_newlines() {
        assert_eq!(
            kinds("a\nb\r\nc"),
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
            ]
        );
        // CRLF is one token.
        let tokens = lex("a\r\nb");
        assert_eq!(tokens[1].1, "\r\n");
    }

    #[test]
    fn test_unicode_newline_token() {
        assert_eq!(
            kinds("a\u{2028}b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Newline,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_lex_comments_are_whitespace() {
        let tokens = lex("a // comment\nb /* block */ c");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "a".into(), false),
                (TokenKind::Newline, "\n".into(), true),
                (TokenKind::Identifier, "b".into(), false),
                (TokenKind::Identifier, "c".into(), true),
            ]
        );
    }

    #[test]
    fn test_nested_block_comment() {
        assert_eq!(
            kinds("a /* outer /* inner */ still */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = lex_err("a /* never closed");
        assert!(err.to_string().contains("unterminated block comment"));
    }

    #[test]
    fn test_line_continuation() {
        let tokens = lex("node \\\n  arg");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Identifier, "node".into(), false),
                (TokenKind::Identifier, "arg".into(), true),
            ]
        );
    }

    #[test]
    fn test_line_continuation_with_comment() {
        assert_eq!(
            kinds("node \\ // trailing\n  arg"),
            vec![TokenKind::Identifier, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_slashdash() {
        assert_eq!(
            kinds("/-node other"),
            vec![
                TokenKind::Slashdash,
                TokenKind::Identifier,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_quoted_string_with_escapes() {
        let tokens = lex(r#""a\"b" next"#);
        assert_eq!(tokens[0].0, TokenKind::QuotedString);
        assert_eq!(tokens[0].1, r#""a\"b""#);
        assert_eq!(tokens[1].1, "next");
    }

    #[test]
    fn test_raw_string_hash_counts() {
        let tokens = lex(r###"#"has "quote""# ##"has "#"##"###);
        assert_eq!(tokens[0].0, TokenKind::RawString);
        assert_eq!(tokens[0].1, r###"#"has "quote""#"###);
        assert_eq!(tokens[1].0, TokenKind::RawString);
    }

    #[test]
    fn test_multiline_string_token() {
        let tokens = lex("\"\"\"\n  body\n  \"\"\" tail");
        assert_eq!(tokens[0].0, TokenKind::MultilineString);
        assert_eq!(tokens[1].1, "tail");
    }

    #[test]
    fn test_raw_multiline_string_token() {
        let tokens = lex("#\"\"\"\n  \"\"\" inside\n  \"\"\"# tail");
        assert_eq!(tokens[0].0, TokenKind::RawMultilineString);
        assert_eq!(tokens[1].1, "tail");
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex_err("\"no close");
        assert!(err.to_string().contains("unterminated string"));
        let err = lex_err("\"line\nbreak\"");
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_bare_keywords_are_invalid() {
        assert_eq!(kinds("true"), vec![TokenKind::Invalid]);
        assert_eq!(kinds("-inf"), vec![TokenKind::Invalid]);
        // As part of a longer identifier they are fine.
        assert_eq!(kinds("truegrit"), vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_unknown_hash_keyword() {
        let err = lex_err("#yes");
        assert!(err.to_string().contains("unknown keyword"));
    }

    #[test]
    fn test_bom_skipped_at_start() {
        let tokens = lex("\u{FEFF}node");
        assert_eq!(tokens, vec![(TokenKind::Identifier, "node".into(), false)]);
    }

    #[test]
    fn test_bom_inside_is_error() {
        let err = lex_err("node\u{FEFF}x more");
        assert!(err.to_string().contains("disallowed codepoint"));
    }

    #[test]
    fn test_unicode_identifier() {
        let tokens = lex("ノード värde");
        assert_eq!(tokens[0].1, "ノード");
        assert_eq!(tokens[1].1, "värde");
    }

    #[test]
    fn test_positions() {
        let mut tok = Tokenizer::new(SliceSource::new(b"a\n  b"));
        let a = tok.next_token().unwrap();
        assert_eq!((a.line, a.col), (1, 1));
        let nl = tok.next_token().unwrap();
        assert_eq!(nl.kind, TokenKind::Newline);
        let b = tok.next_token().unwrap();
        assert_eq!((b.line, b.col), (2, 3));
    }

    #[test]
    fn test_stray_slash_is_invalid() {
        assert_eq!(kinds("/ x"), vec![TokenKind::Invalid, TokenKind::Identifier]);
    }

    #[test]
    fn test_brackets_are_invalid() {
        assert_eq!(kinds("[x]")[0], TokenKind::Invalid);
    }
}
