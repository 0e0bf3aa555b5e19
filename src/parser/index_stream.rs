//! Path B: token supply driven by the structural index.
//!
//! The walker inspects only the bytes at indexed offsets and the spans
//! between them. Indexed offsets carry the structure (string delimiters,
//! braces, parens, equals, semicolons, newlines, comment and escline
//! introducers); gap spans hold identifiers, numbers, keywords, and
//! whitespace, lexed here with the same classification rules the
//! streaming tokenizer uses. String tokens span from their open index to
//! their close index, so string content is never rescanned.

use std::borrow::Cow;

use smol_str::SmolStr;

use crate::base::chars::{
    decode_utf8, is_disallowed, is_forbidden_bare, is_identifier_char, is_number_like,
    is_unicode_space,
};
use crate::base::scan::{find_identifier_end, leading_indent_len};
use crate::base::{LineCol, LineIndex};
use crate::error::{ErrorKind, LexicalError, ParseError, Result, excerpt};
use crate::lexer::{Token, TokenKind, classify_number};

use super::stream::TokenStream;

/// Token stream over `(source, structural index)`.
pub(crate) struct IndexTokens<'src> {
    source: &'src [u8],
    indices: Vec<u64>,
    /// Next unconsumed entry in `indices`.
    idx: usize,
    /// Byte cursor.
    pos: usize,
    ws_pending: bool,
    bom_checked: bool,
    line_index: LineIndex,
}

impl<'src> IndexTokens<'src> {
    pub fn new(source: &'src [u8], indices: Vec<u64>) -> Self {
        Self {
            source,
            indices,
            idx: 0,
            pos: 0,
            ws_pending: false,
            bom_checked: false,
            line_index: LineIndex::new(source),
        }
    }

    fn position(&self, offset: usize) -> LineCol {
        self.line_index.line_col(self.source, offset)
    }

    fn err(&self, kind: impl Into<ErrorKind>, offset: usize) -> ParseError {
        ParseError::new(kind, self.position(offset), offset as u64)
    }

    fn token(&mut self, kind: TokenKind, start: usize, end: usize) -> Token {
        let pos = self.position(start);
        let ws = std::mem::take(&mut self.ws_pending);
        self.pos = end;
        Token {
            kind,
            start: start as u64,
            end: end as u64,
            line: pos.line,
            col: pos.col,
            preceded_by_whitespace: ws,
        }
    }

    #[inline]
    fn next_index(&self) -> Option<usize> {
        self.indices.get(self.idx).map(|&o| o as usize)
    }

    /// Decode-validate a skipped span (comment bodies).
    fn validate_span(&self, from: usize, to: usize) -> Result<()> {
        let mut i = from;
        while i < to.min(self.source.len()) {
            match decode_utf8(&self.source[i..]) {
                Some((c, len)) => {
                    if is_disallowed(c) {
                        return Err(self.err(LexicalError::DisallowedCodepoint(c), i));
                    }
                    i += len;
                }
                None => return Err(self.err(LexicalError::MalformedUtf8, i)),
            }
        }
        Ok(())
    }

    /// Length of the newline at `at` (CRLF folded, multibyte decoded).
    fn newline_len(&self, at: usize) -> usize {
        match self.source[at] {
            b'\r' if self.source.get(at + 1) == Some(&b'\n') => 2,
            0xC2 => 2,
            0xE2 => 3,
            _ => 1,
        }
    }

    /// Handle a structural byte at the cursor. `Ok(Some)` is a token;
    /// `Ok(None)` means trivia was consumed (comment, escline).
    fn at_index(&mut self) -> Result<Option<Token>> {
        let start = self.pos;
        let b = self.source[start];
        let tok = match b {
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b';' => TokenKind::Semicolon,
            b'=' => TokenKind::Equals,
            b'\n' | 0x0B | 0x0C | b'\r' | 0xC2 | 0xE2 => {
                let len = self.newline_len(start);
                self.idx += 1;
                return Ok(Some(self.token(TokenKind::Newline, start, start + len)));
            }
            b'"' => {
                let multiline = self.source.get(start + 1) == Some(&b'"')
                    && self.source.get(start + 2) == Some(&b'"');
                let Some(&close) = self.indices.get(self.idx + 1) else {
                    return Err(self.err(LexicalError::UnterminatedString, start));
                };
                let end = close as usize + if multiline { 3 } else { 1 };
                self.idx += 2;
                let kind = if multiline {
                    TokenKind::MultilineString
                } else {
                    TokenKind::QuotedString
                };
                return Ok(Some(self.token(kind, start, end)));
            }
            b'#' => {
                // An indexed hash always opens a raw string.
                let hashes = self.source[start..]
                    .iter()
                    .take_while(|&&x| x == b'#')
                    .count();
                let multiline = self.source.get(start + hashes + 1) == Some(&b'"')
                    && self.source.get(start + hashes + 2) == Some(&b'"');
                let Some(&close) = self.indices.get(self.idx + 1) else {
                    return Err(self.err(
                        LexicalError::MismatchedRawHashes {
                            expected: hashes as u32,
                        },
                        start,
                    ));
                };
                let end = close as usize + if multiline { 3 } else { 1 } + hashes;
                self.idx += 2;
                let kind = if multiline {
                    TokenKind::RawMultilineString
                } else {
                    TokenKind::RawString
                };
                return Ok(Some(self.token(kind, start, end)));
            }
            b'\\' => {
                self.idx += 1;
                self.pos += 1;
                self.ws_pending = true;
                self.consume_escline_tail()?;
                return Ok(None);
            }
            b'/' => match self.source.get(start + 1) {
                Some(b'-') => {
                    self.idx += 1;
                    return Ok(Some(self.token(TokenKind::Slashdash, start, start + 2)));
                }
                Some(b'/') => {
                    let comment_end = self
                        .indices
                        .get(self.idx + 1)
                        .map(|&o| o as usize)
                        .unwrap_or(self.source.len());
                    self.validate_span(start + 2, comment_end)?;
                    self.idx += 1;
                    self.pos = comment_end;
                    self.ws_pending = true;
                    return Ok(None);
                }
                Some(b'*') => {
                    let Some(&close) = self.indices.get(self.idx + 1) else {
                        return Err(self.err(LexicalError::UnterminatedBlockComment, start));
                    };
                    let close = close as usize;
                    self.validate_span(start + 2, close.saturating_sub(1))?;
                    self.idx += 2;
                    self.pos = close + 1;
                    self.ws_pending = true;
                    return Ok(None);
                }
                _ => {
                    self.idx += 1;
                    return Ok(Some(self.token(TokenKind::Invalid, start, start + 1)));
                }
            },
            _ => {
                self.idx += 1;
                return Ok(Some(self.token(TokenKind::Invalid, start, start + 1)));
            }
        };
        self.idx += 1;
        Ok(Some(self.token(tok, start, start + 1)))
    }

    /// After an escline backslash: whitespace, optional comments, then one
    /// newline (or EOF), all consumed as whitespace.
    fn consume_escline_tail(&mut self) -> Result<()> {
        loop {
            if self.pos >= self.source.len() {
                return Ok(());
            }
            if self.next_index() == Some(self.pos) {
                let b = self.source[self.pos];
                match b {
                    b'\n' | 0x0B | 0x0C | b'\r' | 0xC2 | 0xE2 => {
                        self.pos += self.newline_len(self.pos);
                        self.idx += 1;
                        return Ok(());
                    }
                    b'/' if self.source.get(self.pos + 1) == Some(&b'/') => {
                        let comment_end = self
                            .indices
                            .get(self.idx + 1)
                            .map(|&o| o as usize)
                            .unwrap_or(self.source.len());
                        self.validate_span(self.pos + 2, comment_end)?;
                        self.idx += 1;
                        self.pos = comment_end;
                        // The comment's newline closes the continuation.
                        if self.pos < self.source.len() {
                            self.pos += self.newline_len(self.pos);
                            self.idx += 1;
                        }
                        return Ok(());
                    }
                    b'/' if self.source.get(self.pos + 1) == Some(&b'*') => {
                        let Some(&close) = self.indices.get(self.idx + 1) else {
                            return Err(
                                self.err(LexicalError::UnterminatedBlockComment, self.pos)
                            );
                        };
                        let close = close as usize;
                        self.validate_span(self.pos + 2, close.saturating_sub(1))?;
                        self.idx += 2;
                        self.pos = close + 1;
                    }
                    _ => {
                        return Err(self.err(
                            LexicalError::InvalidEscape(SmolStr::new((b as char).to_string())),
                            self.pos,
                        ));
                    }
                }
            } else {
                let b = self.source[self.pos];
                if b == b' ' || b == b'\t' {
                    self.pos += 1;
                    continue;
                }
                match decode_utf8(&self.source[self.pos..]) {
                    Some((c, len)) if is_unicode_space(c) => self.pos += len,
                    Some((c, _)) => {
                        return Err(self.err(
                            LexicalError::InvalidEscape(SmolStr::new(c.to_string())),
                            self.pos,
                        ));
                    }
                    None => return Err(self.err(LexicalError::MalformedUtf8, self.pos)),
                }
            }
        }
    }

    /// Lex an identifier/number/reserved-word run from a gap.
    fn lex_word(&mut self) -> Result<Token> {
        let start = self.pos;
        let gap_end = self.next_index().unwrap_or(self.source.len());
        let s = &self.source[start..gap_end];
        let mut p = 0;
        loop {
            p += find_identifier_end(&s[p..]);
            if p >= s.len() || s[p] < 0x80 {
                break;
            }
            match decode_utf8(&s[p..]) {
                Some((c, len)) if is_identifier_char(c) => p += len,
                Some(_) => break,
                None => return Err(self.err(LexicalError::MalformedUtf8, start + p)),
            }
        }
        // SAFETY: ASCII runs plus codepoints individually decoded above.
        let text = unsafe { std::str::from_utf8_unchecked(&s[..p]) };
        let kind = if is_number_like(text) {
            classify_number(text)
        } else if is_forbidden_bare(text) {
            TokenKind::Invalid
        } else {
            TokenKind::Identifier
        };
        Ok(self.token(kind, start, start + p))
    }

    /// Lex a `#keyword` from a gap (an unindexed hash is never a raw
    /// string opener).
    fn lex_keyword(&mut self) -> Result<Token> {
        let start = self.pos;
        let hashes = self.source[start..]
            .iter()
            .take_while(|&&x| x == b'#')
            .count();
        if hashes > 1 {
            return Err(self.err(LexicalError::UnknownKeyword(SmolStr::new_static("")), start));
        }
        self.pos += 1;
        let word = self.lex_word()?;
        let text = &self.source[start + 1..word.end as usize];
        let kind = match text {
            b"true" => TokenKind::KeywordTrue,
            b"false" => TokenKind::KeywordFalse,
            b"null" => TokenKind::KeywordNull,
            b"inf" => TokenKind::KeywordInf,
            b"-inf" => TokenKind::KeywordNegInf,
            b"nan" => TokenKind::KeywordNan,
            other => return Err(self.err(LexicalError::UnknownKeyword(excerpt(other)), start)),
        };
        let lc = self.position(start);
        Ok(Token {
            kind,
            start: start as u64,
            line: lc.line,
            col: lc.col,
            ..word
        })
    }
}

impl<'src> TokenStream<'src> for IndexTokens<'src> {
    fn next_token(&mut self) -> Result<Token> {
        if !self.bom_checked {
            self.bom_checked = true;
            if self.source.starts_with(&[0xEF, 0xBB, 0xBF]) {
                self.pos = 3;
            }
        }
        loop {
            if self.pos >= self.source.len() {
                let end = self.source.len();
                return Ok(self.token(TokenKind::Eof, end, end));
            }
            if self.next_index() == Some(self.pos) {
                match self.at_index()? {
                    Some(token) => return Ok(token),
                    None => continue,
                }
            }
            let gap_end = self.next_index().unwrap_or(self.source.len());
            let b = self.source[self.pos];
            match b {
                b' ' | b'\t' => {
                    let n = leading_indent_len(&self.source[self.pos..gap_end]);
                    self.pos += n;
                    self.ws_pending = true;
                }
                b'#' => return self.lex_keyword(),
                b'[' | b']' => {
                    let start = self.pos;
                    return Ok(self.token(TokenKind::Invalid, start, start + 1));
                }
                b if b < 0x20 || b == 0x7F => {
                    return Err(self.err(LexicalError::DisallowedCodepoint(b as char), self.pos));
                }
                b if b < 0x80 => return self.lex_word(),
                _ => match decode_utf8(&self.source[self.pos..]) {
                    Some((c, len)) if is_unicode_space(c) => {
                        self.pos += len;
                        self.ws_pending = true;
                    }
                    Some((c, _)) if is_identifier_char(c) => return self.lex_word(),
                    Some((c, _)) => {
                        return Err(self.err(LexicalError::DisallowedCodepoint(c), self.pos));
                    }
                    None => return Err(self.err(LexicalError::MalformedUtf8, self.pos)),
                },
            }
        }
    }

    fn token_bytes(&self, t: &Token) -> Cow<'src, [u8]> {
        Cow::Borrowed(&self.source[t.start as usize..t.end as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::structural_scan;

    fn stream(src: &str) -> IndexTokens<'_> {
        IndexTokens::new(src.as_bytes(), structural_scan(src.as_bytes()))
    }

    fn lex(src: &str) -> Vec<(TokenKind, String, bool)> {
        let mut s = stream(src);
        let mut out = Vec::new();
        loop {
            let t = s.next_token().expect("lex failure");
            if t.kind == TokenKind::Eof {
                return out;
            }
            let text = String::from_utf8(s.token_bytes(&t).to_vec()).unwrap();
            out.push((t.kind, text, t.preceded_by_whitespace));
        }
    }

    /// Path A and Path B must agree token-for-token.
    fn assert_matches_tokenizer(src: &str) {
        use crate::parser::stream::SliceTokens;
        let mut a = SliceTokens::new(src.as_bytes());
        let mut b = stream(src);
        loop {
            let ta = a.next_token().expect("tokenizer failure");
            let tb = b.next_token().expect("index walker failure");
            assert_eq!(ta, tb, "token mismatch in {src:?}");
            if ta.kind == TokenKind::Eof {
                return;
            }
        }
    }

    #[test]
    fn test_index_walk_basic() {
        let tokens = lex("node 42 key=\"v\" {\n  child #true\n}\n");
        let kinds: Vec<_> = tokens.iter().map(|(k, _, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Integer,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::QuotedString,
                TokenKind::OpenBrace,
                TokenKind::Newline,
                TokenKind::Identifier,
                TokenKind::KeywordTrue,
                TokenKind::Newline,
                TokenKind::CloseBrace,
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn test_paths_agree() {
        let cases = [
            "node 42 key=\"value\" { child #true }",
            "/-skipped\nkept",
            "(type)node (int)42 key=(str)\"v\"",
            "a // comment\nb /* block */ c",
            "esc \\\n  cont",
            "raw #\"str\"# ##\"deep\"## end",
            "multi \"\"\"\n  text\n  \"\"\" tail",
            "crlf\r\nnext\u{2028}ls",
            "unicode ノード värde\u{A0}nbsp",
            "nums 0x1F 0o17 0b11 1.5e3 -2",
            "a\\ // c\nb",
            "semi;colon ; end",
        ];
        for case in cases {
            assert_matches_tokenizer(case);
        }
    }

    #[test]
    fn test_unterminated_string_via_index() {
        let mut s = stream("\"never closed");
        let err = s.next_token().unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_unterminated_block_comment_via_index() {
        let mut s = stream("/* open");
        let err = s.next_token().unwrap_err();
        assert!(err.to_string().contains("unterminated block comment"));
    }

    #[test]
    fn test_disallowed_in_comment_detected() {
        let mut s = stream("a // bad \u{202E} text\nb");
        s.next_token().unwrap();
        let err = s.next_token().unwrap_err();
        assert!(err.to_string().contains("disallowed codepoint"));
    }
}
