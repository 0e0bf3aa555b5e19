//! Token sources for the grammar machine.
//!
//! The builder consumes [`Token`]s through a small seam so the streaming
//! tokenizer (Path A) and the structural-index walker (Path B) drive the
//! same grammar code. Token text comes back as `Cow`: borrowed with the
//! source's lifetime when the input is a stable in-memory slice, owned
//! when it lives in a reader window that the next token may overwrite.

use std::borrow::Cow;
use std::io::Read;

use crate::error::Result;
use crate::lexer::{ReaderSource, SliceSource, Token, Tokenizer};

/// Seam between the grammar machine and its token supply.
pub(crate) trait TokenStream<'src> {
    fn next_token(&mut self) -> Result<Token>;

    /// Text of `t`, which must be the most recently lexed token.
    fn token_bytes(&self, t: &Token) -> Cow<'src, [u8]>;
}

/// Path A over an in-memory slice: token text borrows the input.
pub(crate) struct SliceTokens<'src> {
    tok: Tokenizer<SliceSource<'src>>,
}

impl<'src> SliceTokens<'src> {
    pub fn new(source: &'src [u8]) -> Self {
        Self {
            tok: Tokenizer::new(SliceSource::new(source)),
        }
    }
}

impl<'src> TokenStream<'src> for SliceTokens<'src> {
    fn next_token(&mut self) -> Result<Token> {
        self.tok.next_token()
    }

    fn token_bytes(&self, t: &Token) -> Cow<'src, [u8]> {
        Cow::Borrowed(&self.tok.source().data()[t.start as usize..t.end as usize])
    }
}

/// Path A over a reader: token text is copied out of the refill window.
pub(crate) struct ReaderTokens<R> {
    tok: Tokenizer<ReaderSource<R>>,
}

impl<R: Read> ReaderTokens<R> {
    pub fn new(reader: R, buffer_size: usize, max_document_size: usize) -> Self {
        Self {
            tok: Tokenizer::new(ReaderSource::new(reader, buffer_size, max_document_size)),
        }
    }
}

impl<R: Read> TokenStream<'static> for ReaderTokens<R> {
    fn next_token(&mut self) -> Result<Token> {
        self.tok.next_token()
    }

    fn token_bytes(&self, t: &Token) -> Cow<'static, [u8]> {
        Cow::Owned(self.tok.text(t).to_vec())
    }
}
