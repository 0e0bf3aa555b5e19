//! The grammar-aware builder.
//!
//! One state machine serves both parse paths: it pulls [`Token`]s from a
//! [`TokenStream`] and yields [`RawEvent`]s — the semantic atoms every
//! consumer (document collector, push sink, pull iterator) is driven by.
//!
//! Internally the machine runs in two layers, the lower one producing
//! slashdash-tagged steps (node header, entry, children begin/end) and the
//! upper one filtering elided elements out and deriving the one
//! `end_node` per `start_node` that the event vocabulary promises.

use std::borrow::Cow;
use std::collections::VecDeque;

use smol_str::SmolStr;

use crate::base::LineCol;
use crate::error::{
    ErrorKind, GrammarError, LexicalError, ParseError, ResourceError, Result, StringError, excerpt,
};
use crate::lexer::{Token, TokenKind, content_bounds, kind_to_name};
use crate::text::escape::{EscapeError, decode_escapes, process_multiline, validate_raw_single};
use crate::text::number::{parse_float, parse_integer};

use super::events::{Event, EventValue};
use super::stream::TokenStream;

// =============================================================================
// Semantic atoms
// =============================================================================

/// A resolved string: either verbatim text sitting in a persistent source
/// buffer (borrowable) or decoded/copied text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StrPiece<'src> {
    Source { offset: u64, text: &'src str },
    Owned(String),
}

impl StrPiece<'_> {
    pub fn as_str(&self) -> &str {
        match self {
            StrPiece::Source { text, .. } => text,
            StrPiece::Owned(s) => s,
        }
    }
}

/// A resolved value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ValuePiece<'src> {
    Str(StrPiece<'src>),
    Int(i128),
    Float {
        value: f64,
        original: StrPiece<'src>,
    },
    Bool(bool),
    Null,
    Inf,
    NegInf,
    Nan,
}

impl ValuePiece<'_> {
    fn as_event_value(&self) -> EventValue<'_> {
        match self {
            ValuePiece::Str(s) => EventValue::String(s.as_str()),
            ValuePiece::Int(i) => EventValue::Integer(*i),
            ValuePiece::Float { value, original } => EventValue::Float {
                value: *value,
                original: original.as_str(),
            },
            ValuePiece::Bool(b) => EventValue::Bool(*b),
            ValuePiece::Null => EventValue::Null,
            ValuePiece::Inf => EventValue::Inf,
            ValuePiece::NegInf => EventValue::NegInf,
            ValuePiece::Nan => EventValue::Nan,
        }
    }
}

/// One semantic event, as produced by the builder.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawEvent<'src> {
    Start {
        name: StrPiece<'src>,
        ty: Option<StrPiece<'src>>,
    },
    Arg {
        ty: Option<StrPiece<'src>>,
        value: ValuePiece<'src>,
    },
    Prop {
        name: StrPiece<'src>,
        ty: Option<StrPiece<'src>>,
        value: ValuePiece<'src>,
    },
    End,
}

impl RawEvent<'_> {
    /// Transient view in the public event vocabulary.
    pub fn as_event(&self) -> Event<'_> {
        match self {
            RawEvent::Start { name, ty } => Event::StartNode {
                name: name.as_str(),
                type_annotation: ty.as_ref().map(StrPiece::as_str),
            },
            RawEvent::Arg { ty, value } => Event::Argument {
                value: value.as_event_value(),
                type_annotation: ty.as_ref().map(StrPiece::as_str),
            },
            RawEvent::Prop { name, ty, value } => Event::Property {
                name: name.as_str(),
                value: value.as_event_value(),
                type_annotation: ty.as_ref().map(StrPiece::as_str),
            },
            RawEvent::End => Event::EndNode,
        }
    }
}

/// Lower-layer steps, slashdash-tagged.
#[derive(Debug)]
enum Inner<'src> {
    Node {
        sd: bool,
        ty: Option<StrPiece<'src>>,
        name: StrPiece<'src>,
    },
    Entry {
        sd: bool,
        key: Option<StrPiece<'src>>,
        ty: Option<StrPiece<'src>>,
        value: ValuePiece<'src>,
    },
    Begin {
        sd: bool,
    },
    End,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GState {
    /// At line level: expecting a node, a terminator, `}`, or EOF.
    NextNode,
    /// Inside a node's entry list.
    NodeEntries,
    /// The node has had a children block; only slashdashed blocks and
    /// terminators may follow.
    NodeChildren,
    Done,
}

// =============================================================================
// Builder
// =============================================================================

pub(crate) struct Builder<'src, T> {
    stream: T,
    peeked: Option<Token>,
    gstate: GState,
    brace_depth: u16,
    max_depth: u16,
    /// Per nesting level: has the open node at that level had a real
    /// (non-slashdashed) children block.
    seen_real_children: Vec<bool>,
    /// Per nesting level: is a node currently open (started, not ended).
    open_at_level: Vec<bool>,
    queue: VecDeque<RawEvent<'src>>,
    held: Option<Inner<'src>>,
    finished: bool,
}

impl<'src, T: TokenStream<'src>> Builder<'src, T> {
    pub fn new(stream: T, max_depth: u16) -> Self {
        Self {
            stream,
            peeked: None,
            gstate: GState::NextNode,
            brace_depth: 0,
            max_depth,
            seen_real_children: vec![false],
            open_at_level: vec![false],
            queue: VecDeque::new(),
            held: None,
            finished: false,
        }
    }

    /// Pull the next semantic event, or `None` at end of document.
    pub fn next_raw(&mut self) -> Result<Option<RawEvent<'src>>> {
        match self.next_raw_impl() {
            Ok(ev) => Ok(ev),
            Err(e) => {
                // Errors are terminal.
                self.gstate = GState::Done;
                self.finished = true;
                Err(e)
            }
        }
    }

    fn next_raw_impl(&mut self) -> Result<Option<RawEvent<'src>>> {
        if let Some(ev) = self.queue.pop_front() {
            return Ok(Some(ev));
        }
        if self.finished {
            return Ok(None);
        }
        loop {
            let step = match self.held.take() {
                Some(s) => s,
                None => self.next_inner()?,
            };
            match step {
                Inner::Node { sd: true, .. } => self.swallow_node()?,
                Inner::Begin { sd: true } => self.swallow_children()?,
                Inner::Entry { sd: true, .. } => {}
                Inner::Node {
                    sd: false,
                    ty,
                    name,
                } => {
                    if let Some(open) = self.open_at_level.last_mut() {
                        if *open {
                            self.queue.push_back(RawEvent::End);
                        }
                        *open = true;
                    }
                    self.queue.push_back(RawEvent::Start { name, ty });
                    return Ok(self.queue.pop_front());
                }
                Inner::Entry {
                    sd: false,
                    key,
                    ty,
                    value,
                } => {
                    return Ok(Some(match key {
                        Some(name) => RawEvent::Prop { name, ty, value },
                        None => RawEvent::Arg { ty, value },
                    }));
                }
                Inner::Begin { sd: false } => {
                    self.open_at_level.push(false);
                }
                Inner::End => {
                    if self.open_at_level.pop().unwrap_or(false) {
                        self.queue.push_back(RawEvent::End);
                    }
                    if let Some(open) = self.open_at_level.last_mut() {
                        if *open {
                            self.queue.push_back(RawEvent::End);
                            *open = false;
                        }
                    }
                    if let Some(ev) = self.queue.pop_front() {
                        return Ok(Some(ev));
                    }
                }
                Inner::Done => {
                    if let Some(open) = self.open_at_level.last_mut() {
                        if *open {
                            *open = false;
                            self.queue.push_back(RawEvent::End);
                        }
                    }
                    self.finished = true;
                    return Ok(self.queue.pop_front());
                }
            }
        }
    }

    /// Consume a slashdashed node, children and all.
    fn swallow_node(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_inner()? {
                n @ Inner::Node { sd: false, .. } if depth == 0 => {
                    self.held = Some(n);
                    return Ok(());
                }
                Inner::Begin { .. } => depth += 1,
                Inner::End => {
                    if depth == 0 {
                        self.held = Some(Inner::End);
                        return Ok(());
                    }
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Inner::Done => {
                    self.held = Some(Inner::Done);
                    return Ok(());
                }
                Inner::Node { .. } | Inner::Entry { .. } => {}
            }
        }
    }

    /// Consume a slashdashed children block through its matching `}`.
    fn swallow_children(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_inner()? {
                Inner::Begin { .. } => depth += 1,
                Inner::End => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Inner::Done => {
                    self.held = Some(Inner::Done);
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    // =========================================================================
    // Lower layer: token-level grammar
    // =========================================================================

    fn next_inner(&mut self) -> Result<Inner<'src>> {
        loop {
            match self.gstate {
                GState::Done => return Ok(Inner::Done),
                GState::NextNode => {
                    let t = self.bump()?;
                    match t.kind {
                        TokenKind::Newline => continue,
                        TokenKind::Eof => {
                            if self.brace_depth == 0 {
                                self.gstate = GState::Done;
                                return Ok(Inner::Done);
                            }
                            return Err(err_token(&t, GrammarError::UnclosedBrace));
                        }
                        TokenKind::CloseBrace => return self.close_children(&t),
                        TokenKind::Slashdash => {
                            let mut nt = self.bump()?;
                            while nt.kind == TokenKind::Newline {
                                nt = self.bump()?;
                            }
                            return self.node_header(nt, true);
                        }
                        _ => return self.node_header(t, false),
                    }
                }
                GState::NodeEntries => {
                    if let Some(step) = self.entries_step()? {
                        return Ok(step);
                    }
                }
                GState::NodeChildren => {
                    if let Some(step) = self.children_step()? {
                        return Ok(step);
                    }
                }
            }
        }
    }

    fn node_header(&mut self, t: Token, sd: bool) -> Result<Inner<'src>> {
        let (ty, name_tok) = if t.kind == TokenKind::OpenParen {
            let ty = self.type_annotation()?;
            (Some(ty), self.bump()?)
        } else {
            (None, t)
        };
        if !name_tok.kind.is_string() {
            return Err(self.unexpected(&name_tok, "node name"));
        }
        let name = self.string_piece(&name_tok)?;
        self.gstate = GState::NodeEntries;
        let level = self.brace_depth as usize;
        if self.seen_real_children.len() <= level {
            self.seen_real_children.resize(level + 1, false);
        }
        self.seen_real_children[level] = false;
        Ok(Inner::Node { sd, ty, name })
    }

    fn entries_step(&mut self) -> Result<Option<Inner<'src>>> {
        let t = self.peek()?;
        match t.kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.bump()?;
                self.gstate = GState::NextNode;
                Ok(None)
            }
            TokenKind::Eof => {
                let t = self.bump()?;
                if self.brace_depth == 0 {
                    self.gstate = GState::Done;
                    Ok(Some(Inner::Done))
                } else {
                    Err(err_token(&t, GrammarError::UnclosedBrace))
                }
            }
            TokenKind::CloseBrace => {
                let t = self.bump()?;
                Ok(Some(self.close_children(&t)?))
            }
            TokenKind::OpenBrace => {
                let t = self.bump()?;
                Ok(Some(self.begin_children(false, &t)?))
            }
            TokenKind::Slashdash => {
                let sd_tok = self.bump()?;
                let mut nt = self.peek()?;
                while nt.kind == TokenKind::Newline {
                    self.bump()?;
                    nt = self.peek()?;
                }
                if nt.kind == TokenKind::OpenBrace {
                    self.bump()?;
                    Ok(Some(self.begin_children(true, &nt)?))
                } else {
                    // An elided entry still needs the separating whitespace
                    // before the slashdash itself.
                    if !sd_tok.preceded_by_whitespace {
                        return Err(err_token(&sd_tok, GrammarError::MissingWhitespace));
                    }
                    Ok(Some(self.entry(true)?))
                }
            }
            _ => {
                if !t.preceded_by_whitespace {
                    return Err(err_token(&t, GrammarError::MissingWhitespace));
                }
                Ok(Some(self.entry(false)?))
            }
        }
    }

    fn children_step(&mut self) -> Result<Option<Inner<'src>>> {
        let t = self.peek()?;
        match t.kind {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.bump()?;
                self.gstate = GState::NextNode;
                Ok(None)
            }
            TokenKind::Eof => {
                let t = self.bump()?;
                if self.brace_depth == 0 {
                    self.gstate = GState::Done;
                    Ok(Some(Inner::Done))
                } else {
                    Err(err_token(&t, GrammarError::UnclosedBrace))
                }
            }
            TokenKind::CloseBrace => {
                let t = self.bump()?;
                Ok(Some(self.close_children(&t)?))
            }
            TokenKind::OpenBrace => {
                let t = self.bump()?;
                Ok(Some(self.begin_children(false, &t)?))
            }
            TokenKind::Slashdash => {
                self.bump()?;
                let mut nt = self.peek()?;
                while nt.kind == TokenKind::Newline {
                    self.bump()?;
                    nt = self.peek()?;
                }
                if nt.kind == TokenKind::OpenBrace {
                    self.bump()?;
                    Ok(Some(self.begin_children(true, &nt)?))
                } else {
                    Err(err_token(&nt, GrammarError::EntryAfterChildren))
                }
            }
            k if k.is_value() || k == TokenKind::OpenParen => {
                Err(err_token(&t, GrammarError::EntryAfterChildren))
            }
            _ => Err(err_token(&t, GrammarError::MissingNodeTerminator)),
        }
    }

    fn close_children(&mut self, t: &Token) -> Result<Inner<'src>> {
        if self.brace_depth == 0 {
            return Err(err_token(t, GrammarError::UnexpectedCloseBrace));
        }
        self.brace_depth -= 1;
        self.seen_real_children.truncate(self.brace_depth as usize + 1);
        self.gstate = GState::NodeChildren;
        Ok(Inner::End)
    }

    fn begin_children(&mut self, sd: bool, t: &Token) -> Result<Inner<'src>> {
        let level = self.brace_depth as usize;
        if !sd {
            if self.seen_real_children[level] {
                return Err(err_token(t, GrammarError::MultipleChildrenBlocks));
            }
            self.seen_real_children[level] = true;
        }
        if self.brace_depth >= self.max_depth {
            return Err(err_token(t, ResourceError::NestingTooDeep(self.max_depth)));
        }
        self.brace_depth += 1;
        self.gstate = GState::NextNode;
        Ok(Inner::Begin { sd })
    }

    fn entry(&mut self, sd: bool) -> Result<Inner<'src>> {
        let t = self.bump()?;
        if t.kind == TokenKind::OpenParen {
            let ty = self.type_annotation()?;
            let vt = self.bump()?;
            if !vt.kind.is_value() {
                return Err(self.unexpected(&vt, "value"));
            }
            let value = self.value_piece(&vt)?;
            let after = self.peek()?;
            if after.kind == TokenKind::Equals {
                return Err(err_token(&after, GrammarError::PropertyKeyTypeAnnotation));
            }
            return Ok(Inner::Entry {
                sd,
                key: None,
                ty: Some(ty),
                value,
            });
        }
        if !t.kind.is_value() {
            return Err(self.unexpected(&t, "value"));
        }
        if t.kind.is_string() {
            let piece = self.string_piece(&t)?;
            if self.peek()?.kind == TokenKind::Equals {
                self.bump()?;
                let vt = self.bump()?;
                if vt.kind == TokenKind::OpenParen {
                    let ty = self.type_annotation()?;
                    let vt2 = self.bump()?;
                    if !vt2.kind.is_value() {
                        return Err(self.unexpected(&vt2, "value"));
                    }
                    let value = self.value_piece(&vt2)?;
                    return Ok(Inner::Entry {
                        sd,
                        key: Some(piece),
                        ty: Some(ty),
                        value,
                    });
                }
                if !vt.kind.is_value() {
                    return Err(self.unexpected(&vt, "value"));
                }
                let value = self.value_piece(&vt)?;
                return Ok(Inner::Entry {
                    sd,
                    key: Some(piece),
                    ty: None,
                    value,
                });
            }
            return Ok(Inner::Entry {
                sd,
                key: None,
                ty: None,
                value: ValuePiece::Str(piece),
            });
        }
        let value = self.value_piece(&t)?;
        let after = self.peek()?;
        if after.kind == TokenKind::Equals {
            return Err(err_token(&after, GrammarError::PropertyKeyNotString));
        }
        Ok(Inner::Entry {
            sd,
            key: None,
            ty: None,
            value,
        })
    }

    fn type_annotation(&mut self) -> Result<StrPiece<'src>> {
        let t = self.bump()?;
        if !t.kind.is_string() {
            return Err(self.unexpected(&t, "type annotation"));
        }
        let piece = self.string_piece(&t)?;
        let close = self.bump()?;
        if close.kind != TokenKind::CloseParen {
            return Err(self.unexpected(&close, "')'"));
        }
        Ok(piece)
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    fn bump(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.stream.next_token(),
        }
    }

    fn peek(&mut self) -> Result<Token> {
        match self.peeked {
            Some(t) => Ok(t),
            None => {
                let t = self.stream.next_token()?;
                self.peeked = Some(t);
                Ok(t)
            }
        }
    }

    fn unexpected(&self, t: &Token, expected: &'static str) -> ParseError {
        if t.kind == TokenKind::Invalid {
            let bytes = self.stream.token_bytes(t);
            let text = excerpt(&bytes);
            let kind = if crate::base::chars::is_forbidden_bare(&String::from_utf8_lossy(&bytes)) {
                GrammarError::ReservedKeyword(text)
            } else {
                GrammarError::UnexpectedToken {
                    expected,
                    found: text,
                }
            };
            return err_token(t, kind);
        }
        err_token(
            t,
            GrammarError::UnexpectedToken {
                expected,
                found: SmolStr::new_static(kind_to_name(t.kind)),
            },
        )
    }

    // =========================================================================
    // Value resolution
    // =========================================================================

    fn string_piece(&mut self, t: &Token) -> Result<StrPiece<'src>> {
        match self.stream.token_bytes(t) {
            Cow::Borrowed(all) => {
                let (lead, trail) = content_bounds(t.kind, all);
                let content = &all[lead..all.len() - trail];
                let s = std::str::from_utf8(content)
                    .map_err(|_| err_token(t, LexicalError::MalformedUtf8))?;
                match t.kind {
                    TokenKind::Identifier => Ok(StrPiece::Source {
                        offset: t.start,
                        text: s,
                    }),
                    TokenKind::QuotedString => {
                        match decode_escapes(s).map_err(|e| escape_err(e, t))? {
                            Cow::Borrowed(text) => Ok(StrPiece::Source {
                                offset: t.start + lead as u64,
                                text,
                            }),
                            Cow::Owned(o) => Ok(StrPiece::Owned(o)),
                        }
                    }
                    TokenKind::RawString => {
                        validate_raw_single(s).map_err(|e| escape_err(e, t))?;
                        Ok(StrPiece::Source {
                            offset: t.start + lead as u64,
                            text: s,
                        })
                    }
                    TokenKind::MultilineString => Ok(StrPiece::Owned(
                        process_multiline(s, true).map_err(|e| escape_err(e, t))?,
                    )),
                    TokenKind::RawMultilineString => Ok(StrPiece::Owned(
                        process_multiline(s, false).map_err(|e| escape_err(e, t))?,
                    )),
                    _ => Err(self.unexpected(t, "string")),
                }
            }
            Cow::Owned(all) => {
                let (lead, trail) = content_bounds(t.kind, &all);
                let content = &all[lead..all.len() - trail];
                let s = std::str::from_utf8(content)
                    .map_err(|_| err_token(t, LexicalError::MalformedUtf8))?;
                let owned = match t.kind {
                    TokenKind::Identifier => s.to_owned(),
                    TokenKind::QuotedString => decode_escapes(s)
                        .map_err(|e| escape_err(e, t))?
                        .into_owned(),
                    TokenKind::RawString => {
                        validate_raw_single(s).map_err(|e| escape_err(e, t))?;
                        s.to_owned()
                    }
                    TokenKind::MultilineString => {
                        process_multiline(s, true).map_err(|e| escape_err(e, t))?
                    }
                    TokenKind::RawMultilineString => {
                        process_multiline(s, false).map_err(|e| escape_err(e, t))?
                    }
                    _ => return Err(self.unexpected(t, "string")),
                };
                Ok(StrPiece::Owned(owned))
            }
        }
    }

    fn value_piece(&mut self, t: &Token) -> Result<ValuePiece<'src>> {
        match t.kind {
            k if k.is_string() => Ok(ValuePiece::Str(self.string_piece(t)?)),
            TokenKind::Integer
            | TokenKind::HexInteger
            | TokenKind::OctalInteger
            | TokenKind::BinaryInteger => {
                let bytes = self.stream.token_bytes(t);
                let text = std::str::from_utf8(&bytes)
                    .map_err(|_| err_token(t, LexicalError::MalformedUtf8))?;
                let v = parse_integer(text)
                    .map_err(|_| err_token(t, LexicalError::InvalidNumber(excerpt(&bytes))))?;
                Ok(ValuePiece::Int(v))
            }
            TokenKind::Float => match self.stream.token_bytes(t) {
                Cow::Borrowed(all) => {
                    let text = std::str::from_utf8(all)
                        .map_err(|_| err_token(t, LexicalError::MalformedUtf8))?;
                    let f = parse_float(text)
                        .map_err(|_| err_token(t, LexicalError::InvalidNumber(excerpt(all))))?;
                    let original = if f.original == text {
                        StrPiece::Source {
                            offset: t.start,
                            text,
                        }
                    } else {
                        StrPiece::Owned(f.original)
                    };
                    Ok(ValuePiece::Float {
                        value: f.value,
                        original,
                    })
                }
                Cow::Owned(all) => {
                    let text = std::str::from_utf8(&all)
                        .map_err(|_| err_token(t, LexicalError::MalformedUtf8))?;
                    let f = parse_float(text)
                        .map_err(|_| err_token(t, LexicalError::InvalidNumber(excerpt(&all))))?;
                    Ok(ValuePiece::Float {
                        value: f.value,
                        original: StrPiece::Owned(f.original),
                    })
                }
            },
            TokenKind::KeywordTrue => Ok(ValuePiece::Bool(true)),
            TokenKind::KeywordFalse => Ok(ValuePiece::Bool(false)),
            TokenKind::KeywordNull => Ok(ValuePiece::Null),
            TokenKind::KeywordInf => Ok(ValuePiece::Inf),
            TokenKind::KeywordNegInf => Ok(ValuePiece::NegInf),
            TokenKind::KeywordNan => Ok(ValuePiece::Nan),
            _ => Err(self.unexpected(t, "value")),
        }
    }
}

// =============================================================================
// Error helpers
// =============================================================================

fn err_token(t: &Token, kind: impl Into<ErrorKind>) -> ParseError {
    ParseError::new(kind, LineCol::new(t.line, t.col), t.start)
}

fn escape_err(e: EscapeError, t: &Token) -> ParseError {
    let kind: ErrorKind = match e {
        EscapeError::InvalidEscape(c) => {
            LexicalError::InvalidEscape(SmolStr::new(c.to_string())).into()
        }
        EscapeError::TruncatedEscape => {
            LexicalError::InvalidEscape(SmolStr::new_static("")).into()
        }
        EscapeError::InvalidUnicodeEscape => LexicalError::InvalidUnicodeEscape.into(),
        EscapeError::DisallowedCodepoint(c) => LexicalError::DisallowedCodepoint(c).into(),
        EscapeError::NewlineInString => LexicalError::UnterminatedString.into(),
        EscapeError::FirstLineNotEmpty => StringError::FirstLineNotEmpty.into(),
        EscapeError::DedentMismatch => StringError::DedentMismatch.into(),
        EscapeError::FinalLineNotWhitespace => StringError::FinalLineNotWhitespace.into(),
    };
    ParseError::new(kind, LineCol::new(t.line, t.col), t.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::stream::SliceTokens;

    fn piece_text(p: &StrPiece<'_>) -> String {
        p.as_str().to_owned()
    }

    fn value_text(v: &ValuePiece<'_>) -> String {
        match v {
            ValuePiece::Str(s) => piece_text(s),
            ValuePiece::Int(i) => i.to_string(),
            ValuePiece::Float { original, .. } => piece_text(original),
            ValuePiece::Bool(true) => "#true".into(),
            ValuePiece::Bool(false) => "#false".into(),
            ValuePiece::Null => "#null".into(),
            ValuePiece::Inf => "#inf".into(),
            ValuePiece::NegInf => "#-inf".into(),
            ValuePiece::Nan => "#nan".into(),
        }
    }

    /// Compact event trace: `+name` start, `-` end, `a:` argument,
    /// `p:key=` property, type annotations in parens.
    fn trace(src: &str) -> Vec<String> {
        let mut b = Builder::new(SliceTokens::new(src.as_bytes()), 256);
        let mut out = Vec::new();
        loop {
            match b.next_raw() {
                Ok(Some(ev)) => out.push(match &ev {
                    RawEvent::Start { name, ty } => match ty {
                        Some(ty) => format!("+({}){}", piece_text(ty), piece_text(name)),
                        None => format!("+{}", piece_text(name)),
                    },
                    RawEvent::Arg { ty, value } => match ty {
                        Some(ty) => format!("a:({}){}", piece_text(ty), value_text(value)),
                        None => format!("a:{}", value_text(value)),
                    },
                    RawEvent::Prop { name, ty, value } => match ty {
                        Some(ty) => {
                            format!("p:{}=({}){}", piece_text(name), piece_text(ty), value_text(value))
                        }
                        None => format!("p:{}={}", piece_text(name), value_text(value)),
                    },
                    RawEvent::End => "-".into(),
                }),
                Ok(None) => return out,
                Err(e) => {
                    out.push(format!("!{e}"));
                    return out;
                }
            }
        }
    }

    fn parse_err(src: &str) -> ErrorKind {
        let mut b = Builder::new(SliceTokens::new(src.as_bytes()), 256);
        loop {
            match b.next_raw() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected error for {src:?}"),
                Err(e) => return e.kind,
            }
        }
    }

    #[test]
    fn test_trace_simple() {
        assert_eq!(trace("node 1 k=2"), ["+node", "a:1", "p:k=2", "-"]);
    }

    #[test]
    fn test_trace_nesting() {
        assert_eq!(
            trace("a { b { c }\nd }"),
            ["+a", "+b", "+c", "-", "-", "+d", "-", "-"]
        );
    }

    #[test]
    fn test_trace_siblings() {
        assert_eq!(trace("a;b\nc"), ["+a", "-", "+b", "-", "+c", "-"]);
    }

    #[test]
    fn test_trace_annotations() {
        assert_eq!(
            trace("(t)n (u)1 k=(v)2"),
            ["+(t)n", "a:(u)1", "p:k=(v)2", "-"]
        );
    }

    #[test]
    fn test_trace_interleaved_entries_keep_source_order() {
        assert_eq!(
            trace("n 1 a=2 3 b=4"),
            ["+n", "a:1", "p:a=2", "a:3", "p:b=4", "-"]
        );
    }

    #[test]
    fn test_trace_slashdash_node() {
        assert_eq!(trace("/-a 1 {x}\nb"), ["+b", "-"]);
        assert_eq!(trace("/-a\n/-b\nc"), ["+c", "-"]);
    }

    #[test]
    fn test_trace_slashdash_entry_and_children() {
        assert_eq!(trace("n /-1 2"), ["+n", "a:2", "-"]);
        assert_eq!(trace("n /-{a b=1} {c}"), ["+n", "+c", "-", "-"]);
        assert_eq!(trace("n {c} /-{a}"), ["+n", "+c", "-", "-"]);
    }

    #[test]
    fn test_trace_slashdash_inside_children() {
        assert_eq!(trace("a { /-b\nc }"), ["+a", "+c", "-", "-"]);
    }

    #[test]
    fn test_trace_values_normalized() {
        assert_eq!(
            trace("n 0x10 1e2 \"a\\tb\" #null"),
            ["+n", "a:16", "a:1E+2", "a:a\tb", "a:#null", "-"]
        );
    }

    #[test]
    fn test_err_reserved_keyword() {
        assert!(matches!(
            parse_err("node true=1"),
            ErrorKind::Grammar(GrammarError::ReservedKeyword(_))
        ));
    }

    #[test]
    fn test_err_missing_whitespace() {
        assert!(matches!(
            parse_err("node\"arg\""),
            ErrorKind::Grammar(GrammarError::MissingWhitespace)
        ));
    }

    #[test]
    fn test_err_property_key_shape() {
        assert!(matches!(
            parse_err("node 1=2"),
            ErrorKind::Grammar(GrammarError::PropertyKeyNotString)
        ));
        assert!(matches!(
            parse_err("node (t)k=1"),
            ErrorKind::Grammar(GrammarError::PropertyKeyTypeAnnotation)
        ));
    }

    #[test]
    fn test_err_children_rules() {
        assert!(matches!(
            parse_err("node {a} {b}"),
            ErrorKind::Grammar(GrammarError::MultipleChildrenBlocks)
        ));
        assert!(matches!(
            parse_err("node {a} 1"),
            ErrorKind::Grammar(GrammarError::EntryAfterChildren)
        ));
        assert!(matches!(
            parse_err("node /-{a} 1"),
            ErrorKind::Grammar(GrammarError::EntryAfterChildren)
        ));
    }

    #[test]
    fn test_err_braces() {
        assert!(matches!(
            parse_err("node {"),
            ErrorKind::Grammar(GrammarError::UnclosedBrace)
        ));
        assert!(matches!(
            parse_err("}"),
            ErrorKind::Grammar(GrammarError::UnexpectedCloseBrace)
        ));
    }

    #[test]
    fn test_err_depth_cap() {
        let mut src = String::new();
        for _ in 0..5 {
            src.push_str("a {");
        }
        let mut b = Builder::new(SliceTokens::new(src.as_bytes()), 4);
        let err = loop {
            match b.next_raw() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected depth error"),
                Err(e) => break e,
            }
        };
        assert!(matches!(
            err.kind,
            ErrorKind::Resource(ResourceError::NestingTooDeep(4))
        ));
    }

    #[test]
    fn test_err_positions_are_token_positions() {
        let mut b = Builder::new(SliceTokens::new(b"node\n  true"), 256);
        let err = loop {
            match b.next_raw() {
                Ok(Some(_)) => {}
                Ok(None) => panic!("expected error"),
                Err(e) => break e,
            }
        };
        assert_eq!((err.position.line, err.position.col), (2, 3));
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn test_terminal_after_error() {
        let mut b = Builder::new(SliceTokens::new(b"node {"), 256);
        let mut errs = 0;
        for _ in 0..4 {
            match b.next_raw() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => errs += 1,
            }
        }
        assert_eq!(errs, 1);
    }

    #[test]
    fn test_zero_copy_pieces_on_slice_input() {
        let src = b"plain \"esc\\nape\" second";
        let mut b = Builder::new(SliceTokens::new(src), 256);
        let mut sources = 0;
        let mut owned = 0;
        while let Some(ev) = b.next_raw().expect("parse failure") {
            if let RawEvent::Arg {
                value: ValuePiece::Str(p),
                ..
            } = &ev
            {
                match p {
                    StrPiece::Source { .. } => sources += 1,
                    StrPiece::Owned(_) => owned += 1,
                }
            }
        }
        // `plain` and `second` borrow; the escaped string decodes to owned.
        assert_eq!((sources, owned), (2, 1));
    }
}
