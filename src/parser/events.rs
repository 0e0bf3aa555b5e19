//! The event vocabulary shared by every parse strategy.
//!
//! Both delivery shapes — the pull iterator and the push sink — speak
//! these events. String references are transient views into parser-owned
//! storage: they are valid for the duration of one event only, and
//! consumers that need persistence must copy (as [`DocumentSink`] does).

use crate::doc::Document;
use crate::scanner::ChunkedSource;

use super::collect::DocCollector;
use super::grammar::{RawEvent, StrPiece, ValuePiece};

/// A value as it appears in an event. Contents are normalized: escapes
/// decoded, integers parsed, floats carrying their original text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventValue<'a> {
    String(&'a str),
    Integer(i128),
    Float { value: f64, original: &'a str },
    Bool(bool),
    Null,
    Inf,
    NegInf,
    Nan,
}

/// A semantic parse event.
///
/// Exactly one `EndNode` is delivered per `StartNode`; children appear as
/// nested `StartNode`…`EndNode` pairs between their parent's pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event<'a> {
    StartNode {
        name: &'a str,
        type_annotation: Option<&'a str>,
    },
    Argument {
        value: EventValue<'a>,
        type_annotation: Option<&'a str>,
    },
    Property {
        name: &'a str,
        value: EventValue<'a>,
        type_annotation: Option<&'a str>,
    },
    EndNode,
}

/// Push-style consumer. The parser calls [`event`](Self::event)
/// synchronously, in document order. Implementations never need to be
/// heap-allocated.
pub trait EventSink {
    fn event(&mut self, event: Event<'_>);

    /// Offered the accumulated source after a streamed index parse;
    /// sinks that want to keep the raw bytes can take them.
    fn accept_source(&mut self, _source: ChunkedSource) {}
}

/// A sink that rebuilds a document from events, copying every string.
#[derive(Default)]
pub struct DocumentSink {
    collector: DocCollector<'static>,
}

impl DocumentSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reconstructed document. Call after the parse completes.
    pub fn finish(self) -> Document<'static> {
        self.collector.finish()
    }
}

impl EventSink for DocumentSink {
    fn event(&mut self, event: Event<'_>) {
        let raw: RawEvent<'static> = match event {
            Event::StartNode {
                name,
                type_annotation,
            } => RawEvent::Start {
                name: owned_piece(name),
                ty: type_annotation.map(owned_piece),
            },
            Event::Argument {
                value,
                type_annotation,
            } => RawEvent::Arg {
                ty: type_annotation.map(owned_piece),
                value: owned_value(&value),
            },
            Event::Property {
                name,
                value,
                type_annotation,
            } => RawEvent::Prop {
                name: owned_piece(name),
                ty: type_annotation.map(owned_piece),
                value: owned_value(&value),
            },
            Event::EndNode => RawEvent::End,
        };
        self.collector.apply(raw);
    }
}

fn owned_piece(s: &str) -> StrPiece<'static> {
    StrPiece::Owned(s.to_owned())
}

fn owned_value(v: &EventValue<'_>) -> ValuePiece<'static> {
    match v {
        EventValue::String(s) => ValuePiece::Str(owned_piece(s)),
        EventValue::Integer(i) => ValuePiece::Int(*i),
        EventValue::Float { value, original } => ValuePiece::Float {
            value: *value,
            original: owned_piece(original),
        },
        EventValue::Bool(b) => ValuePiece::Bool(*b),
        EventValue::Null => ValuePiece::Null,
        EventValue::Inf => ValuePiece::Inf,
        EventValue::NegInf => ValuePiece::NegInf,
        EventValue::Nan => ValuePiece::Nan,
    }
}
