//! The document-construction sink.
//!
//! One [`DocCollector`] turns the builder's event stream into a
//! structure-of-arrays [`Document`]. When constructed with a persistent
//! source slice, `Source` pieces become zero-copy borrowed refs; without
//! one, every string is interned into the document's pool.

use crate::doc::{Argument, Document, NodeHandle, Property, StrRef, Value};

use super::grammar::{RawEvent, StrPiece, ValuePiece};

struct Frame {
    node: NodeHandle,
    last_child: Option<NodeHandle>,
    arg_start: u32,
    prop_start: u32,
    /// Entry ranges are sealed at the first child or at end-node,
    /// whichever comes first.
    sealed: bool,
}

/// Builds a document from raw events.
pub(crate) struct DocCollector<'src> {
    doc: Document<'src>,
    borrow: bool,
    stack: Vec<Frame>,
}

impl Default for DocCollector<'_> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<'src> DocCollector<'src> {
    pub fn new(source: Option<&'src [u8]>) -> Self {
        let mut doc = Document::new();
        doc.source = source;
        Self {
            doc,
            borrow: source.is_some(),
            stack: Vec::new(),
        }
    }

    fn piece_ref(&mut self, p: &StrPiece<'_>) -> StrRef {
        match p {
            StrPiece::Source { offset, text } if self.borrow => {
                StrRef::borrowed(*offset, text.len() as u64)
            }
            StrPiece::Source { text, .. } => self.doc.intern(text),
            StrPiece::Owned(s) => self.doc.intern(s),
        }
    }

    fn opt_ref(&mut self, p: &Option<StrPiece<'_>>) -> StrRef {
        match p {
            Some(piece) => self.piece_ref(piece),
            None => StrRef::NONE,
        }
    }

    fn value(&mut self, v: &ValuePiece<'_>) -> Value {
        match v {
            ValuePiece::Str(p) => Value::String(self.piece_ref(p)),
            ValuePiece::Int(i) => Value::Integer(*i),
            ValuePiece::Float { value, original } => Value::Float {
                value: *value,
                original: self.piece_ref(original),
            },
            ValuePiece::Bool(b) => Value::Bool(*b),
            ValuePiece::Null => Value::Null,
            ValuePiece::Inf => Value::Inf,
            ValuePiece::NegInf => Value::NegInf,
            ValuePiece::Nan => Value::Nan,
        }
    }

    /// A child is starting: the parent's own entries are complete.
    fn seal_top(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            if !frame.sealed {
                frame.sealed = true;
                let (node, args, props) = (frame.node, frame.arg_start, frame.prop_start);
                self.doc.set_entry_ranges(node, args, props);
            }
        }
    }

    pub fn apply(&mut self, ev: RawEvent<'_>) {
        match ev {
            RawEvent::Start { name, ty } => {
                self.seal_top();
                let name = self.piece_ref(&name);
                let ty = self.opt_ref(&ty);
                let node = self.doc.new_node(name, ty);
                match self.stack.last_mut() {
                    Some(parent) => {
                        self.doc.link_child(parent.node, parent.last_child, node);
                        parent.last_child = Some(node);
                    }
                    None => self.doc.push_root(node),
                }
                self.stack.push(Frame {
                    node,
                    last_child: None,
                    arg_start: self.doc.arg_pool_len(),
                    prop_start: self.doc.prop_pool_len(),
                    sealed: false,
                });
            }
            RawEvent::Arg { ty, value } => {
                let type_annotation = self.opt_ref(&ty);
                let value = self.value(&value);
                self.doc.push_argument(Argument {
                    type_annotation,
                    value,
                });
            }
            RawEvent::Prop { name, ty, value } => {
                let name = self.piece_ref(&name);
                let type_annotation = self.opt_ref(&ty);
                let value = self.value(&value);
                self.doc.push_property(Property {
                    name,
                    type_annotation,
                    value,
                });
            }
            RawEvent::End => {
                if let Some(frame) = self.stack.pop() {
                    if !frame.sealed {
                        self.doc
                            .set_entry_ranges(frame.node, frame.arg_start, frame.prop_start);
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Document<'src> {
        debug_assert!(self.stack.is_empty(), "unbalanced start/end events");
        self.doc
    }
}
