//! # kudel
//!
//! High-performance KDL 2.0 parser, streaming event engine, and canonical
//! serializer.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ser       → canonical serializer (round-trip output)
//!   ↓
//! parser    → grammar builder, event sinks/iterator, parallel parse
//!   ↓
//! doc       → string pool, values, structure-of-arrays document
//!   ↓
//! scanner   → Stage-1 structural scan (stateful, chunked, batched)
//! lexer     → token vocabulary, buffered streaming tokenizer
//!   ↓
//! text      → escape decoding, multiline dedent, number parsing
//!   ↓
//! base      → codepoint classes, block masks, positions
//! ```
//!
//! ## Entry points
//!
//! - [`parse`] / [`parse_with_options`] — in-memory slice to [`Document`]
//! - [`parse_reader`] — streaming reader to an owned document
//! - [`iterate`] / [`iterate_reader`] — pull-style [`EventIterator`]
//! - [`parse_with_sink`] / [`parse_reader_with_sink`] — push-style events
//! - [`serialize`] / [`serialize_to_bytes`] — canonical KDL text
//! - [`find_node_boundaries`] / [`parse_parallel`] / [`merge`] — sharded
//!   parsing over top-level node boundaries
//!
//! Parsers are single-owner: one thread, one parser. Parallelism comes
//! from partitioning, never from sharing.

// ============================================================================
// MODULES (dependency order: base → text → lexer/scanner → doc → parser → ser)
// ============================================================================

/// Foundation: codepoint classes, byte-scanner primitives, positions
pub mod base;

/// String and number processing
pub mod text;

/// Token vocabulary and the buffered streaming tokenizer
pub mod lexer;

/// Stage-1 structural scanner
pub mod scanner;

/// String pool, values, structure-of-arrays document
pub mod doc;

/// Grammar builders, events, options, parallel parse
pub mod parser;

/// Canonical serializer
pub mod ser;

/// Error taxonomy
pub mod error;

// Re-export the public surface at the crate root.
pub use doc::{Argument, Document, NodeHandle, Property, StrRef, Value, merge};
pub use error::{
    ErrorCode, ErrorKind, GrammarError, LexicalError, ParseError, ResourceError, StringError,
};
pub use parser::events::{DocumentSink, Event, EventSink, EventValue};
pub use parser::{
    EventIterator, ParseOptions, Strategy, find_node_boundaries, iterate, iterate_reader, parse,
    parse_parallel, parse_reader, parse_reader_with_sink, parse_with_options, parse_with_sink,
};
pub use ser::{SerializeOptions, serialize, serialize_to_bytes, value_to_string};
