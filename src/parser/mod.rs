//! Parsing entry points and strategy dispatch.
//!
//! Three strategies produce identical documents:
//! - **streaming**: tokenizer → builder, the default for unknown inputs;
//! - **structural-index**: stateful Stage-1 scan → index walker → builder;
//! - **preprocessed**: batched Stage-1 scan → index walker → builder.
//!
//! Strategy choice is a tuning lever, not a semantic switch. All paths
//! converge on the event vocabulary in [`events`]; document construction
//! and iteration are just two different consumers of it.

mod collect;
pub mod events;
mod grammar;
mod index_stream;
mod iter;
mod partition;
mod stream;

pub use iter::EventIterator;
pub use partition::{find_node_boundaries, parse_parallel};

use std::io::Read;

use crate::doc::Document;
use crate::error::Result;
use crate::scanner::{preprocessed_scan, scan_reader, structural_scan};

use collect::DocCollector;
use events::EventSink;
use grammar::Builder;
use index_stream::IndexTokens;
use stream::{ReaderTokens, SliceTokens, TokenStream};

/// How a parse traverses the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Single-pass buffered tokenizer.
    #[default]
    Streaming,
    /// Stateful structural scan, then an index-driven build.
    StructuralIndex,
    /// Batched structural scan, then an index-driven build.
    Preprocessed,
}

/// Parse configuration. Unknown future knobs arrive as new fields with
/// defaults, hence the builder-style setters.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum children-block nesting.
    pub max_depth: u16,
    /// Initial reader-window capacity for streamed parses.
    pub buffer_size: usize,
    pub strategy: Strategy,
    /// Cap on total bytes accepted from a reader.
    pub max_document_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 256,
            buffer_size: 1 << 20,
            strategy: Strategy::default(),
            max_document_size: 256 << 20,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_document_size(mut self, max_document_size: usize) -> Self {
        self.max_document_size = max_document_size;
        self
    }
}

/// Parse an in-memory slice with default options.
///
/// The document borrows `source` for zero-copy string refs; call
/// [`Document::into_owned`] to detach it.
pub fn parse(source: &[u8]) -> Result<Document<'_>> {
    parse_with_options(source, &ParseOptions::default())
}

/// Parse an in-memory slice.
pub fn parse_with_options<'src>(
    source: &'src [u8],
    options: &ParseOptions,
) -> Result<Document<'src>> {
    tracing::trace!(bytes = source.len(), strategy = ?options.strategy, "parse slice");
    match options.strategy {
        Strategy::Streaming => build_document(
            Builder::new(SliceTokens::new(source), options.max_depth),
            Some(source),
        ),
        Strategy::StructuralIndex => {
            let indices = structural_scan(source);
            build_document(
                Builder::new(IndexTokens::new(source, indices), options.max_depth),
                Some(source),
            )
        }
        Strategy::Preprocessed => {
            let indices = preprocessed_scan(source);
            build_document(
                Builder::new(IndexTokens::new(source, indices), options.max_depth),
                Some(source),
            )
        }
    }
}

/// Parse from a reader. The returned document owns all of its strings.
pub fn parse_reader<R: Read>(reader: R, options: &ParseOptions) -> Result<Document<'static>> {
    tracing::trace!(strategy = ?options.strategy, "parse reader");
    match options.strategy {
        Strategy::Streaming => {
            let stream =
                ReaderTokens::new(reader, options.buffer_size, options.max_document_size);
            build_document(Builder::new(stream, options.max_depth), None)
        }
        Strategy::StructuralIndex | Strategy::Preprocessed => {
            let (chunked, indices) =
                scan_reader(reader, options.buffer_size, options.max_document_size)?;
            let mut collector = DocCollector::new(None);
            let mut builder = Builder::new(
                IndexTokens::new(chunked.bytes(), indices),
                options.max_depth,
            );
            while let Some(ev) = builder.next_raw()? {
                collector.apply(ev);
            }
            Ok(collector.finish())
        }
    }
}

/// Pull-iterate the events of an in-memory slice.
pub fn iterate(source: &[u8]) -> EventIterator<'_> {
    let builder = Builder::new(SliceTokens::new(source), ParseOptions::default().max_depth);
    EventIterator::new(Box::new(builder))
}

/// Pull-iterate the events of a reader.
pub fn iterate_reader<R: Read + 'static>(reader: R) -> EventIterator<'static> {
    let options = ParseOptions::default();
    let builder = Builder::new(
        ReaderTokens::new(reader, options.buffer_size, options.max_document_size),
        options.max_depth,
    );
    EventIterator::new(Box::new(builder))
}

/// Push the events of an in-memory slice into `sink`.
pub fn parse_with_sink<S: EventSink>(
    source: &[u8],
    sink: &mut S,
    options: &ParseOptions,
) -> Result<()> {
    match options.strategy {
        Strategy::Streaming => {
            drive_sink(Builder::new(SliceTokens::new(source), options.max_depth), sink)
        }
        Strategy::StructuralIndex => {
            let indices = structural_scan(source);
            drive_sink(
                Builder::new(IndexTokens::new(source, indices), options.max_depth),
                sink,
            )
        }
        Strategy::Preprocessed => {
            let indices = preprocessed_scan(source);
            drive_sink(
                Builder::new(IndexTokens::new(source, indices), options.max_depth),
                sink,
            )
        }
    }
}

/// Push the events of a reader into `sink`. With an index strategy the
/// accumulated source is offered to the sink afterwards.
pub fn parse_reader_with_sink<R: Read, S: EventSink>(
    reader: R,
    sink: &mut S,
    options: &ParseOptions,
) -> Result<()> {
    match options.strategy {
        Strategy::Streaming => {
            let stream =
                ReaderTokens::new(reader, options.buffer_size, options.max_document_size);
            drive_sink(Builder::new(stream, options.max_depth), sink)
        }
        Strategy::StructuralIndex | Strategy::Preprocessed => {
            let (chunked, indices) =
                scan_reader(reader, options.buffer_size, options.max_document_size)?;
            {
                let mut builder = Builder::new(
                    IndexTokens::new(chunked.bytes(), indices),
                    options.max_depth,
                );
                while let Some(ev) = builder.next_raw()? {
                    sink.event(ev.as_event());
                }
            }
            sink.accept_source(chunked);
            Ok(())
        }
    }
}

fn build_document<'src, T: TokenStream<'src>>(
    mut builder: Builder<'src, T>,
    source: Option<&'src [u8]>,
) -> Result<Document<'src>> {
    let mut collector = DocCollector::new(source);
    while let Some(ev) = builder.next_raw()? {
        collector.apply(ev);
    }
    Ok(collector.finish())
}

fn drive_sink<'src, T: TokenStream<'src>, S: EventSink>(
    mut builder: Builder<'src, T>,
    sink: &mut S,
) -> Result<()> {
    while let Some(ev) = builder.next_raw()? {
        sink.event(ev.as_event());
    }
    Ok(())
}
