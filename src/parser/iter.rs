//! The pull-style event iterator.
//!
//! A finite, non-restartable sequence of events over an explicit state
//! machine (the builder's depth stack and token cursor). Events borrow
//! from the iterator, so this is a lending iterator with an inherent
//! `next` rather than an `Iterator` impl: each event is valid until the
//! next call.

use crate::error::{ParseError, Result};

use super::events::Event;
use super::grammar::{Builder, RawEvent};
use super::stream::TokenStream;

/// Steppable event source, object-safe so the iterator can hold any
/// builder/stream pairing.
pub(crate) trait EventStep<'src> {
    fn step(&mut self) -> Result<Option<RawEvent<'src>>>;
}

impl<'src, T: TokenStream<'src>> EventStep<'src> for Builder<'src, T> {
    fn step(&mut self) -> Result<Option<RawEvent<'src>>> {
        self.next_raw()
    }
}

/// Pull iterator over parse events.
///
/// After an error the iterator is terminal: subsequent calls return
/// `None`.
pub struct EventIterator<'src> {
    inner: Box<dyn EventStep<'src> + 'src>,
    current: Option<RawEvent<'src>>,
    done: bool,
}

impl<'src> EventIterator<'src> {
    pub(crate) fn new(inner: Box<dyn EventStep<'src> + 'src>) -> Self {
        Self {
            inner,
            current: None,
            done: false,
        }
    }

    /// The next event, `None` at end of stream.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<std::result::Result<Event<'_>, ParseError>> {
        if self.done {
            return None;
        }
        match self.inner.step() {
            Ok(Some(raw)) => {
                let raw = self.current.insert(raw);
                Some(Ok(raw.as_event()))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
