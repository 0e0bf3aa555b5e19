//! Foundation for the kudel pipeline.
//!
//! This module provides the primitives every later stage builds on:
//! - [`chars`] - KDL 2.0 codepoint classes and UTF-8 decoding
//! - [`scan`] - 64-byte block masks (SSE2/SWAR/scalar) and find-first helpers
//! - [`LineCol`], [`LineIndex`], [`PositionTracker`] - diagnostic positions
//!
//! This module has NO dependencies on other kudel modules.

pub mod chars;
pub mod scan;

mod position;

pub use position::{LineCol, LineIndex, PositionTracker};

// Re-export text-size types for convenience
pub use text_size;
