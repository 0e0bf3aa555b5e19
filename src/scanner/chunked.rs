//! Reader-driven structural scanning.
//!
//! Chunks are accumulated into a [`ChunkedSource`] while the stateful
//! scanner runs over the growing tail. Index offsets are document-absolute
//! from the start, so the builder can walk them directly against the
//! accumulated bytes. The total stream size is capped by
//! `max_document_size`.

use std::io::Read;

use crate::base::LineCol;
use crate::error::{ParseError, ResourceError, Result};

use super::StructuralScanner;

/// The accumulated bytes of a streamed document.
#[derive(Debug, Default)]
pub struct ChunkedSource {
    bytes: Vec<u8>,
}

impl ChunkedSource {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Scan a reader to completion: accumulate chunks, scan as they arrive,
/// return the full source plus the structural index.
pub fn scan_reader<R: Read>(
    mut reader: R,
    buffer_size: usize,
    max_document_size: usize,
) -> Result<(ChunkedSource, Vec<u64>)> {
    let mut source = ChunkedSource::default();
    let mut scanner = StructuralScanner::new();
    let mut scanned = 0usize;
    let chunk_len = buffer_size.clamp(64, 1 << 20);
    let mut chunk = vec![0u8; chunk_len];
    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|e| stream_error(ResourceError::Io(e), source.bytes.len()))?;
        if n == 0 {
            break;
        }
        source.bytes.extend_from_slice(&chunk[..n]);
        if source.bytes.len() > max_document_size {
            return Err(stream_error(
                ResourceError::StreamTooLong(max_document_size),
                source.bytes.len(),
            ));
        }
        // Scan what we have; the scanner may hold back a tail that needs
        // lookahead into the next chunk.
        scanned += scanner.scan_chunk(&source.bytes[scanned..], scanned as u64, false);
    }
    let consumed = scanner.scan_chunk(&source.bytes[scanned..], scanned as u64, true);
    debug_assert_eq!(scanned + consumed, source.bytes.len());
    tracing::trace!(
        bytes = source.bytes.len(),
        indices = scanner.indices().len(),
        "reader scan complete"
    );
    Ok((source, scanner.into_indices()))
}

fn stream_error(kind: ResourceError, offset: usize) -> ParseError {
    ParseError::new(kind, LineCol::default(), offset as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::structural_scan;

    /// Reader returning a few bytes at a time.
    struct Dribble<'a> {
        data: &'a [u8],
        pos: usize,
        step: usize,
    }

    impl Read for Dribble<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(self.data.len() - self.pos).min(out.len());
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_reader_scan_matches_slice_scan() {
        let src = b"node \"a{b}\" /* x */ {\n  child #\"r\"# ;\n}\n";
        let expected = structural_scan(src);
        for step in [1, 2, 3, 7, 64] {
            let (source, indices) = scan_reader(
                Dribble {
                    data: src,
                    pos: 0,
                    step,
                },
                64,
                1 << 20,
            )
            .unwrap();
            assert_eq!(source.bytes(), src);
            assert_eq!(indices, expected, "step {step}");
        }
    }

    #[test]
    fn test_reader_scan_too_long() {
        let src = vec![b'a'; 100];
        let err = scan_reader(
            Dribble {
                data: &src,
                pos: 0,
                step: 10,
            },
            64,
            50,
        )
        .unwrap_err();
        assert!(err.to_string().contains("maximum document size"));
    }
}
