//! Byte sources feeding the tokenizer.
//!
//! The tokenizer works against a window of not-yet-consumed bytes exposed
//! by a [`ByteSource`]. The slice source is the whole input; the reader
//! source maintains a refillable buffer and *loops* on short reads — the
//! reader contract allows returning less than the request, so a single
//! `read` call is never enough.

use std::io::Read;

use crate::error::ResourceError;

/// Seam between the tokenizer and its input.
pub trait ByteSource {
    /// Ensure at least `min` bytes are visible from the cursor, or as many
    /// as remain before EOF, and return the window.
    fn fill(&mut self, min: usize) -> Result<&[u8], ResourceError>;

    /// The current window, without touching I/O.
    fn window(&self) -> &[u8];

    /// Drop `n` bytes from the front of the window.
    fn consume(&mut self, n: usize);

    /// Absolute offset of the window's first byte.
    fn offset(&self) -> u64;
}

/// In-memory source: the window is simply the unconsumed tail.
#[derive(Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The full backing slice (for borrowed string refs).
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn fill(&mut self, _min: usize) -> Result<&[u8], ResourceError> {
        Ok(&self.data[self.pos..])
    }

    #[inline]
    fn window(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        debug_assert!(self.pos + n <= self.data.len());
        self.pos += n;
    }

    #[inline]
    fn offset(&self) -> u64 {
        self.pos as u64
    }
}

/// Buffered source over an [`io::Read`](std::io::Read).
///
/// Unconsumed bytes are shifted to the buffer front on refill. The buffer
/// starts at the configured capacity and doubles when a single token needs
/// a larger window; `max_document_size` bounds the total stream.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    /// Window is `buf[head..tail]`.
    head: usize,
    tail: usize,
    /// Absolute offset of `buf[head]`.
    consumed: u64,
    total_read: u64,
    max_document_size: usize,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, buffer_size: usize, max_document_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0; buffer_size.max(64)],
            head: 0,
            tail: 0,
            consumed: 0,
            total_read: 0,
            max_document_size,
            eof: false,
        }
    }

    #[inline]
    fn available(&self) -> usize {
        self.tail - self.head
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn fill(&mut self, min: usize) -> Result<&[u8], ResourceError> {
        if self.available() >= min || self.eof {
            return Ok(&self.buf[self.head..self.tail]);
        }
        // Shift unconsumed bytes to the front.
        if self.head > 0 {
            self.buf.copy_within(self.head..self.tail, 0);
            self.tail -= self.head;
            self.head = 0;
        }
        if min > self.buf.len() {
            let new_len = self.buf.len().max(64).checked_mul(2).unwrap_or(min).max(min);
            tracing::trace!(from = self.buf.len(), to = new_len, "growing reader buffer");
            self.buf.resize(new_len, 0);
        }
        // Loop: short reads are allowed by the Read contract.
        while self.available() < min {
            let n = self.reader.read(&mut self.buf[self.tail..])?;
            if n == 0 {
                self.eof = true;
                break;
            }
            self.tail += n;
            self.total_read += n as u64;
            if self.total_read > self.max_document_size as u64 {
                return Err(ResourceError::StreamTooLong(self.max_document_size));
            }
        }
        Ok(&self.buf[self.head..self.tail])
    }

    #[inline]
    fn window(&self) -> &[u8] {
        &self.buf[self.head..self.tail]
    }

    #[inline]
    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available());
        self.head += n;
        self.consumed += n as u64;
    }

    #[inline]
    fn offset(&self) -> u64 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader that returns one byte per call, exercising short-read loops.
    struct TrickleReader<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl Read for TrickleReader<'_> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() || out.is_empty() {
                return Ok(0);
            }
            out[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn test_slice_source() {
        let mut s = SliceSource::new(b"abcdef");
        assert_eq!(s.fill(3).unwrap(), b"abcdef");
        s.consume(2);
        assert_eq!(s.window(), b"cdef");
        assert_eq!(s.offset(), 2);
    }

    #[test]
    fn test_reader_loops_on_short_reads() {
        let reader = TrickleReader {
            data: b"hello world",
            pos: 0,
        };
        let mut s = ReaderSource::new(reader, 64, 1 << 20);
        let window = s.fill(5).unwrap();
        assert!(window.len() >= 5, "short reads must be looped");
        assert_eq!(&window[..5], b"hello");
    }

    #[test]
    fn test_reader_shift_and_refill() {
        let reader = TrickleReader {
            data: b"0123456789abcdef",
            pos: 0,
        };
        let mut s = ReaderSource::new(reader, 64, 1 << 20);
        s.fill(8).unwrap();
        s.consume(8);
        assert_eq!(s.offset(), 8);
        let window = s.fill(8).unwrap();
        assert_eq!(&window[..8], b"89abcdef");
    }

    #[test]
    fn test_reader_eof() {
        let reader = TrickleReader { data: b"ab", pos: 0 };
        let mut s = ReaderSource::new(reader, 64, 1 << 20);
        let window = s.fill(10).unwrap();
        assert_eq!(window, b"ab");
        s.consume(2);
        assert!(s.fill(1).unwrap().is_empty());
    }

    #[test]
    fn test_reader_grows_buffer() {
        let data: Vec<u8> = (0..200u8).collect();
        let reader = TrickleReader {
            data: &data,
            pos: 0,
        };
        let mut s = ReaderSource::new(reader, 64, 1 << 20);
        let window = s.fill(150).unwrap();
        assert_eq!(window.len(), 150);
        assert_eq!(window[149], 149);
    }

    #[test]
    fn test_reader_max_document_size() {
        let data = vec![b'x'; 100];
        let reader = TrickleReader {
            data: &data,
            pos: 0,
        };
        let mut s = ReaderSource::new(reader, 16, 50);
        let mut err = None;
        for _ in 0..10 {
            match s.fill(16) {
                Ok(w) if w.len() >= 16 => s.consume(16),
                Ok(_) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert!(matches!(err, Some(ResourceError::StreamTooLong(50))));
    }
}
