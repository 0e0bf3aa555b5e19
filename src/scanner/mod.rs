//! Stage 1: the structural scanner.
//!
//! Produces an ordered list of byte offsets for the characters the grammar
//! cares about: string delimiters (open and close only — content quotes
//! are skipped), braces, parens, equals, semicolons, newlines, raw-string
//! openers, comment delimiters, and escline backslashes. String and
//! comment *content* is never indexed.
//!
//! The scan is block-oriented: 64-byte class masks (see [`crate::base::scan`])
//! are specialized to the current state so most bytes die in one vector
//! compare, then set bits are handled in LSB order. Handlers that change
//! state restart the scan at the position just past the candidate (mask
//! narrowing transitions could continue in-block, but a uniform restart on
//! every transition is correct); handlers that keep the state continue
//! within the block.
//!
//! The state survives across blocks and across reader chunks: when a
//! handler needs lookahead past the available bytes and EOF has not been
//! reached, the scanner returns how much it consumed and the caller feeds
//! it a longer tail later.

mod chunked;
mod preprocessed;

pub use chunked::{ChunkedSource, scan_reader};
pub use preprocessed::preprocessed_scan;

use crate::base::scan::{BlockMasks, block_masks};

/// Scanner state carried across blocks and chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    in_string: bool,
    multiline: bool,
    raw: bool,
    raw_hash_count: u32,
    in_line_comment: bool,
    block_comment_depth: u32,
}

impl ScanState {
    /// The candidate classes for the current state.
    #[inline]
    fn candidates(&self, m: &BlockMasks) -> u64 {
        if self.in_string {
            if self.raw {
                m.quotes
            } else {
                m.quotes | m.backslashes
            }
        } else if self.in_line_comment {
            m.newlines | m.newline_leads
        } else if self.block_comment_depth > 0 {
            m.stars | m.slashes
        } else {
            m.candidates()
        }
    }

    #[inline]
    fn is_normal(&self) -> bool {
        !self.in_string && !self.in_line_comment && self.block_comment_depth == 0
    }
}

/// What a candidate handler did.
enum Outcome {
    /// Not structural after all; continue at `next`, same masks.
    Pass { next: usize },
    /// Index the candidate; continue at `next`, same masks.
    Emit { next: usize },
    /// State changed: optionally index `at`, restart scanning at `next`.
    Jump { at: Option<usize>, next: usize },
    /// Lookahead extends past the data and EOF is not reached.
    NeedMore,
}

/// The stateful structural scanner.
#[derive(Debug, Default)]
pub struct StructuralScanner {
    state: ScanState,
    indices: Vec<u64>,
}

impl StructuralScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The indices collected so far (document-absolute).
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    pub fn into_indices(self) -> Vec<u64> {
        self.indices
    }

    /// Scan `data`, whose first byte sits at document offset `base`.
    ///
    /// Returns the number of bytes consumed. With `eof == false` the tail
    /// may be held back when a candidate needs more lookahead; the caller
    /// re-presents it, extended, in the next call. With `eof == true`
    /// everything is consumed.
    pub fn scan_chunk(&mut self, data: &[u8], base: u64, eof: bool) -> usize {
        let mut pos = 0;
        'outer: while pos < data.len() {
            let block_end = (pos + 64).min(data.len());
            let masks = block_masks(&data[pos..block_end]);
            let mut bits = self.state.candidates(&masks);
            let mut resume = pos;
            while bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let rel = pos + bit;
                if rel < resume {
                    continue;
                }
                match self.handle(data, rel, eof) {
                    Outcome::Pass { next } => resume = next,
                    Outcome::Emit { next } => {
                        self.indices.push(base + rel as u64);
                        resume = next;
                    }
                    Outcome::Jump { at, next } => {
                        if let Some(at) = at {
                            self.indices.push(base + at as u64);
                        }
                        pos = next;
                        continue 'outer;
                    }
                    Outcome::NeedMore => return rel,
                }
            }
            pos = block_end.max(resume);
        }
        data.len()
    }

    /// Dispatch one candidate. `rel` indexes into `data`.
    fn handle(&mut self, data: &[u8], rel: usize, eof: bool) -> Outcome {
        let b = data[rel];
        if self.state.in_string {
            return self.handle_in_string(data, rel, eof, b);
        }
        if self.state.in_line_comment {
            return self.handle_in_line_comment(data, rel, eof, b);
        }
        if self.state.block_comment_depth > 0 {
            return self.handle_in_block_comment(data, rel, eof, b);
        }
        self.handle_normal(data, rel, eof, b)
    }

    fn handle_normal(&mut self, data: &[u8], rel: usize, eof: bool, b: u8) -> Outcome {
        match b {
            b'"' => {
                if data.len() < rel + 3 && !eof {
                    return Outcome::NeedMore;
                }
                if data.get(rel + 1) == Some(&b'"') && data.get(rel + 2) == Some(&b'"') {
                    self.state.in_string = true;
                    self.state.multiline = true;
                    self.state.raw = false;
                    self.state.raw_hash_count = 0;
                    Outcome::Jump {
                        at: Some(rel),
                        next: rel + 3,
                    }
                } else {
                    self.state.in_string = true;
                    self.state.multiline = false;
                    self.state.raw = false;
                    self.state.raw_hash_count = 0;
                    Outcome::Jump {
                        at: Some(rel),
                        next: rel + 1,
                    }
                }
            }
            b'#' => {
                let mut h = 1;
                while data.get(rel + h) == Some(&b'#') {
                    h += 1;
                }
                if rel + h >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                if data.get(rel + h) == Some(&b'"') {
                    if data.len() < rel + h + 3 && !eof {
                        return Outcome::NeedMore;
                    }
                    let multiline = data.get(rel + h + 1) == Some(&b'"')
                        && data.get(rel + h + 2) == Some(&b'"');
                    self.state.in_string = true;
                    self.state.multiline = multiline;
                    self.state.raw = true;
                    self.state.raw_hash_count = h as u32;
                    Outcome::Jump {
                        at: Some(rel),
                        next: rel + h + if multiline { 3 } else { 1 },
                    }
                } else {
                    // Keyword (`#true`) or junk: gap content, not structural.
                    Outcome::Pass { next: rel + h }
                }
            }
            b'\\' => Outcome::Emit { next: rel + 1 },
            b'/' => {
                if rel + 1 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                match data.get(rel + 1) {
                    Some(b'/') => {
                        self.state.in_line_comment = true;
                        Outcome::Jump {
                            at: Some(rel),
                            next: rel + 2,
                        }
                    }
                    Some(b'*') => {
                        self.state.block_comment_depth = 1;
                        Outcome::Jump {
                            at: Some(rel),
                            next: rel + 2,
                        }
                    }
                    // `/-` or a stray slash: index it; the builder decides.
                    _ => Outcome::Emit { next: rel + 1 },
                }
            }
            b'{' | b'}' | b'(' | b')' | b';' | b'=' => Outcome::Emit { next: rel + 1 },
            b'\r' => {
                if rel + 1 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                let next = if data.get(rel + 1) == Some(&b'\n') {
                    rel + 2
                } else {
                    rel + 1
                };
                Outcome::Emit { next }
            }
            b'\n' | 0x0B | 0x0C => Outcome::Emit { next: rel + 1 },
            0xC2 => {
                if rel + 1 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                if data.get(rel + 1) == Some(&0x85) {
                    Outcome::Emit { next: rel + 2 }
                } else {
                    Outcome::Pass { next: rel + 1 }
                }
            }
            0xE2 => {
                if rel + 2 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                if data.get(rel + 1) == Some(&0x80)
                    && matches!(data.get(rel + 2), Some(&0xA8) | Some(&0xA9))
                {
                    Outcome::Emit { next: rel + 3 }
                } else {
                    Outcome::Pass { next: rel + 1 }
                }
            }
            _ => Outcome::Pass { next: rel + 1 },
        }
    }

    fn handle_in_string(&mut self, data: &[u8], rel: usize, eof: bool, b: u8) -> Outcome {
        if b == b'\\' && !self.state.raw {
            // Skip the escape introducer and the escaped byte. Multi-byte
            // escaped codepoints are safe: continuation bytes are never
            // candidates in string state.
            if rel + 1 >= data.len() && !eof {
                return Outcome::NeedMore;
            }
            return Outcome::Pass { next: rel + 2 };
        }
        // A quote: close candidate.
        let h = self.state.raw_hash_count as usize;
        if self.state.multiline {
            if data.len() < rel + 3 + h && !eof {
                return Outcome::NeedMore;
            }
            let closes = data.get(rel + 1) == Some(&b'"')
                && data.get(rel + 2) == Some(&b'"')
                && (0..h).all(|i| data.get(rel + 3 + i) == Some(&b'#'));
            if closes {
                self.state = ScanState::default();
                Outcome::Jump {
                    at: Some(rel),
                    next: rel + 3 + h,
                }
            } else {
                Outcome::Pass { next: rel + 1 }
            }
        } else {
            if data.len() < rel + 1 + h && !eof {
                return Outcome::NeedMore;
            }
            let closes = (0..h).all(|i| data.get(rel + 1 + i) == Some(&b'#'));
            if closes {
                self.state = ScanState::default();
                Outcome::Jump {
                    at: Some(rel),
                    next: rel + 1 + h,
                }
            } else {
                Outcome::Pass { next: rel + 1 }
            }
        }
    }

    fn handle_in_line_comment(&mut self, data: &[u8], rel: usize, eof: bool, b: u8) -> Outcome {
        let (is_newline, len) = match b {
            b'\r' => {
                if rel + 1 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                (true, if data.get(rel + 1) == Some(&b'\n') { 2 } else { 1 })
            }
            b'\n' | 0x0B | 0x0C => (true, 1),
            0xC2 => {
                if rel + 1 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                (data.get(rel + 1) == Some(&0x85), 2)
            }
            0xE2 => {
                if rel + 2 >= data.len() && !eof {
                    return Outcome::NeedMore;
                }
                (
                    data.get(rel + 1) == Some(&0x80)
                        && matches!(data.get(rel + 2), Some(&0xA8) | Some(&0xA9)),
                    3,
                )
            }
            _ => (false, 1),
        };
        if is_newline {
            self.state.in_line_comment = false;
            Outcome::Jump {
                at: Some(rel),
                next: rel + len,
            }
        } else {
            Outcome::Pass { next: rel + 1 }
        }
    }

    fn handle_in_block_comment(&mut self, data: &[u8], rel: usize, eof: bool, b: u8) -> Outcome {
        if rel + 1 >= data.len() && !eof {
            return Outcome::NeedMore;
        }
        match (b, data.get(rel + 1)) {
            (b'*', Some(b'/')) => {
                self.state.block_comment_depth -= 1;
                if self.state.block_comment_depth == 0 {
                    // Index the closing slash so the gap walker knows where
                    // the comment ends.
                    Outcome::Jump {
                        at: Some(rel + 1),
                        next: rel + 2,
                    }
                } else {
                    Outcome::Pass { next: rel + 2 }
                }
            }
            (b'/', Some(b'*')) => {
                self.state.block_comment_depth += 1;
                Outcome::Pass { next: rel + 2 }
            }
            _ => Outcome::Pass { next: rel + 1 },
        }
    }

    /// True when the scanner ended outside any string or comment.
    pub fn finished_clean(&self) -> bool {
        self.state.is_normal()
    }
}

/// Scan a complete in-memory slice.
pub fn structural_scan(source: &[u8]) -> Vec<u64> {
    let mut scanner = StructuralScanner::new();
    let consumed = scanner.scan_chunk(source, 0, true);
    debug_assert_eq!(consumed, source.len());
    scanner.into_indices()
}
