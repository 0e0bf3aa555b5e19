//! Grammar-aware partitioning and the sharded parallel parse.
//!
//! Partition points are top-level node boundaries: a newline or `;` at
//! brace depth 0 that is outside strings and comments. The structural
//! index already excludes string/comment interiors, so the walk here only
//! tracks brace depth, pending line continuations, and pending
//! slashdashes. Each shard parses independently on the rayon pool; a
//! single-threaded merge coalesces the results.

use rayon::prelude::*;

use crate::doc::{self, Document};
use crate::error::Result;
use crate::scanner::structural_scan;

use super::{ParseOptions, parse_with_options};

/// Propose up to `target_partitions - 1` split offsets for `source`.
///
/// Returned offsets are starts of top-level nodes (the byte after a
/// depth-0 terminator), sorted and deduplicated. Fewer (or no) offsets
/// come back when the document has too few top-level boundaries.
pub fn find_node_boundaries(source: &[u8], target_partitions: usize) -> Vec<u64> {
    if target_partitions <= 1 || source.is_empty() {
        return Vec::new();
    }
    let indices = structural_scan(source);
    let mut candidates: Vec<u64> = Vec::new();
    let mut depth = 0usize;
    let mut escline = false;
    let mut slashdash_gap = false;
    let mut prev_end = 0usize;
    for &i in &indices {
        let at = i as usize;
        let b = source[at];
        // A slashdash awaiting its node is "fed" once any non-blank gap
        // content (the node name) goes by.
        if slashdash_gap && source[prev_end..at].iter().any(|&x| x != b' ' && x != b'\t') {
            slashdash_gap = false;
        }
        prev_end = at + 1;
        match b {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b'\\' => escline = depth == 0,
            b'/' if source.get(at + 1) == Some(&b'-') => {
                if depth == 0 {
                    slashdash_gap = true;
                }
                prev_end = at + 2;
            }
            b';' => {
                if depth == 0 && !slashdash_gap {
                    escline = false;
                    candidates.push(i + 1);
                }
            }
            b'\n' | 0x0B | 0x0C | b'\r' | 0xC2 | 0xE2 => {
                if depth == 0 {
                    let len = match b {
                        b'\r' if source.get(at + 1) == Some(&b'\n') => 2,
                        0xC2 => 2,
                        0xE2 => 3,
                        _ => 1,
                    };
                    prev_end = at + len;
                    if escline {
                        escline = false;
                    } else if !slashdash_gap {
                        candidates.push(i + len as u64);
                    }
                }
            }
            _ => {}
        }
    }

    let len = source.len() as u64;
    let n = target_partitions as u64;
    let mut cuts: Vec<u64> = Vec::new();
    for k in 1..n {
        let ideal = len * k / n;
        let pos = candidates.partition_point(|&c| c < ideal);
        let below = pos.checked_sub(1).map(|p| candidates[p]);
        let above = candidates.get(pos).copied();
        let best = match (below, above) {
            (Some(a), Some(b)) => {
                if ideal - a <= b - ideal {
                    a
                } else {
                    b
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => continue,
        };
        if best > cuts.last().copied().unwrap_or(0) && best < len {
            cuts.push(best);
        }
    }
    cuts
}

/// Parse `source` in shards and merge the results.
///
/// The source is split at top-level boundaries, each shard is parsed by
/// an independent parser instance, and the documents are merged with
/// handle and pool-offset shifting. If a shard fails, the whole source is
/// reparsed serially so errors carry document-absolute positions.
pub fn parse_parallel(
    source: &[u8],
    target_partitions: usize,
    options: &ParseOptions,
) -> Result<Document<'static>> {
    let cuts = find_node_boundaries(source, target_partitions);
    if cuts.is_empty() {
        return parse_with_options(source, options).map(Document::into_owned);
    }
    let mut spans = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0usize;
    for &c in &cuts {
        spans.push(start..c as usize);
        start = c as usize;
    }
    spans.push(start..source.len());
    tracing::debug!(shards = spans.len(), "parallel parse");

    let parsed: std::result::Result<Vec<_>, _> = spans
        .into_par_iter()
        .map(|span| parse_with_options(&source[span], options))
        .collect();
    match parsed {
        Ok(docs) => Ok(doc::merge(docs)),
        Err(_) => parse_with_options(source, options).map(Document::into_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_at_top_level_only() {
        let src = b"alpha 1\nbeta { c1\nc2 }\ngamma 3\n";
        let cuts = find_node_boundaries(src, 4);
        for &c in &cuts {
            // Each cut must start a top-level node (or end the input).
            let head = &src[c as usize..];
            assert!(
                head.is_empty() || head.starts_with(b"beta") || head.starts_with(b"gamma"),
                "bad cut at {c}"
            );
        }
    }

    #[test]
    fn test_boundaries_skip_escline() {
        let src = b"alpha \\\n  1\nbeta 2\n";
        let cuts = find_node_boundaries(src, 2);
        // The escline newline (offset 8) is not a boundary.
        assert!(!cuts.contains(&8));
    }

    #[test]
    fn test_boundaries_empty_for_single_partition() {
        assert!(find_node_boundaries(b"a\nb\n", 1).is_empty());
        assert!(find_node_boundaries(b"", 4).is_empty());
    }
}
