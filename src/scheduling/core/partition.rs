//! Chunk partitioning — bound peak memory of the interaction dataset.
//!
//! Purpose
//! -------
//! Turn a chunk-size budget into explicit, contiguous chooser ranges so
//! the orchestrator never materializes more than `budget` interaction rows
//! at once. Extracted into a pure function so the memory policy is
//! unit-testable in isolation from the engine.
//!
//! Invariants & assumptions
//! ------------------------
//! - The returned ranges cover `[0, chooser_count)` exactly: contiguous,
//!   non-overlapping, in ascending order.
//! - Every range satisfies `len × alt_count ≤ budget`, except when the
//!   budget is smaller than a single chooser's row block, in which case
//!   ranges degrade to one chooser each (a chooser's alternatives are
//!   never split across chunks).
//! - `budget == 0` means "no chunking": a single range spanning the whole
//!   population.
//!
//! Testing notes
//! -------------
//! - Unit tests sweep budgets from under one row block to over the whole
//!   population and assert coverage, ordering, and the budget bound.
use std::ops::Range;

/// Partition `chooser_count` rows into contiguous chunk ranges.
///
/// Parameters
/// ----------
/// - `chooser_count`: number of chooser rows to cover.
/// - `alt_count`: alternatives per chooser (each chooser contributes
///   `alt_count` interaction rows); treated as 1 if zero.
/// - `budget`: maximum interaction rows per chunk; `0` = single chunk.
///
/// Returns
/// -------
/// `Vec<Range<usize>>`
///   Half-open chooser ranges, ascending, covering `[0, chooser_count)`
///   with no overlap. Empty iff `chooser_count == 0`.
pub fn partition(chooser_count: usize, alt_count: usize, budget: usize) -> Vec<Range<usize>> {
    if chooser_count == 0 {
        return Vec::new();
    }
    if budget == 0 {
        return vec![0..chooser_count];
    }

    // A chooser's alternatives stay together; a budget below one row block
    // degrades to single-chooser chunks.
    let per_chunk = (budget / alt_count.max(1)).max(1);

    let mut ranges = Vec::with_capacity(chooser_count.div_ceil(per_chunk));
    let mut start = 0;
    while start < chooser_count {
        let end = (start + per_chunk).min(chooser_count);
        ranges.push(start..end);
        start = end;
    }
    ranges
}
