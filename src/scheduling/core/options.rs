//! Run options — explicit configuration for a scheduling run.
//!
//! Purpose
//! -------
//! Bundle the knobs a simulation run needs (random seed, chunk-size
//! budget, optional trace household) into one explicit value passed down
//! the call chain. Nothing in the engine reads ambient or global state;
//! callers that keep these in a settings registry resolve them into a
//! [`SimOptions`] at the boundary.
//!
//! Conventions
//! -----------
//! - `chunk_budget` counts **interaction rows** (choosers × alternatives)
//!   materialized at once; `0` means "no chunking" (one chunk spanning the
//!   whole population). The budget is purely a memory/performance knob —
//!   results are identical for any value given the same seed.
//! - `trace_household` selects the single household whose intermediate
//!   computation is handed to the trace sink; `None` disables tracing.
//!
//! Testing notes
//! -------------
//! - A plain data carrier; construction is covered here, behavior under
//!   different budgets in the partition and driver tests.

/// SimOptions — seed, chunk budget, and trace target for one run.
///
/// Fields
/// ------
/// - `seed`: base seed for the per-chooser random sub-streams; fixing it
///   makes every choice bit-for-bit reproducible.
/// - `chunk_budget`: maximum interaction rows per chunk; `0` = unchunked.
/// - `trace_household`: household id whose choosers are traced, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimOptions {
    /// Base seed for the per-chooser random sub-streams.
    pub seed: u64,
    /// Maximum interaction rows materialized per chunk; `0` = unchunked.
    pub chunk_budget: usize,
    /// Household to trace, if any.
    pub trace_household: Option<u64>,
}

impl SimOptions {
    /// Construct run options.
    pub fn new(seed: u64, chunk_budget: usize, trace_household: Option<u64>) -> SimOptions {
        SimOptions { seed, chunk_budget, trace_household }
    }
}

impl Default for SimOptions {
    /// Seed 0, unchunked, no tracing.
    fn default() -> SimOptions {
        SimOptions { seed: 0, chunk_budget: 0, trace_household: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify the constructor and `Default` set fields as documented.
    //
    // Given
    // -----
    // - `SimOptions::new(42, 1000, Some(7))` and `SimOptions::default()`.
    //
    // Expect
    // ------
    // - Fields round-trip; the default is seed 0, unchunked, untraced.
    fn sim_options_construction_sets_fields() {
        let options = SimOptions::new(42, 1000, Some(7));
        assert_eq!(options.seed, 42);
        assert_eq!(options.chunk_budget, 1000);
        assert_eq!(options.trace_household, Some(7));

        assert_eq!(SimOptions::default(), SimOptions::new(0, 0, None));
    }
}
