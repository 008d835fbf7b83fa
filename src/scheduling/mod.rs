//! scheduling — the discrete-choice tour scheduling stack.
//!
//! Purpose
//! -------
//! Provide the statistical core of an activity-based demand
//! microsimulation: given a chooser (tour) table, a shared alternatives
//! table, a coefficient spec, and a constants mapping, simulate one
//! discrete choice per chooser — reproducibly, at population scale, with
//! bounded peak memory. This module is the surface most consumers should
//! depend on.
//!
//! Key behaviors
//! -------------
//! - Collect validated inputs and numeric primitives in [`core`]: tables,
//!   specs, the restricted expression language, run options, chunk
//!   partitioning, the stabilized multinomial-logit conversion,
//!   reproducible sampling, and the result series.
//! - Expose the simulation API in [`engine`]: the chunked single-category
//!   driver and the category-dispatch layer that merges purposes and
//!   writes chosen windows back into the tour table.
//! - Centralize scheduling error types in [`errors`] (`EvalError`,
//!   `ChoiceError`, and the `EvalResult` / `ChoiceResult` aliases) so
//!   callers see a uniform error surface across the stack.
//! - Re-export the everyday types directly and via [`prelude`] for
//!   ergonomic imports.
//!
//! Invariants & assumptions
//! ------------------------
//! - Tables are validated at construction (unique ids, aligned columns,
//!   finite attributes, non-negative derived durations) and consumed
//!   read-only by the engine.
//! - Specs parse at construction and bind-check against the table schemas
//!   before any chunk is processed; an undefined attribute is an error,
//!   never a silent zero.
//! - Probability rows sum to 1.0 within 1e-9 and are invariant to
//!   per-row utility shifts; degenerate choice sets fail fast.
//! - Each chooser's random draw derives from `(seed, chooser id)`, so a
//!   fixed seed reproduces every choice bit-for-bit regardless of row
//!   order or chunk boundaries — the chunk budget is purely a memory
//!   knob.
//! - A run either completes with a series whose index equals the input
//!   chooser index exactly, or fails fast with a typed error naming the
//!   category, the chunk boundary, and where available the offending
//!   expression or chooser.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; chunk boundaries are half-open chooser ranges.
//!   Alternative ids are stable integers whose table position labels the
//!   corresponding matrix column.
//! - The numeric core performs no I/O and no logging; the engine layer
//!   logs through `tracing`, and the only I/O is the fire-and-forget
//!   trace sink owned by the caller (`crate::trace`).
//! - No component reads ambient or global state: every input (tables,
//!   spec, constants, chunk budget, trace target) arrives as an explicit
//!   argument.
//!
//! Downstream usage
//! ----------------
//! - Typical end-to-end flow:
//!   1. Construct [`Choosers`] and [`Alternatives`] from upstream tables
//!      (persons merged in, category tags assigned).
//!   2. Build one [`ChoiceSpec`] per purpose and the shared [`Constants`].
//!   3. Pick [`SimOptions`] (seed, chunk budget, optional trace
//!      household) and a `crate::trace` sink.
//!   4. Call [`engine::schedule_mandatory_tours`] /
//!      [`engine::schedule_non_mandatory_tours`] (or
//!      [`engine::schedule_tours`] for custom category sets); chosen
//!      windows land in the shared tour column and the merged
//!      [`ChoiceSeries`] is returned.
//! - Lower-level callers can drive [`engine::simulate_choices`] per
//!   category, or use the primitives ([`core::utils_to_probs`],
//!   [`core::make_choices`], [`core::partition`]) directly.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each module; the end-to-end pipeline,
//!   chunk-invariance, and the seeded frequency-convergence property are
//!   covered by `tests/integration_tour_scheduling.rs`.

pub mod core;
pub mod engine;
pub mod errors;

// ---- Re-exports (primary public surface) ----------------------------------
//
// The everyday types most users need. More specialized items (expression
// trees, interaction chunks, validation helpers) remain under their
// submodules.

pub use self::core::{
    make_choices, partition, utils_to_probs, Alternatives, ChoiceSeries, ChoiceSpec,
    ChoiceSummary, Choosers, Coefficients, Constants, RandomChannel, SimOptions,
};

pub use self::engine::{
    assign_choices, schedule_mandatory_tours, schedule_non_mandatory_tours, schedule_tours,
    simulate_choices, TOUR_WINDOW_COLUMN,
};

pub use self::errors::{ChoiceError, ChoiceResult, EvalError, EvalResult};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_microsim::scheduling::prelude::*;
//
// to import the main scheduling surface in a single line.

pub mod prelude {
    pub use super::{
        assign_choices, make_choices, schedule_mandatory_tours, schedule_non_mandatory_tours,
        schedule_tours, simulate_choices, utils_to_probs, Alternatives, ChoiceError,
        ChoiceResult, ChoiceSeries, ChoiceSpec, ChoiceSummary, Choosers, Coefficients,
        Constants, EvalError, EvalResult, RandomChannel, SimOptions, TOUR_WINDOW_COLUMN,
    };
}
