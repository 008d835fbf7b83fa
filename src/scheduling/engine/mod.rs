//! Engine — the user-facing simulation API of the scheduling stack.
//!
//! Purpose
//! -------
//! Assemble the core building blocks into the three layers callers use:
//! the per-chunk interaction view ([`interaction`]), the chunked
//! single-category driver ([`driver`]), and the category-dispatch /
//! write-back layer ([`dispatch`]).
//!
//! Key behaviors
//! -------------
//! - [`InteractionChunk`] materializes one chooser range crossed with the
//!   alternatives and evaluates spec expressions over it.
//! - [`simulate_choices`] bounds peak memory with the chunk budget and
//!   guarantees a result index equal to the input chooser index.
//! - [`schedule_tours`] and the mandatory / non-mandatory convenience
//!   drivers run disjoint purposes, merge, summarize, and write chosen
//!   windows back into the shared tour column.
//!
//! Downstream usage
//! ----------------
//! - Most callers need only [`schedule_mandatory_tours`] /
//!   [`schedule_non_mandatory_tours`] (or [`schedule_tours`] for custom
//!   category sets) plus the core types re-exported from
//!   `crate::scheduling`.

pub mod dispatch;
pub mod driver;
pub mod interaction;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::dispatch::{
    assign_choices, schedule_mandatory_tours, schedule_non_mandatory_tours, schedule_tours,
    TOUR_WINDOW_COLUMN,
};
pub use self::driver::simulate_choices;
pub use self::interaction::InteractionChunk;
