//! Core building blocks of the discrete-choice scheduling stack.
//!
//! Purpose
//! -------
//! Collect the validated data containers and numeric primitives the
//! engine is assembled from: input tables, coefficient specs and
//! constants, the restricted expression language, run options, chunk
//! partitioning, the stabilized probability conversion, reproducible
//! sampling, and the result series.
//!
//! Key behaviors
//! -------------
//! - Validate inputs once at construction ([`table`], [`spec`]) or at
//!   bind time ([`validation`]) so the engine's hot loops can assume
//!   clean data.
//! - Keep the numeric primitives ([`probabilities`], [`sampling`],
//!   [`partition`]) free of orchestration concerns; they know nothing
//!   about chunks beyond their explicit arguments and perform no I/O and
//!   no logging.
//!
//! Downstream usage
//! ----------------
//! - `scheduling::engine` drives these pieces per chunk; most callers
//!   interact with this module only through the re-exports below and the
//!   crate prelude.

pub mod expr;
pub mod options;
pub mod partition;
pub mod probabilities;
pub mod sampling;
pub mod series;
pub mod spec;
pub mod table;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::expr::{Expr, Scope};
pub use self::options::SimOptions;
pub use self::partition::partition;
pub use self::probabilities::utils_to_probs;
pub use self::sampling::{make_choices, RandomChannel};
pub use self::series::{ChoiceSeries, ChoiceSummary};
pub use self::spec::{ChoiceSpec, Coefficients, Constants, SpecRow};
pub use self::table::{Alternatives, Choosers, DURATION_COLUMN, END_COLUMN, START_COLUMN};
pub use self::validation::validate_inputs;
