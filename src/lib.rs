//! rust_microsim — discrete-choice simulation core for activity-based
//! travel demand models.
//!
//! Purpose
//! -------
//! Turn calibrated model coefficients and agent attributes into concrete,
//! reproducible choices at population scale. The crate implements the
//! statistical core of an activity-based microsimulation's tour
//! scheduling step: utility evaluation over a chooser×alternative
//! interaction dataset, numerically stable multinomial-logit conversion,
//! seeded stochastic sampling, and the chunked orchestration that bounds
//! peak memory over arbitrarily large populations.
//!
//! Key behaviors
//! -------------
//! - Expose the scheduling stack under [`scheduling`]: validated tables
//!   and specs, the restricted expression language, the probability and
//!   sampling primitives, and the chunked / category-dispatch drivers.
//! - Expose the diagnostic side channel under [`trace`]: an explicit
//!   sink interface (CSV and null implementations) receiving one
//!   designated household's intermediate computation.
//!
//! Invariants & assumptions
//! ------------------------
//! - All heavy numerical work lives in the inner modules; inputs are
//!   validated once at construction or bind time, and the engine's hot
//!   loops assume clean data.
//! - For a fixed seed, results are bit-for-bit reproducible and
//!   independent of chunk size and row ordering.
//! - Configuration/spec *file* loading, upstream table merging, and the
//!   step-sequencing pipeline are external collaborators; this crate
//!   takes their outputs as explicit arguments.
//!
//! Conventions
//! -----------
//! - Errors are rich per-subsystem enums (`ChoiceError`, `EvalError`,
//!   `TraceError`) propagated with `?`; trace failures alone are logged
//!   and swallowed.
//! - Logging goes through `tracing` and is confined to the engine layer.

pub mod scheduling;
pub mod trace;

pub use scheduling::prelude;
