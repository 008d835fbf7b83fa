//! Diagnostic trace sinks — targeted dumps for one designated household.
//!
//! Purpose
//! -------
//! Define the sink interface the orchestrator hands a traced household's
//! intermediate computation to: the interaction design rows, the utility
//! matrix, the probability matrix, and the final choices. A sink is an
//! explicit value owned by the caller for the duration of a run and passed
//! into the drivers — there is no global tracer registry and no lazily
//! created handler state.
//!
//! Key behaviors
//! -------------
//! - [`TraceSink`] receives one call per artifact per traced chunk,
//!   sliced to the designated household's rows only.
//! - [`NullTraceSink`] accepts everything and writes nothing (the untraced
//!   run).
//! - [`CsvTraceSink`](csv::CsvTraceSink) writes one CSV file per artifact
//!   into a caller-chosen directory.
//!
//! Invariants & assumptions
//! ------------------------
//! - Tracing is fire-and-forget: a [`TraceError`] is logged at WARN by the
//!   orchestrator and swallowed; it never aborts the simulation and never
//!   converts into an engine error.
//! - Sinks may be called with empty row sets and must treat that as a
//!   successful no-op.
//!
//! Conventions
//! -----------
//! - Matrix artifacts arrive as `ndarray` views with parallel id slices:
//!   `tour_ids` labels rows, `alt_ids` labels columns (or rows, for the
//!   interaction dataset, which is in interaction-row-major form).
//! - Labels are category-qualified by the dispatch layer (e.g.
//!   `"mandatory.school"`), so two categories never collide on artifact
//!   names.
//!
//! Testing notes
//! -------------
//! - `csv` module tests run a sink against a temp directory and read the
//!   files back; trait-level behavior is exercised by the driver tests
//!   through a recording sink.

pub mod csv;

use ndarray::ArrayView2;

pub use self::csv::CsvTraceSink;

/// Result alias for sink operations that may produce [`TraceError`].
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors from writing diagnostic output.
///
/// Carried by value with the failing path and the underlying message;
/// the orchestrator logs these and continues.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceError {
    /// Filesystem-level failure (directory creation, flush).
    Io { path: String, message: String },
    /// CSV-level failure (open, record write).
    Csv { path: String, message: String },
}

impl std::error::Error for TraceError {}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceError::Io { path, message } => {
                write!(f, "Trace I/O failure at {path:?}: {message}")
            }
            TraceError::Csv { path, message } => {
                write!(f, "Trace CSV failure at {path:?}: {message}")
            }
        }
    }
}

/// Receiver for a traced household's intermediate computation.
///
/// One call per artifact per traced chunk; implementations must not
/// assume any particular call order beyond "within one chunk,
/// interaction → utilities → probabilities → choices".
pub trait TraceSink {
    /// The interaction design rows for the traced household: one row per
    /// (tour, alternative) pair, one column per spec expression.
    fn write_interaction(
        &mut self, label: &str, expressions: &[String], tour_ids: &[u64], alt_ids: &[u64],
        values: ArrayView2<f64>,
    ) -> TraceResult<()>;

    /// The traced household's utility rows (tours × alternatives).
    fn write_utilities(
        &mut self, label: &str, tour_ids: &[u64], alt_ids: &[u64],
        utilities: ArrayView2<f64>,
    ) -> TraceResult<()>;

    /// The traced household's probability rows (tours × alternatives).
    fn write_probabilities(
        &mut self, label: &str, tour_ids: &[u64], alt_ids: &[u64],
        probabilities: ArrayView2<f64>,
    ) -> TraceResult<()>;

    /// The traced household's final choices and chosen probabilities.
    fn write_choices(
        &mut self, label: &str, tour_ids: &[u64], choices: &[u64], probabilities: &[f64],
    ) -> TraceResult<()>;
}

/// A sink that accepts everything and writes nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn write_interaction(
        &mut self, _label: &str, _expressions: &[String], _tour_ids: &[u64],
        _alt_ids: &[u64], _values: ArrayView2<f64>,
    ) -> TraceResult<()> {
        Ok(())
    }

    fn write_utilities(
        &mut self, _label: &str, _tour_ids: &[u64], _alt_ids: &[u64],
        _utilities: ArrayView2<f64>,
    ) -> TraceResult<()> {
        Ok(())
    }

    fn write_probabilities(
        &mut self, _label: &str, _tour_ids: &[u64], _alt_ids: &[u64],
        _probabilities: ArrayView2<f64>,
    ) -> TraceResult<()> {
        Ok(())
    }

    fn write_choices(
        &mut self, _label: &str, _tour_ids: &[u64], _choices: &[u64],
        _probabilities: &[f64],
    ) -> TraceResult<()> {
        Ok(())
    }
}
