//! Errors for the discrete-choice scheduling stack (expression evaluation,
//! table/spec validation, probability conversion, and orchestration).
//!
//! This module defines an expression error type, [`EvalError`], and an
//! engine error type, [`ChoiceError`], used across the scheduling stack.
//! Both implement `Display`/`Error`; [`ChoiceError`] wraps [`EvalError`]
//! with run context (trace label and chooser chunk) when an expression
//! fails inside a simulation.
//!
//! ## Conventions
//! - **Indices are 0-based**; chunk boundaries are half-open `[start, end)`
//!   ranges over chooser rows.
//! - Chooser, person, household, and alternative identities are `u64`.
//! - Utility values must be **finite**; probabilities must lie in `[0, 1]`.
//! - Evaluation and conversion errors abort the whole run — the computation
//!   is deterministic, so a retry cannot change the outcome, and partial
//!   results would violate the full-coverage output contract.
//! - Trace-sink failures are **not** represented here; see
//!   `crate::trace::TraceError`, which is logged and swallowed by the
//!   orchestrator rather than propagated.

/// Result alias for expression parse/evaluation paths that may produce
/// [`EvalError`].
pub type EvalResult<T> = Result<T, EvalError>;

/// Result alias for engine operations that may produce [`ChoiceError`].
pub type ChoiceResult<T> = Result<T, ChoiceError>;

/// Errors from the restricted spec-expression language.
///
/// Covers parse failures at spec construction time and resolution/numeric
/// failures at evaluation time. Every variant carries the offending
/// expression text so a failing spec row can be identified without extra
/// context.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The expression text could not be parsed.
    Parse { expression: String, position: usize, reason: &'static str },

    /// An identifier resolved to neither an alternative attribute, a chooser
    /// attribute, nor a constant.
    UndefinedIdentifier { identifier: String, expression: String },

    /// A division evaluated with a zero divisor.
    DivisionByZero { expression: String },

    /// The expression evaluated to NaN or ±inf.
    NonFiniteResult { expression: String, value: f64 },
}

impl std::error::Error for EvalError {}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::Parse { expression, position, reason } => {
                write!(f, "Cannot parse expression {expression:?} at offset {position}: {reason}")
            }
            EvalError::UndefinedIdentifier { identifier, expression } => {
                write!(
                    f,
                    "Identifier {identifier:?} in expression {expression:?} is neither an \
                     alternative attribute, a chooser attribute, nor a constant"
                )
            }
            EvalError::DivisionByZero { expression } => {
                write!(f, "Division by zero while evaluating expression {expression:?}")
            }
            EvalError::NonFiniteResult { expression, value } => {
                write!(f, "Expression {expression:?} evaluated to a non-finite value: {value}")
            }
        }
    }
}

/// Unified error type for the discrete-choice engine.
///
/// Covers table and spec construction, cross-input validation, utility
/// evaluation, probability conversion, sampling, and result assembly.
/// Run-time variants carry the trace label of the category being scheduled
/// and, where available, the chunk boundary or chooser id, so a fatal error
/// identifies where in the population the failure occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceError {
    // ---- Table construction ----
    /// A table was constructed with zero rows where rows are required.
    EmptyTable { table: &'static str },

    /// A table index contains the same identity twice.
    DuplicateIndex { table: &'static str, id: u64 },

    /// A column's length disagrees with the table index length.
    ColumnLengthMismatch { table: &'static str, column: String, expected: usize, actual: usize },

    /// An attribute value is NaN or ±inf.
    NonFiniteAttribute { table: &'static str, column: String, row: usize, value: f64 },

    /// A reserved column name was supplied as an extra column.
    ReservedColumn { table: &'static str, column: String },

    /// An alternative's window ends before it starts.
    NegativeDuration { position: usize, start: f64, end: f64 },

    // ---- Spec construction / validation ----
    /// The spec contains no expression rows.
    EmptySpec,

    /// A spec row's per-alternative coefficients do not match the
    /// alternative count.
    CoefficientArityMismatch { expression: String, expected: usize, actual: usize },

    /// A coefficient is NaN or ±inf.
    NonFiniteCoefficient { expression: String, position: usize, value: f64 },

    // ---- Run-time: evaluation / conversion / sampling ----
    /// An expression failed to parse or evaluate; wraps the underlying
    /// [`EvalError`] with the category label and chooser chunk being
    /// processed (`(0, n)` for bind-time validation).
    Eval { label: String, chunk: (usize, usize), source: EvalError },

    /// A utility cell came out NaN or ±inf.
    NonFiniteUtility { label: String, chooser_id: u64, alt_position: usize, value: f64 },

    /// A chooser's row offers no finite, positive-probability alternative.
    DegenerateChoiceSet { label: String, row: usize, chooser_id: u64 },

    /// A probability lies outside `[0, 1]`.
    InvalidProbability { label: String, row: usize, column: usize, value: f64 },

    // ---- Result assembly ----
    /// An internal shape invariant was violated (programming error, not
    /// user error); the run cannot be trusted and is aborted.
    ShapeMismatch { context: &'static str, expected: usize, actual: usize },

    /// The same chooser appeared in more than one merged result series.
    DuplicateChooser { chooser_id: u64 },

    /// A result series references a chooser the target table does not have.
    UnknownChooser { chooser_id: u64 },
}

impl std::error::Error for ChoiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChoiceError::Eval { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChoiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Table construction ----
            ChoiceError::EmptyTable { table } => {
                write!(f, "Table {table:?} has no rows.")
            }
            ChoiceError::DuplicateIndex { table, id } => {
                write!(f, "Table {table:?} index contains id {id} more than once.")
            }
            ChoiceError::ColumnLengthMismatch { table, column, expected, actual } => {
                write!(
                    f,
                    "Column {column:?} of table {table:?} has length {actual}; expected {expected}"
                )
            }
            ChoiceError::NonFiniteAttribute { table, column, row, value } => {
                write!(
                    f,
                    "Column {column:?} of table {table:?} is non-finite at row {row}: {value}"
                )
            }
            ChoiceError::ReservedColumn { table, column } => {
                write!(f, "Column name {column:?} is reserved by table {table:?}.")
            }
            ChoiceError::NegativeDuration { position, start, end } => {
                write!(
                    f,
                    "Alternative at position {position} ends before it starts: start={start}, \
                     end={end}"
                )
            }
            // ---- Spec construction / validation ----
            ChoiceError::EmptySpec => {
                write!(f, "Choice spec has no expression rows.")
            }
            ChoiceError::CoefficientArityMismatch { expression, expected, actual } => {
                write!(
                    f,
                    "Spec row {expression:?} has {actual} coefficients; expected one per \
                     alternative ({expected})"
                )
            }
            ChoiceError::NonFiniteCoefficient { expression, position, value } => {
                write!(
                    f,
                    "Spec row {expression:?} has a non-finite coefficient at position \
                     {position}: {value}"
                )
            }
            // ---- Run-time ----
            ChoiceError::Eval { label, chunk, source } => {
                write!(
                    f,
                    "[{label}] expression failure in chooser chunk [{}, {}): {source}",
                    chunk.0, chunk.1
                )
            }
            ChoiceError::NonFiniteUtility { label, chooser_id, alt_position, value } => {
                write!(
                    f,
                    "[{label}] utility for chooser {chooser_id}, alternative position \
                     {alt_position} is non-finite: {value}"
                )
            }
            ChoiceError::DegenerateChoiceSet { label, row, chooser_id } => {
                write!(
                    f,
                    "[{label}] chooser {chooser_id} (row {row}) has no alternative with \
                     finite utility and positive probability"
                )
            }
            ChoiceError::InvalidProbability { label, row, column, value } => {
                write!(
                    f,
                    "[{label}] probability at row {row}, column {column} is outside [0, 1]: \
                     {value}"
                )
            }
            // ---- Result assembly ----
            ChoiceError::ShapeMismatch { context, expected, actual } => {
                write!(f, "Shape mismatch in {context}: expected {expected}, got {actual}")
            }
            ChoiceError::DuplicateChooser { chooser_id } => {
                write!(f, "Chooser {chooser_id} appears in more than one result series.")
            }
            ChoiceError::UnknownChooser { chooser_id } => {
                write!(f, "Result series references chooser {chooser_id}, which the target \
                           table does not contain.")
            }
        }
    }
}

impl ChoiceError {
    /// Wrap an [`EvalError`] with the run context it occurred in.
    ///
    /// `chunk` is the half-open chooser range being processed; bind-time
    /// validation uses `(0, chooser_count)`.
    pub fn eval(label: &str, chunk: (usize, usize), source: EvalError) -> ChoiceError {
        ChoiceError::Eval { label: label.to_string(), chunk, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Display output of representative variants of `EvalError` and
    //   `ChoiceError` (the parts downstream logs and test assertions rely on).
    // - The `Eval` wrapper constructor and its `source()` chaining.
    //
    // They intentionally DO NOT cover:
    // - Every variant's message text verbatim; messages are exercised
    //   indirectly wherever modules assert on specific error values.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure `EvalError::UndefinedIdentifier` names both the identifier and
    // the expression, since operators rely on that to find the broken spec
    // row.
    //
    // Given
    // -----
    // - An `UndefinedIdentifier` for `bogus_column` inside `bogus_column * 2`.
    //
    // Expect
    // ------
    // - The Display output contains both strings.
    fn eval_error_display_names_identifier_and_expression() {
        let err = EvalError::UndefinedIdentifier {
            identifier: "bogus_column".to_string(),
            expression: "bogus_column * 2".to_string(),
        };

        let text = err.to_string();

        assert!(text.contains("bogus_column"), "missing identifier in: {text}");
        assert!(text.contains("bogus_column * 2"), "missing expression in: {text}");
    }

    #[test]
    // Purpose
    // -------
    // Verify that `ChoiceError::eval` preserves label, chunk, and source,
    // and that `source()` exposes the wrapped `EvalError`.
    //
    // Given
    // -----
    // - A `DivisionByZero` evaluation error wrapped with label "school" and
    //   chunk (10, 20).
    //
    // Expect
    // ------
    // - The wrapper matches `ChoiceError::Eval` with the same payload.
    // - `std::error::Error::source` returns the inner error.
    fn choice_error_eval_wraps_source_with_context() {
        let inner = EvalError::DivisionByZero { expression: "1 / x".to_string() };

        let err = ChoiceError::eval("school", (10, 20), inner.clone());

        assert_eq!(
            err,
            ChoiceError::Eval { label: "school".to_string(), chunk: (10, 20), source: inner }
        );
        let source = std::error::Error::source(&err).expect("Eval should chain its source");
        assert!(source.to_string().contains("1 / x"));
    }

    #[test]
    // Purpose
    // -------
    // Ensure the fatal-run variants render the label and location context
    // the orchestrator promises in its failure contract.
    //
    // Given
    // -----
    // - A `DegenerateChoiceSet` for chooser 42 at row 3 under label "work".
    //
    // Expect
    // ------
    // - Display output contains the label, the chooser id, and the row.
    fn choice_error_degenerate_display_contains_context() {
        let err = ChoiceError::DegenerateChoiceSet {
            label: "work".to_string(),
            row: 3,
            chooser_id: 42,
        };

        let text = err.to_string();

        assert!(text.contains("work"), "missing label in: {text}");
        assert!(text.contains("42"), "missing chooser id in: {text}");
        assert!(text.contains("3"), "missing row in: {text}");
    }
}
