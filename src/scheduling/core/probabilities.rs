//! Multinomial-logit probability conversion (`utils_to_probs`).
//!
//! Purpose
//! -------
//! Convert a utility matrix (choosers × alternatives) into a
//! row-stochastic probability matrix with a numerically stable softmax.
//! Exponentiating raw utilities overflows `f64` well below the magnitudes
//! calibrated specs can produce, so each row's maximum is subtracted
//! first — a no-op under the multinomial-logit model, which is invariant
//! to a per-row additive shift.
//!
//! Key behaviors
//! -------------
//! - `probs[i][j] = exp(u[i][j] − max_i) / Σ_k exp(u[i][k] − max_i)`.
//! - Rows with no usable alternative (maximum utility not finite, or an
//!   exponentiated sum that is zero or non-finite) fail with
//!   [`ChoiceError::DegenerateChoiceSet`] naming the row and chooser id —
//!   never a silent NaN-filled row.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output rows sum to 1.0 within 1e-9 relative tolerance.
//! - Every output entry lies in `[0, 1]`.
//! - Adding any constant to an entire utility row leaves its probability
//!   row unchanged (up to floating rounding).
//! - The engine hands in finite utilities (checked at evaluation time);
//!   direct callers passing ±inf/NaN rows get the degenerate-row error.
//!
//! Testing notes
//! -------------
//! - Unit tests cover known softmax values, the row-sum and
//!   shift-invariance guarantees, stability under large utilities, and
//!   degenerate rows.
use ndarray::Array2;

use crate::scheduling::errors::{ChoiceError, ChoiceResult};

/// Convert a utility matrix into a row-stochastic probability matrix.
///
/// Parameters
/// ----------
/// - `utilities`: choosers (rows) × alternatives (columns).
/// - `chooser_ids`: one id per utility row, used in error payloads.
/// - `label`: trace label of the category being scheduled, used in error
///   payloads.
///
/// Returns
/// -------
/// `ChoiceResult<Array2<f64>>`
///   A matrix of the same shape whose rows each sum to 1.0 within 1e-9
///   relative tolerance.
///
/// Errors
/// ------
/// - `ChoiceError::ShapeMismatch` if `chooser_ids` disagrees with the row
///   count, or the matrix has zero columns.
/// - `ChoiceError::DegenerateChoiceSet` if a row has no alternative with
///   finite utility and positive exponentiated mass.
pub fn utils_to_probs(
    utilities: &Array2<f64>, chooser_ids: &[u64], label: &str,
) -> ChoiceResult<Array2<f64>> {
    if utilities.nrows() != chooser_ids.len() {
        return Err(ChoiceError::ShapeMismatch {
            context: "utils_to_probs chooser ids",
            expected: utilities.nrows(),
            actual: chooser_ids.len(),
        });
    }
    if utilities.ncols() == 0 {
        return Err(ChoiceError::ShapeMismatch {
            context: "utils_to_probs alternative columns",
            expected: 1,
            actual: 0,
        });
    }

    let mut probabilities = Array2::<f64>::zeros(utilities.raw_dim());

    for (row, utility_row) in utilities.rows().into_iter().enumerate() {
        let row_max = utility_row.fold(f64::NEG_INFINITY, |acc, &u| acc.max(u));
        if !row_max.is_finite() {
            return Err(ChoiceError::DegenerateChoiceSet {
                label: label.to_string(),
                row,
                chooser_id: chooser_ids[row],
            });
        }

        let mut sum = 0.0;
        {
            let mut out_row = probabilities.row_mut(row);
            for (column, &utility) in utility_row.iter().enumerate() {
                let mass = (utility - row_max).exp();
                out_row[column] = mass;
                sum += mass;
            }
        }
        // The shifted maximum contributes exp(0) = 1, so a finite row sums
        // to at least 1; anything else marks a degenerate row.
        if !sum.is_finite() || sum <= 0.0 {
            return Err(ChoiceError::DegenerateChoiceSet {
                label: label.to_string(),
                row,
                chooser_id: chooser_ids[row],
            });
        }

        let mut out_row = probabilities.row_mut(row);
        out_row.mapv_inplace(|mass| mass / sum);
    }

    Ok(probabilities)
}
