//! Interaction chunks — the chooser×alternative cross join, one chunk at
//! a time.
//!
//! Purpose
//! -------
//! Materialize the engine's view of one chooser range crossed with the
//! shared alternatives table, and evaluate spec expressions over it. The
//! cross product exists only as this borrowed view plus the matrices
//! computed from it; no interaction table is ever stored.
//!
//! Key behaviors
//! -------------
//! - Rows cover the chunk's choosers × alternatives exactly, in
//!   chooser-major order (all alternatives of a chooser contiguous) —
//!   the order the utility matrix reshape relies on.
//! - Expression identifiers resolve alternative attributes first, then
//!   chooser attributes, then constants.
//! - [`InteractionChunk::utilities`] accumulates
//!   `Σ_k coefficient_k(alt) × expression_k(chooser, alt)` per cell and
//!   fails fast on any non-finite cell.
//! - [`InteractionChunk::design_for_choosers`] re-evaluates the
//!   per-expression values for selected choosers, for the trace sink's
//!   interaction artifact.
//!
//! Invariants & assumptions
//! ------------------------
//! - The chunk range lies within the chooser table; checked at
//!   construction.
//! - Inputs passed bind-time validation: per-alternative coefficient
//!   arity matches, and every identifier resolves. Evaluation errors can
//!   still occur for callers that skip validation and are surfaced with
//!   the chunk's chooser range.
//!
//! Testing notes
//! -------------
//! - Unit tests cover cross-product coverage and ordering, hand-computed
//!   utility matrices, resolution order, and the non-finite-utility and
//!   undefined-identifier error paths.
use std::ops::Range;

use ndarray::Array2;

use crate::scheduling::core::expr::Scope;
use crate::scheduling::core::spec::{ChoiceSpec, Constants};
use crate::scheduling::core::table::{Alternatives, Choosers};
use crate::scheduling::errors::{ChoiceError, ChoiceResult};

/// InteractionChunk — one chooser range crossed with the alternatives.
///
/// A borrowed, read-only view; construction only validates the range.
#[derive(Debug, Clone)]
pub struct InteractionChunk<'a> {
    choosers: &'a Choosers,
    alternatives: &'a Alternatives,
    range: Range<usize>,
}

impl<'a> InteractionChunk<'a> {
    /// Build the view for `range` (half-open chooser rows).
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::ShapeMismatch` if the range overruns the chooser
    ///   table.
    pub fn new(
        choosers: &'a Choosers, alternatives: &'a Alternatives, range: Range<usize>,
    ) -> ChoiceResult<InteractionChunk<'a>> {
        if range.end > choosers.len() || range.start > range.end {
            return Err(ChoiceError::ShapeMismatch {
                context: "interaction chunk range",
                expected: choosers.len(),
                actual: range.end,
            });
        }
        Ok(InteractionChunk { choosers, alternatives, range })
    }

    /// Number of choosers in the chunk.
    pub fn n_choosers(&self) -> usize {
        self.range.len()
    }

    /// Number of alternatives (matrix columns).
    pub fn n_alternatives(&self) -> usize {
        self.alternatives.len()
    }

    /// Number of interaction rows the chunk covers.
    pub fn n_rows(&self) -> usize {
        self.n_choosers() * self.n_alternatives()
    }

    /// The chunk's chooser range, for error payloads.
    pub fn chooser_range(&self) -> (usize, usize) {
        (self.range.start, self.range.end)
    }

    /// Tour ids of the chunk's choosers, in row order.
    pub fn chooser_ids(&self) -> &[u64] {
        &self.choosers.ids()[self.range.clone()]
    }

    /// The alternative id labeling matrix column `position`.
    pub fn alternative_id_at(&self, position: usize) -> u64 {
        self.alternatives.id_at(position)
    }

    /// Local chooser indices owned by `household`.
    pub fn choosers_of_household(&self, household: u64) -> Vec<usize> {
        let households = &self.choosers.household_ids()[self.range.clone()];
        households
            .iter()
            .enumerate()
            .filter(|(_, &h)| h == household)
            .map(|(local, _)| local)
            .collect()
    }

    /// Evaluate the spec into the chunk's utility matrix.
    ///
    /// Parameters
    /// ----------
    /// - `spec` / `constants`: the category's utility specification.
    /// - `label`: trace label of the category, for error payloads.
    ///
    /// Returns
    /// -------
    /// `ChoiceResult<Array2<f64>>`
    ///   `n_choosers × n_alternatives`, every cell finite.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::Eval` (with this chunk's chooser range) if an
    ///   expression fails to evaluate.
    /// - `ChoiceError::NonFiniteUtility` if accumulation overflows.
    pub fn utilities(
        &self, spec: &ChoiceSpec, constants: &Constants, label: &str,
    ) -> ChoiceResult<Array2<f64>> {
        let n_alts = self.n_alternatives();
        let mut utilities = Array2::<f64>::zeros((self.n_choosers(), n_alts));

        for row in spec.rows() {
            for local in 0..self.n_choosers() {
                let chooser_row = self.range.start + local;
                for alt_row in 0..n_alts {
                    let scope = InteractionScope {
                        choosers: self.choosers,
                        alternatives: self.alternatives,
                        constants,
                        chooser_row,
                        alt_row,
                    };
                    let value = row
                        .parsed()
                        .eval(row.expression(), &scope)
                        .map_err(|e| ChoiceError::eval(label, self.chooser_range(), e))?;
                    utilities[[local, alt_row]] += row.coefficients().at(alt_row) * value;
                }
            }
        }

        for (local, utility_row) in utilities.rows().into_iter().enumerate() {
            for (alt_position, &value) in utility_row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(ChoiceError::NonFiniteUtility {
                        label: label.to_string(),
                        chooser_id: self.chooser_ids()[local],
                        alt_position,
                        value,
                    });
                }
            }
        }

        Ok(utilities)
    }

    /// Re-evaluate the per-expression design values for selected choosers,
    /// in chooser-major interaction-row order.
    ///
    /// Parameters
    /// ----------
    /// - `local_choosers`: local chunk indices (e.g. from
    ///   [`InteractionChunk::choosers_of_household`]).
    ///
    /// Returns
    /// -------
    /// `ChoiceResult<(Vec<u64>, Vec<u64>, Array2<f64>)>`
    ///   Parallel tour ids and alternative ids per interaction row, plus
    ///   the `rows × expressions` design matrix.
    pub fn design_for_choosers(
        &self, spec: &ChoiceSpec, constants: &Constants, label: &str,
        local_choosers: &[usize],
    ) -> ChoiceResult<(Vec<u64>, Vec<u64>, Array2<f64>)> {
        let n_alts = self.n_alternatives();
        let n_rows = local_choosers.len() * n_alts;
        let mut tour_ids = Vec::with_capacity(n_rows);
        let mut alt_ids = Vec::with_capacity(n_rows);
        let mut values = Array2::<f64>::zeros((n_rows, spec.len()));

        for (block, &local) in local_choosers.iter().enumerate() {
            let chooser_row = self.range.start + local;
            for alt_row in 0..n_alts {
                let out_row = block * n_alts + alt_row;
                tour_ids.push(self.choosers.ids()[chooser_row]);
                alt_ids.push(self.alternatives.id_at(alt_row));

                let scope = InteractionScope {
                    choosers: self.choosers,
                    alternatives: self.alternatives,
                    constants,
                    chooser_row,
                    alt_row,
                };
                for (column, row) in spec.rows().iter().enumerate() {
                    let value = row
                        .parsed()
                        .eval(row.expression(), &scope)
                        .map_err(|e| ChoiceError::eval(label, self.chooser_range(), e))?;
                    values[[out_row, column]] = value;
                }
            }
        }

        Ok((tour_ids, alt_ids, values))
    }
}

/// Identifier resolution for one interaction row: alternative attribute,
/// then chooser attribute, then constant.
struct InteractionScope<'a> {
    choosers: &'a Choosers,
    alternatives: &'a Alternatives,
    constants: &'a Constants,
    chooser_row: usize,
    alt_row: usize,
}

impl Scope for InteractionScope<'_> {
    fn lookup(&self, identifier: &str) -> Option<f64> {
        if let Some(column) = self.alternatives.column(identifier) {
            return Some(column[self.alt_row]);
        }
        if let Some(column) = self.choosers.column(identifier) {
            return Some(column[self.chooser_row]);
        }
        self.constants.get(identifier)
    }
}
