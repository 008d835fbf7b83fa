//! Reproducible choice sampling (`make_choices`).
//!
//! Purpose
//! -------
//! Draw one alternative per chooser row from its probability distribution
//! by inverse-CDF sampling, with randomness that is reproducible for a
//! fixed seed and — by construction — independent of row ordering and
//! chunk boundaries.
//!
//! Key behaviors
//! -------------
//! - Each chooser draws a single uniform from its own sub-stream, derived
//!   from the run's base seed and the chooser's id through a fixed 64-bit
//!   mix feeding a ChaCha8 stream cipher RNG ([`RandomChannel`]).
//! - A row's cumulative probabilities are scanned in fixed column order;
//!   the first column whose cumulative value exceeds the draw wins.
//! - The final cumulative value is treated as exactly 1.0, so rounding
//!   that leaves the true sum just below 1.0 can never make the last
//!   alternative unselectable.
//!
//! Invariants & assumptions
//! ------------------------
//! - Chosen positions lie in `[0, alternative_count)`.
//! - Identical probability matrix + identical seed ⇒ identical choices,
//!   regardless of how rows are ordered or how the population was
//!   chunked — each chooser's draw depends only on `(seed, chooser id)`.
//! - Rows are expected to be (approximately) row-stochastic; entries
//!   outside `[0, 1]` (tolerance 1e-9) are rejected.
//!
//! Conventions
//! -----------
//! - Draws lie in `[0, 1)`, so a column with probability exactly 1.0 is
//!   always selected and a zero-probability prefix is never selected.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the certain-row fixture, range and determinism
//!   properties, row-order independence, the last-column clamp, and
//!   probability validation. The empirical frequency-convergence property
//!   lives in the integration suite.
use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::scheduling::errors::{ChoiceError, ChoiceResult};

/// Tolerance above 1.0 accepted for probabilities (rounding slack).
const PROBABILITY_SLACK: f64 = 1e-9;

/// RandomChannel — per-chooser uniform draws derived from one base seed.
///
/// Purpose
/// -------
/// Provide the run's random stream in a form that satisfies both
/// requirements at once: seedable reproducibility, and independence of
/// each chooser's outcome from row ordering and chunk boundaries. A
/// single shared stream cannot deliver the second property, so each
/// chooser id is mixed with the base seed into its own ChaCha8 sub-stream
/// and contributes exactly one uniform draw per run.
///
/// Notes
/// -----
/// - Copyable value; sharing one channel across chunks (or threads) is
///   safe because draws depend only on `(base_seed, chooser_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomChannel {
    base_seed: u64,
}

impl RandomChannel {
    /// Create a channel from the run's base seed.
    pub fn new(base_seed: u64) -> RandomChannel {
        RandomChannel { base_seed }
    }

    /// The uniform draw in `[0, 1)` for `chooser_id`.
    ///
    /// Deterministic in `(base_seed, chooser_id)`; consecutive ids yield
    /// decorrelated draws via the mix below.
    pub fn uniform_for(&self, chooser_id: u64) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(mix_seed(self.base_seed, chooser_id));
        rng.gen::<f64>()
    }
}

/// splitmix64-style finalizer over seed and chooser id.
///
/// Sequential ids land in well-separated ChaCha8 key space; the constants
/// are the standard splitmix64 multipliers.
#[inline]
fn mix_seed(seed: u64, chooser_id: u64) -> u64 {
    let mut z = seed ^ chooser_id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw one alternative per chooser row by inverse-CDF sampling.
///
/// Parameters
/// ----------
/// - `probabilities`: row-stochastic matrix, choosers × alternatives.
/// - `chooser_ids`: one id per row; selects each row's random sub-stream
///   and appears in error payloads.
/// - `channel`: the run's [`RandomChannel`].
/// - `label`: trace label of the category being scheduled, used in error
///   payloads.
///
/// Returns
/// -------
/// `ChoiceResult<(Vec<usize>, Vec<f64>)>`
///   Chosen column positions, and the probability each chosen column had
///   in its row (the original value, not the clamped cumulative).
///
/// Errors
/// ------
/// - `ChoiceError::ShapeMismatch` if `chooser_ids` disagrees with the row
///   count or the matrix has zero columns.
/// - `ChoiceError::InvalidProbability` if an entry is NaN or outside
///   `[0, 1]` beyond rounding slack.
pub fn make_choices(
    probabilities: &Array2<f64>, chooser_ids: &[u64], channel: &RandomChannel, label: &str,
) -> ChoiceResult<(Vec<usize>, Vec<f64>)> {
    if probabilities.nrows() != chooser_ids.len() {
        return Err(ChoiceError::ShapeMismatch {
            context: "make_choices chooser ids",
            expected: probabilities.nrows(),
            actual: chooser_ids.len(),
        });
    }
    if probabilities.ncols() == 0 {
        return Err(ChoiceError::ShapeMismatch {
            context: "make_choices alternative columns",
            expected: 1,
            actual: 0,
        });
    }

    let mut positions = Vec::with_capacity(probabilities.nrows());
    let mut chosen_probabilities = Vec::with_capacity(probabilities.nrows());

    for (row, probability_row) in probabilities.rows().into_iter().enumerate() {
        for (column, &value) in probability_row.iter().enumerate() {
            if !(value >= 0.0 && value <= 1.0 + PROBABILITY_SLACK) {
                return Err(ChoiceError::InvalidProbability {
                    label: label.to_string(),
                    row,
                    column,
                    value,
                });
            }
        }

        let draw = channel.uniform_for(chooser_ids[row]);
        let position = sample_row(probability_row, draw);
        positions.push(position);
        chosen_probabilities.push(probability_row[position]);
    }

    Ok((positions, chosen_probabilities))
}

/// Inverse-CDF selection of one column given a uniform draw.
///
/// Scans cumulative probabilities in column order; the last column's
/// cumulative value is treated as exactly 1.0, so it absorbs any rounding
/// shortfall. The row must be non-empty.
#[inline]
fn sample_row(probability_row: ArrayView1<f64>, draw: f64) -> usize {
    let last = probability_row.len() - 1;
    let mut cumulative = 0.0;
    for (position, &probability) in probability_row.iter().enumerate() {
        cumulative += probability;
        if position == last || draw < cumulative {
            return position;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};

    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The certain-row fixture (rows with a single positive probability).
    // - Range, determinism, and row-order independence of sampled choices.
    // - The last-column clamp under cumulative rounding shortfall.
    // - Probability validation and shape mismatches.
    //
    // They intentionally DO NOT cover:
    // - Statistical convergence of empirical frequencies to the input
    //   probabilities; that lives in the integration suite where enough
    //   choosers are simulated to make the χ² bound meaningful.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Certain rows always pick their sole positive-probability column,
    // regardless of the seed.
    //
    // Given
    // -----
    // - Probability matrix [[1,0,0],[0,1,0]] over choosers {x=1, y=2},
    //   sampled under several seeds.
    //
    // Expect
    // ------
    // - Choices are always [0, 1] with chosen probabilities [1.0, 1.0].
    fn make_choices_certain_rows_pick_the_certain_column() {
        let probabilities = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

        for seed in [0, 1, 42, u64::MAX] {
            let channel = RandomChannel::new(seed);
            let (positions, chosen) =
                make_choices(&probabilities, &[1, 2], &channel, "test").unwrap();

            assert_eq!(positions, vec![0, 1], "seed {seed}");
            assert_eq!(chosen, vec![1.0, 1.0], "seed {seed}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Choices stay in range and are reproducible for a fixed seed.
    //
    // Given
    // -----
    // - A 100-chooser matrix with probabilities [0.2, 0.3, 0.5], sampled
    //   twice with the same seed and once with another seed.
    //
    // Expect
    // ------
    // - All positions in [0, 3); the two same-seed runs identical; the
    //   other seed differs somewhere (overwhelmingly likely).
    fn make_choices_is_deterministic_and_in_range() {
        let rows = 100;
        let mut probabilities = Array2::<f64>::zeros((rows, 3));
        for mut row in probabilities.rows_mut() {
            row[0] = 0.2;
            row[1] = 0.3;
            row[2] = 0.5;
        }
        let ids: Vec<u64> = (0..rows as u64).collect();

        let channel = RandomChannel::new(7);
        let (first, _) = make_choices(&probabilities, &ids, &channel, "test").unwrap();
        let (second, _) = make_choices(&probabilities, &ids, &channel, "test").unwrap();
        let (other, _) =
            make_choices(&probabilities, &ids, &RandomChannel::new(8), "test").unwrap();

        assert!(first.iter().all(|&p| p < 3));
        assert_eq!(first, second);
        assert_ne!(first, other, "different seeds should differ for 100 draws");
    }

    #[test]
    // Purpose
    // -------
    // A chooser's outcome depends only on (seed, chooser id): permuting
    // rows permutes the outcomes identically.
    //
    // Given
    // -----
    // - Three choosers with distinct rows, sampled in order [a, b, c] and
    //   again in order [c, a, b] with rows permuted to match.
    //
    // Expect
    // ------
    // - Each chooser's chosen alternative is the same in both runs.
    fn make_choices_outcomes_are_row_order_independent() {
        let channel = RandomChannel::new(99);
        let forward = array![[0.5, 0.5], [0.3, 0.7], [0.9, 0.1]];
        let permuted = array![[0.9, 0.1], [0.5, 0.5], [0.3, 0.7]];

        let (f_positions, _) =
            make_choices(&forward, &[10, 11, 12], &channel, "test").unwrap();
        let (p_positions, _) =
            make_choices(&permuted, &[12, 10, 11], &channel, "test").unwrap();

        // forward: 10 -> f[0], 11 -> f[1], 12 -> f[2]
        // permuted: 12 -> p[0], 10 -> p[1], 11 -> p[2]
        assert_eq!(f_positions[0], p_positions[1], "chooser 10");
        assert_eq!(f_positions[1], p_positions[2], "chooser 11");
        assert_eq!(f_positions[2], p_positions[0], "chooser 12");
    }

    #[test]
    // Purpose
    // -------
    // The last column absorbs cumulative rounding shortfall: a draw above
    // the under-1.0 cumulative sum still selects the last column.
    //
    // Given
    // -----
    // - A three-column row summing to 1 − 1e-12 and a draw of
    //   1 − 1e-13 (greater than the row's true cumulative sum).
    //
    // Expect
    // ------
    // - `sample_row` returns the last position, never panics or
    //   overruns.
    fn sample_row_clamps_final_cumulative_to_one() {
        let shortfall = 1e-12;
        let row = array![0.3, 0.3, 0.4 - shortfall];

        let position = sample_row(row.view(), 1.0 - 1e-13);

        assert_eq!(position, 2);
    }

    #[test]
    // Purpose
    // -------
    // Out-of-range probabilities are rejected with their location.
    //
    // Given
    // -----
    // - A matrix with a negative entry at (0, 1); another with NaN.
    //
    // Expect
    // ------
    // - `ChoiceError::InvalidProbability { row: 0, column: 1, .. }` for
    //   both.
    fn make_choices_rejects_invalid_probabilities() {
        let channel = RandomChannel::new(0);

        for bad in [-0.1, f64::NAN] {
            let probabilities = array![[0.5, bad]];
            let result = make_choices(&probabilities, &[1], &channel, "test");
            match result {
                Err(ChoiceError::InvalidProbability { row: 0, column: 1, .. }) => {}
                other => panic!("expected InvalidProbability at (0, 1), got {other:?}"),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Per-chooser draws are reproducible and differ across ids.
    //
    // Given
    // -----
    // - One channel with seed 5 and chooser ids 0, 1.
    //
    // Expect
    // ------
    // - Draws lie in [0, 1); repeated calls agree; ids 0 and 1 differ.
    fn random_channel_draws_are_stable_per_chooser() {
        let channel = RandomChannel::new(5);

        let a = channel.uniform_for(0);
        let b = channel.uniform_for(1);

        assert!((0.0..1.0).contains(&a));
        assert!((0.0..1.0).contains(&b));
        assert_eq!(a, channel.uniform_for(0));
        assert_ne!(a, b);
    }
}
