//! Chunked simulation driver — the orchestrator for one chooser category.
//!
//! Purpose
//! -------
//! Apply the discrete-choice engine to an arbitrarily large chooser
//! population while bounding peak memory: validate the inputs once,
//! partition the population into budgeted chunks, drive
//! interaction → utilities → probabilities → choices per chunk, hand the
//! designated household's intermediates to the trace sink, and reassemble
//! one choice series aligned to the input chooser index.
//!
//! Key behaviors
//! -------------
//! - Bind-time validation runs before any chunk, so a misconfigured spec
//!   fails fast with the offending expression.
//! - Chunks are processed strictly sequentially, in order; any chunk
//!   failure aborts the whole run (a batch computation, not best-effort).
//! - The chunk budget is purely a memory knob: per-chooser random
//!   sub-streams make the result identical for any budget and seed pair.
//! - Trace-sink failures are logged at WARN and swallowed; tracing can
//!   never fail the simulation.
//! - The final series index is verified to equal the input chooser index
//!   exactly; a mismatch is an internal invariant violation surfaced as
//!   [`ChoiceError::ShapeMismatch`].
//!
//! Conventions
//! -----------
//! - `label` identifies the category being scheduled (e.g.
//!   `"mandatory.school"`); it appears in every error payload, every log
//!   line, and every trace artifact name.
//! - This is the only module in the scheduling stack that logs; the
//!   numeric core stays silent.
//!
//! Testing notes
//! -------------
//! - Unit tests cover chunk-size invariance, index alignment, empty
//!   populations, bind-time abort, trace slicing to the designated
//!   household, and WARN-and-continue on sink failure.
use tracing::{debug, warn};

use crate::scheduling::core::options::SimOptions;
use crate::scheduling::core::partition::partition;
use crate::scheduling::core::probabilities::utils_to_probs;
use crate::scheduling::core::sampling::{make_choices, RandomChannel};
use crate::scheduling::core::series::ChoiceSeries;
use crate::scheduling::core::spec::{ChoiceSpec, Constants};
use crate::scheduling::core::table::{Alternatives, Choosers};
use crate::scheduling::core::validation::validate_inputs;
use crate::scheduling::engine::interaction::InteractionChunk;
use crate::scheduling::errors::{ChoiceError, ChoiceResult};
use crate::trace::TraceSink;

/// Simulate one choice per chooser for a single category.
///
/// Parameters
/// ----------
/// - `choosers`: the category's tour table (may be empty).
/// - `alternatives`: the shared alternatives table.
/// - `spec` / `constants`: the category's utility specification.
/// - `options`: seed, chunk budget, and optional trace household.
/// - `sink`: receiver for the traced household's intermediates; pass
///   [`crate::trace::NullTraceSink`] when not tracing.
/// - `label`: category label for errors, logs, and trace artifacts.
///
/// Returns
/// -------
/// `ChoiceResult<ChoiceSeries>`
///   One chosen alternative id (plus its probability) per chooser, in
///   exactly the input chooser order.
///
/// Errors
/// ------
/// - Bind-time: `ChoiceError::CoefficientArityMismatch` or
///   `ChoiceError::Eval` from [`validate_inputs`].
/// - Per chunk: `ChoiceError::Eval`, `ChoiceError::NonFiniteUtility`,
///   `ChoiceError::DegenerateChoiceSet`, or `ChoiceError::ShapeMismatch`;
///   any of these aborts the whole run.
pub fn simulate_choices(
    choosers: &Choosers, alternatives: &Alternatives, spec: &ChoiceSpec,
    constants: &Constants, options: &SimOptions, sink: &mut dyn TraceSink, label: &str,
) -> ChoiceResult<ChoiceSeries> {
    validate_inputs(choosers, alternatives, spec, constants, label)?;

    if choosers.is_empty() {
        debug!("[{label}] no choosers; returning empty series");
        return Ok(ChoiceSeries::empty());
    }

    let ranges = partition(choosers.len(), alternatives.len(), options.chunk_budget);
    debug!(
        "[{label}] scheduling {} choosers in {} chunk(s) (budget {})",
        choosers.len(),
        ranges.len(),
        options.chunk_budget
    );

    let channel = RandomChannel::new(options.seed);
    let mut ids = Vec::with_capacity(choosers.len());
    let mut chosen_alts = Vec::with_capacity(choosers.len());
    let mut chosen_probs = Vec::with_capacity(choosers.len());

    for range in ranges {
        let chunk = InteractionChunk::new(choosers, alternatives, range.clone())?;
        debug!(
            "[{label}] chunk [{}, {}): {} interaction rows",
            range.start,
            range.end,
            chunk.n_rows()
        );

        let utilities = chunk.utilities(spec, constants, label)?;
        let probabilities = utils_to_probs(&utilities, chunk.chooser_ids(), label)?;
        let (positions, probabilities_of_chosen) =
            make_choices(&probabilities, chunk.chooser_ids(), &channel, label)?;

        if positions.len() != chunk.n_choosers() {
            return Err(ChoiceError::ShapeMismatch {
                context: "chunk choice count",
                expected: chunk.n_choosers(),
                actual: positions.len(),
            });
        }

        if let Some(household) = options.trace_household {
            let locals = chunk.choosers_of_household(household);
            if !locals.is_empty() {
                trace_chunk(
                    sink,
                    label,
                    &chunk,
                    spec,
                    constants,
                    &locals,
                    &utilities,
                    &probabilities,
                    &positions,
                    &probabilities_of_chosen,
                );
            }
        }

        ids.extend_from_slice(chunk.chooser_ids());
        chosen_alts.extend(positions.iter().map(|&p| alternatives.id_at(p)));
        chosen_probs.extend(probabilities_of_chosen);
    }

    let series = ChoiceSeries::new(ids, chosen_alts, chosen_probs)?;
    if series.ids() != choosers.ids() {
        return Err(ChoiceError::ShapeMismatch {
            context: "result index alignment",
            expected: choosers.len(),
            actual: series.len(),
        });
    }
    Ok(series)
}

/// Hand one traced chunk's intermediates to the sink, WARN-and-continue
/// on every failure.
#[allow(clippy::too_many_arguments)]
fn trace_chunk(
    sink: &mut dyn TraceSink, label: &str, chunk: &InteractionChunk<'_>, spec: &ChoiceSpec,
    constants: &Constants, locals: &[usize], utilities: &ndarray::Array2<f64>,
    probabilities: &ndarray::Array2<f64>, positions: &[usize], chosen_probs: &[f64],
) {
    let traced_tours: Vec<u64> = locals.iter().map(|&l| chunk.chooser_ids()[l]).collect();
    let alt_ids: Vec<u64> =
        (0..chunk.n_alternatives()).map(|position| chunk.alternative_id_at(position)).collect();

    match chunk.design_for_choosers(spec, constants, label, locals) {
        Ok((tour_ids, interaction_alt_ids, values)) => {
            let expressions: Vec<String> =
                spec.rows().iter().map(|row| row.expression().to_string()).collect();
            if let Err(e) = sink.write_interaction(
                label,
                &expressions,
                &tour_ids,
                &interaction_alt_ids,
                values.view(),
            ) {
                warn!("[{label}] trace sink failure (ignored): {e}");
            }
        }
        // Utilities for this chunk already evaluated, so this path only
        // triggers for callers that mutate state between calls.
        Err(e) => warn!("[{label}] trace design evaluation failed (ignored): {e}"),
    }

    let utility_rows = select_rows(utilities, locals);
    if let Err(e) = sink.write_utilities(label, &traced_tours, &alt_ids, utility_rows.view()) {
        warn!("[{label}] trace sink failure (ignored): {e}");
    }

    let probability_rows = select_rows(probabilities, locals);
    if let Err(e) =
        sink.write_probabilities(label, &traced_tours, &alt_ids, probability_rows.view())
    {
        warn!("[{label}] trace sink failure (ignored): {e}");
    }

    let traced_choices: Vec<u64> =
        locals.iter().map(|&l| chunk.alternative_id_at(positions[l])).collect();
    let traced_probs: Vec<f64> = locals.iter().map(|&l| chosen_probs[l]).collect();
    if let Err(e) = sink.write_choices(label, &traced_tours, &traced_choices, &traced_probs) {
        warn!("[{label}] trace sink failure (ignored): {e}");
    }
}

/// Copy the selected rows of a matrix into a dense sub-matrix.
fn select_rows(matrix: &ndarray::Array2<f64>, rows: &[usize]) -> ndarray::Array2<f64> {
    matrix.select(ndarray::Axis(0), rows)
}
