//! Category dispatch — schedule disjoint tour purposes and merge results.
//!
//! Purpose
//! -------
//! Run each chooser category (tour purpose) through the chunked driver
//! with its own spec, merge the per-category series into one, summarize
//! the merge, and write the chosen time windows back into a shared column
//! of the tour table. Mirrors the model-step layer of the original
//! system: mandatory scheduling runs "school" then "work" with separate
//! specs and one shared destination column; non-mandatory scheduling runs
//! a single category.
//!
//! Key behaviors
//! -------------
//! - Purposes partition the tour table by tag, so the merged series can
//!   never contain a chooser twice; a duplicate is surfaced as
//!   [`ChoiceError::DuplicateChooser`] (an upstream invariant violation),
//!   never silently dropped.
//! - Trace labels are qualified per purpose (`"<label>.<purpose>"`), so a
//!   traced household's artifacts stay separated by category.
//! - [`assign_choices`] updates exactly the rows the series covers; other
//!   rows keep their previous value, or NaN if the column is new (the
//!   "not scheduled" marker).
//!
//! Conventions
//! -----------
//! - Per-category population counts are logged at INFO before each run,
//!   and a summary of the merged choices after, matching the original's
//!   run log.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the 5 school + 7 work merge fixture, per-purpose
//!   spec application, write-back semantics (updated vs untouched rows),
//!   and the unknown-chooser error.
use std::collections::HashMap;

use ndarray::Array1;
use tracing::info;

use crate::scheduling::core::options::SimOptions;
use crate::scheduling::core::series::ChoiceSeries;
use crate::scheduling::core::spec::{ChoiceSpec, Constants};
use crate::scheduling::core::table::{Alternatives, Choosers};
use crate::scheduling::errors::{ChoiceError, ChoiceResult};
use crate::scheduling::engine::driver::simulate_choices;
use crate::trace::TraceSink;

/// Destination column the convenience drivers write chosen windows into.
pub const TOUR_WINDOW_COLUMN: &str = "tour_window";

/// Schedule several disjoint purposes and merge their choice series.
///
/// Parameters
/// ----------
/// - `tours`: the full tour table; each purpose schedules the sub-table
///   whose tag matches.
/// - `purpose_specs`: `(purpose, spec)` pairs, run in order.
/// - `alternatives` / `constants` / `options` / `sink`: shared across
///   purposes; see [`simulate_choices`].
/// - `label`: run label; per-purpose labels are `"<label>.<purpose>"`.
///
/// Returns
/// -------
/// `ChoiceResult<ChoiceSeries>`
///   The concatenated series, purposes in argument order, choosers in
///   table order within each purpose.
///
/// Errors
/// ------
/// - Anything [`simulate_choices`] raises for a purpose.
/// - `ChoiceError::DuplicateChooser` if the purpose tags failed to
///   partition the table (should be impossible for a validated table).
pub fn schedule_tours(
    tours: &Choosers, purpose_specs: &[(&str, &ChoiceSpec)], alternatives: &Alternatives,
    constants: &Constants, options: &SimOptions, sink: &mut dyn TraceSink, label: &str,
) -> ChoiceResult<ChoiceSeries> {
    let mut parts = Vec::with_capacity(purpose_specs.len());

    for (purpose, spec) in purpose_specs {
        let subset = tours.filter_by_purpose(purpose);
        let purpose_label = format!("{label}.{purpose}");
        info!("[{purpose_label}] running tour scheduling for {} tours", subset.len());

        let series = simulate_choices(
            &subset,
            alternatives,
            spec,
            constants,
            options,
            sink,
            &purpose_label,
        )?;
        parts.push(series);
    }

    let merged = ChoiceSeries::concat(parts)?;
    let summary = merged.summary();
    match (summary.min, summary.max, summary.mean) {
        (Some(min), Some(max), Some(mean)) => info!(
            "[{label}] scheduled {} tours (choice min {min}, max {max}, mean {mean:.3})",
            summary.count
        ),
        _ => info!("[{label}] scheduled 0 tours"),
    }
    Ok(merged)
}

/// Write a choice series into a named column of the tour table.
///
/// Rows the series covers get their chosen alternative id (as `f64`);
/// rows it does not cover keep their previous value, or NaN if the column
/// did not exist yet.
///
/// Errors
/// ------
/// - `ChoiceError::UnknownChooser` if the series references a tour the
///   table does not contain; the table is left unchanged.
pub fn assign_choices(
    tours: &mut Choosers, column: &str, choices: &ChoiceSeries,
) -> ChoiceResult<()> {
    let positions: HashMap<u64, usize> =
        tours.ids().iter().enumerate().map(|(row, &id)| (id, row)).collect();

    let mut values = match tours.column(column) {
        Some(existing) => existing.clone(),
        None => Array1::from_elem(tours.len(), f64::NAN),
    };

    for (&id, &choice) in choices.ids().iter().zip(choices.choices()) {
        let &row = positions
            .get(&id)
            .ok_or(ChoiceError::UnknownChooser { chooser_id: id })?;
        values[row] = choice as f64;
    }

    tours.set_column(column, values)
}

/// Schedule mandatory tours: "school" and "work" purposes with separate
/// specs, merged and written back into [`TOUR_WINDOW_COLUMN`].
///
/// Returns the merged series (also the value written back), so callers
/// can inspect per-tour probabilities.
pub fn schedule_mandatory_tours(
    tours: &mut Choosers, alternatives: &Alternatives, school_spec: &ChoiceSpec,
    work_spec: &ChoiceSpec, constants: &Constants, options: &SimOptions,
    sink: &mut dyn TraceSink,
) -> ChoiceResult<ChoiceSeries> {
    let merged = schedule_tours(
        tours,
        &[("school", school_spec), ("work", work_spec)],
        alternatives,
        constants,
        options,
        sink,
        "mandatory_tour_scheduling",
    )?;
    assign_choices(tours, TOUR_WINDOW_COLUMN, &merged)?;
    Ok(merged)
}

/// Schedule non-mandatory tours: the single "non_mandatory" purpose with
/// one spec, written back into [`TOUR_WINDOW_COLUMN`].
pub fn schedule_non_mandatory_tours(
    tours: &mut Choosers, alternatives: &Alternatives, spec: &ChoiceSpec,
    constants: &Constants, options: &SimOptions, sink: &mut dyn TraceSink,
) -> ChoiceResult<ChoiceSeries> {
    let merged = schedule_tours(
        tours,
        &[("non_mandatory", spec)],
        alternatives,
        constants,
        options,
        sink,
        "non_mandatory_tour_scheduling",
    )?;
    assign_choices(tours, TOUR_WINDOW_COLUMN, &merged)?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use ndarray::Array1;

    use super::*;
    use crate::scheduling::core::spec::Coefficients;
    use crate::trace::NullTraceSink;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The 5 school + 7 work merge fixture (12 rows, no collisions).
    // - Per-purpose specs producing per-purpose outcomes.
    // - Write-back semantics: covered rows updated, others untouched/NaN.
    // - The unknown-chooser error on write-back.
    //
    // They intentionally DO NOT cover:
    // - Chunking and tracing behavior (driver tests) or statistical
    //   properties (integration suite).
    // -------------------------------------------------------------------------

    /// 5 school tours (ids 1..=5) and 7 work tours (ids 11..=17).
    fn mixed_tours() -> Choosers {
        let school = 5;
        let work = 7;
        let mut ids: Vec<u64> = (1..=school as u64).collect();
        ids.extend(11..=(10 + work as u64));
        let mut purposes = vec!["school".to_string(); school];
        purposes.extend(vec!["work".to_string(); work]);
        let count = school + work;

        let mut columns = BTreeMap::new();
        columns.insert(
            "income".to_string(),
            Array1::from_vec((0..count).map(|i| 5.0 + i as f64).collect()),
        );
        Choosers::new(
            ids.clone(),
            ids.iter().map(|id| 1000 + id).collect(),
            ids.iter().map(|id| 50 + id % 4).collect(),
            purposes,
            columns,
        )
        .unwrap()
    }

    fn window_alternatives() -> Alternatives {
        Alternatives::new(vec![0, 1], vec![6, 9], vec![12, 17], BTreeMap::new()).unwrap()
    }

    /// A spec that makes the given alternative position a near-certain
    /// winner for every chooser.
    fn certain_spec(position: usize) -> ChoiceSpec {
        let mut coefficients = vec![0.0; 2];
        coefficients[position] = 50.0;
        ChoiceSpec::new(vec![(
            "1".to_string(),
            Coefficients::PerAlternative(Array1::from_vec(coefficients)),
        )])
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The category-merge fixture: 5 school + 7 work tours scheduled
    // independently concatenate to exactly 12 rows with no id
    // collisions, and each purpose's spec drives its own outcomes.
    //
    // Given
    // -----
    // - School spec certain on alternative 0; work spec certain on
    //   alternative 1.
    //
    // Expect
    // ------
    // - 12 rows, unique ids; school tours chose 0, work tours chose 1.
    fn schedule_tours_merges_disjoint_purposes() {
        let tours = mixed_tours();
        let school_spec = certain_spec(0);
        let work_spec = certain_spec(1);
        let mut sink = NullTraceSink;

        let merged = schedule_tours(
            &tours,
            &[("school", &school_spec), ("work", &work_spec)],
            &window_alternatives(),
            &Constants::empty(),
            &SimOptions::new(5, 0, None),
            &mut sink,
            "mandatory_tour_scheduling",
        )
        .unwrap();

        assert_eq!(merged.len(), 12);
        let unique: BTreeSet<u64> = merged.ids().iter().copied().collect();
        assert_eq!(unique.len(), 12);
        for (&id, &choice) in merged.ids().iter().zip(merged.choices()) {
            if id <= 5 {
                assert_eq!(choice, 0, "school tour {id}");
            } else {
                assert_eq!(choice, 1, "work tour {id}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Write-back updates exactly the covered rows; uncovered rows of a
    // new column are NaN; a series referencing an unknown tour fails
    // without touching the table.
    //
    // Given
    // -----
    // - The mixed table; a series covering only tours 1 and 12; then a
    //   series referencing tour 999.
    //
    // Expect
    // ------
    // - Column has values at rows of tours 1 and 12, NaN elsewhere;
    //   `UnknownChooser { 999 }` on the bad series.
    fn assign_choices_updates_covered_rows_only() {
        let mut tours = mixed_tours();
        let partial =
            ChoiceSeries::new(vec![1, 12], vec![1, 0], vec![0.9, 0.8]).unwrap();

        assign_choices(&mut tours, TOUR_WINDOW_COLUMN, &partial).unwrap();

        let column = tours.column(TOUR_WINDOW_COLUMN).unwrap().clone();
        assert_eq!(column[0], 1.0, "tour 1 updated");
        assert_eq!(column[6], 0.0, "tour 12 updated");
        assert!(column[1].is_nan(), "tour 2 untouched");

        let bad = ChoiceSeries::new(vec![999], vec![0], vec![1.0]).unwrap();
        let result = assign_choices(&mut tours, TOUR_WINDOW_COLUMN, &bad);
        assert_eq!(result.unwrap_err(), ChoiceError::UnknownChooser { chooser_id: 999 });
        // The earlier write-back is still intact.
        assert_eq!(tours.column(TOUR_WINDOW_COLUMN).unwrap()[0], 1.0);
    }

    #[test]
    // Purpose
    // -------
    // The mandatory convenience driver schedules both purposes and
    // writes the merged choices into the shared window column.
    //
    // Given
    // -----
    // - The mixed table with certain specs per purpose.
    //
    // Expect
    // ------
    // - Every row of `tour_window` is non-NaN and matches the merged
    //   series.
    fn schedule_mandatory_tours_writes_back_window_column() {
        let mut tours = mixed_tours();
        let school_spec = certain_spec(0);
        let work_spec = certain_spec(1);
        let mut sink = NullTraceSink;

        let merged = schedule_mandatory_tours(
            &mut tours,
            &window_alternatives(),
            &school_spec,
            &work_spec,
            &Constants::empty(),
            &SimOptions::new(5, 4, None),
            &mut sink,
        )
        .unwrap();

        let column = tours.column(TOUR_WINDOW_COLUMN).unwrap();
        assert_eq!(merged.len(), tours.len());
        for (row, &id) in tours.ids().iter().enumerate() {
            let (choice, _) = merged.get(id).expect("merged series covers every tour");
            assert_eq!(column[row], choice as f64, "tour {id}");
        }
    }
}
