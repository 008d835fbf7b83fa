//! Cross-input guards — bind a spec to concrete tables before running.
//!
//! Purpose
//! -------
//! Centralize the checks that span more than one input: coefficient arity
//! against the alternatives table, and existence of every expression
//! identifier in the bound schemas (alternative column, chooser column, or
//! constant). Running these once up front means a misconfigured spec fails
//! before any chunk is processed, with the offending expression named —
//! never as a NaN partway through the population.
//!
//! Conventions
//! -----------
//! - Identifier resolution order matches evaluation: alternative
//!   attributes shadow chooser attributes, which shadow constants. For the
//!   existence check only membership matters.
//! - Failures are reported as [`ChoiceError::Eval`] with chunk
//!   `(0, chooser_count)` (bind time covers the whole population) or
//!   [`ChoiceError::CoefficientArityMismatch`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover the accept path and each rejection, including the
//!   reference fixture's `bogus_column` spec.
use std::collections::BTreeSet;

use crate::scheduling::core::spec::{ChoiceSpec, Coefficients, Constants};
use crate::scheduling::core::table::{Alternatives, Choosers};
use crate::scheduling::errors::{ChoiceError, ChoiceResult, EvalError};

/// Validate a spec against the tables and constants it will run over.
///
/// Parameters
/// ----------
/// - `choosers` / `alternatives` / `spec` / `constants`: the run's inputs.
/// - `label`: trace label of the category being scheduled, used in error
///   payloads.
///
/// Returns
/// -------
/// `ChoiceResult<()>`
///   `Ok(())` guarantees every per-alternative coefficient row matches the
///   alternative count and every expression identifier resolves somewhere.
///
/// Errors
/// ------
/// - `ChoiceError::CoefficientArityMismatch` for a per-alternative row of
///   the wrong length.
/// - `ChoiceError::Eval` wrapping `EvalError::UndefinedIdentifier` for an
///   identifier no schema supplies.
pub fn validate_inputs(
    choosers: &Choosers, alternatives: &Alternatives, spec: &ChoiceSpec,
    constants: &Constants, label: &str,
) -> ChoiceResult<()> {
    let alt_count = alternatives.len();

    for row in spec.rows() {
        if let Coefficients::PerAlternative(values) = row.coefficients() {
            if values.len() != alt_count {
                return Err(ChoiceError::CoefficientArityMismatch {
                    expression: row.expression().to_string(),
                    expected: alt_count,
                    actual: values.len(),
                });
            }
        }

        let mut identifiers = BTreeSet::new();
        row.parsed().identifiers(&mut identifiers);
        for identifier in identifiers {
            let known = alternatives.has_column(&identifier)
                || choosers.has_column(&identifier)
                || constants.contains(&identifier);
            if !known {
                return Err(ChoiceError::eval(
                    label,
                    (0, choosers.len()),
                    EvalError::UndefinedIdentifier {
                        identifier,
                        expression: row.expression().to_string(),
                    },
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ndarray::Array1;

    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The accept path over alternative columns, chooser columns, and
    //   constants together.
    // - Rejection of per-alternative coefficient rows with wrong arity.
    // - Rejection of the reference fixture's `bogus_column` expression at
    //   bind time.
    // -------------------------------------------------------------------------

    fn school_choosers(count: usize) -> Choosers {
        let mut columns = BTreeMap::new();
        columns.insert(
            "income".to_string(),
            Array1::from_vec((0..count).map(|i| 10.0 + i as f64).collect()),
        );
        Choosers::new(
            (1..=count as u64).collect(),
            vec![100; count],
            vec![7; count],
            vec!["school".to_string(); count],
            columns,
        )
        .unwrap()
    }

    fn window_alternatives() -> Alternatives {
        Alternatives::new(vec![0, 1], vec![6, 9], vec![12, 17], BTreeMap::new()).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // A spec drawing on all three namespaces validates cleanly.
    //
    // Given
    // -----
    // - Expressions over `duration` (alternative), `income` (chooser),
    //   and `shadow_price` (constant).
    //
    // Expect
    // ------
    // - `validate_inputs` returns `Ok(())`.
    fn validate_inputs_accepts_resolvable_spec() {
        let spec = ChoiceSpec::new(vec![
            ("duration".to_string(), Coefficients::Shared(0.5)),
            (
                "income * shadow_price".to_string(),
                Coefficients::PerAlternative(Array1::from_vec(vec![1.0, -1.0])),
            ),
        ])
        .unwrap();
        let constants = Constants::from_pairs(&[("shadow_price", 2.0)]);

        let result = validate_inputs(
            &school_choosers(10),
            &window_alternatives(),
            &spec,
            &constants,
            "school",
        );

        assert!(result.is_ok(), "expected clean bind, got {result:?}");
    }

    #[test]
    // Purpose
    // -------
    // A per-alternative coefficient row of the wrong length is rejected
    // with the expression and both arities.
    //
    // Given
    // -----
    // - Two alternatives but three coefficients on one row.
    //
    // Expect
    // ------
    // - `CoefficientArityMismatch { expected: 2, actual: 3, .. }`.
    fn validate_inputs_rejects_coefficient_arity_mismatch() {
        let spec = ChoiceSpec::new(vec![(
            "duration".to_string(),
            Coefficients::PerAlternative(Array1::from_vec(vec![1.0, 2.0, 3.0])),
        )])
        .unwrap();

        let result = validate_inputs(
            &school_choosers(3),
            &window_alternatives(),
            &spec,
            &Constants::empty(),
            "school",
        );

        assert_eq!(
            result.unwrap_err(),
            ChoiceError::CoefficientArityMismatch {
                expression: "duration".to_string(),
                expected: 2,
                actual: 3,
            }
        );
    }

    #[test]
    // Purpose
    // -------
    // The reference fixture: a spec referencing `bogus_column` over 10
    // "school" choosers and the start=[6,9]/end=[12,17] alternatives is
    // rejected at bind time with an undefined-identifier evaluation
    // error covering the whole population.
    //
    // Given
    // -----
    // - A spec row `bogus_column * 2`.
    //
    // Expect
    // ------
    // - `ChoiceError::Eval` with chunk (0, 10) wrapping
    //   `UndefinedIdentifier { identifier: "bogus_column", .. }`.
    fn validate_inputs_rejects_bogus_column_at_bind_time() {
        let spec = ChoiceSpec::new(vec![(
            "bogus_column * 2".to_string(),
            Coefficients::Shared(1.0),
        )])
        .unwrap();

        let result = validate_inputs(
            &school_choosers(10),
            &window_alternatives(),
            &spec,
            &Constants::empty(),
            "school",
        );

        match result {
            Err(ChoiceError::Eval { label, chunk, source }) => {
                assert_eq!(label, "school");
                assert_eq!(chunk, (0, 10));
                assert_eq!(
                    source,
                    EvalError::UndefinedIdentifier {
                        identifier: "bogus_column".to_string(),
                        expression: "bogus_column * 2".to_string(),
                    }
                );
            }
            other => panic!("expected bind-time Eval error, got {other:?}"),
        }
    }
}
