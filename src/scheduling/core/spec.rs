//! Coefficient specs and constants for linear-in-parameters utilities.
//!
//! Purpose
//! -------
//! Hold the calibrated model inputs the engine consumes: a [`ChoiceSpec`]
//! of expression rows with per-alternative (or shared) coefficients, and a
//! [`Constants`] mapping of named scalar parameters referenced by
//! expressions. Loading these from files is an external collaborator's
//! job; this module validates and stores the result.
//!
//! Key behaviors
//! -------------
//! - Parse every expression once at construction; a malformed expression
//!   rejects the whole spec before any chunk is processed.
//! - Represent coefficients either as one value per alternative
//!   ([`Coefficients::PerAlternative`]) or a single value broadcast across
//!   all alternatives ([`Coefficients::Shared`], the single-column spec
//!   convention).
//! - Reject non-finite coefficients at construction.
//!
//! Invariants & assumptions
//! ------------------------
//! - A spec has at least one row.
//! - Per-alternative coefficient arity against a concrete alternatives
//!   table is checked by `scheduling::core::validation`, not here; a spec
//!   is not bound to a table at construction time.
//! - Utility of (chooser c, alternative a) is
//!   `Σ_k coefficient_k(a) × expression_k(c, a)`.
//!
//! Downstream usage
//! ----------------
//! - Build with [`ChoiceSpec::new`] from `(expression, coefficients)`
//!   pairs; pass to the engine drivers together with [`Constants`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction, parse rejection, non-finite
//!   coefficient rejection, and constant lookup.
use std::collections::BTreeMap;

use ndarray::Array1;

use crate::scheduling::core::expr::Expr;
use crate::scheduling::errors::{ChoiceError, ChoiceResult};

/// Coefficients of one spec row.
#[derive(Debug, Clone, PartialEq)]
pub enum Coefficients {
    /// One coefficient applied to every alternative (single-column spec).
    Shared(f64),
    /// One coefficient per alternative, in alternative-positional order.
    PerAlternative(Array1<f64>),
}

impl Coefficients {
    /// The coefficient for matrix column `alt_position`.
    ///
    /// For `PerAlternative`, the caller must have validated arity against
    /// the alternatives table (`validation::validate_inputs`); positions
    /// are trusted here.
    #[inline]
    pub fn at(&self, alt_position: usize) -> f64 {
        match self {
            Coefficients::Shared(value) => *value,
            Coefficients::PerAlternative(values) => values[alt_position],
        }
    }
}

/// One row of a [`ChoiceSpec`]: a parsed expression and its coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRow {
    expression: String,
    parsed: Expr,
    coefficients: Coefficients,
}

impl SpecRow {
    /// The original expression text (also the row's display name).
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The parsed expression tree.
    pub fn parsed(&self) -> &Expr {
        &self.parsed
    }

    /// The row's coefficients.
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }
}

/// ChoiceSpec — validated utility specification.
///
/// Purpose
/// -------
/// Map expression rows to coefficients, defining the linear-in-parameters
/// utility function of one chooser category. Expressions are parsed at
/// construction; evaluation happens per interaction row in the engine.
///
/// Invariants
/// ----------
/// - At least one row; every expression parses; every coefficient is
///   finite.
/// - Row order is preserved: it is the column order of the design matrix
///   handed to the trace sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceSpec {
    rows: Vec<SpecRow>,
}

impl ChoiceSpec {
    /// Construct a validated spec from `(expression, coefficients)` pairs.
    ///
    /// Parameters
    /// ----------
    /// - `rows`: expression text plus coefficients, in spec-file order.
    ///
    /// Returns
    /// -------
    /// `ChoiceResult<ChoiceSpec>`
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::EmptySpec` if `rows` is empty.
    /// - `ChoiceError::Eval` (label `"spec"`, chunk `(0, 0)`) wrapping the
    ///   parse failure if an expression is malformed.
    /// - `ChoiceError::NonFiniteCoefficient` if a coefficient is NaN/±inf.
    pub fn new(rows: Vec<(String, Coefficients)>) -> ChoiceResult<Self> {
        if rows.is_empty() {
            return Err(ChoiceError::EmptySpec);
        }

        let mut parsed_rows = Vec::with_capacity(rows.len());
        for (expression, coefficients) in rows {
            let parsed = Expr::parse(&expression)
                .map_err(|source| ChoiceError::eval("spec", (0, 0), source))?;

            match &coefficients {
                Coefficients::Shared(value) => {
                    if !value.is_finite() {
                        return Err(ChoiceError::NonFiniteCoefficient {
                            expression,
                            position: 0,
                            value: *value,
                        });
                    }
                }
                Coefficients::PerAlternative(values) => {
                    for (position, &value) in values.iter().enumerate() {
                        if !value.is_finite() {
                            return Err(ChoiceError::NonFiniteCoefficient {
                                expression,
                                position,
                                value,
                            });
                        }
                    }
                }
            }

            parsed_rows.push(SpecRow { expression, parsed, coefficients });
        }

        Ok(ChoiceSpec { rows: parsed_rows })
    }

    /// Number of expression rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the spec has no rows (never true for a constructed value).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows in spec-file order.
    pub fn rows(&self) -> &[SpecRow] {
        &self.rows
    }
}

/// Constants — named scalar parameters referenced by expressions.
///
/// Resolved *after* alternative and chooser attributes, so a constant can
/// never shadow a table column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants(BTreeMap<String, f64>);

impl Constants {
    /// An empty mapping.
    pub fn empty() -> Constants {
        Constants(BTreeMap::new())
    }

    /// Build from `(name, value)` pairs; later pairs win on repeats.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Constants {
        Constants(pairs.iter().map(|(name, value)| (name.to_string(), *value)).collect())
    }

    /// Look up a constant by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Whether a constant exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}
