//! Columnar input tables for the discrete-choice engine.
//!
//! Purpose
//! -------
//! Provide small, validated containers for the two tables the engine
//! consumes: the chooser (tour) table and the shared alternatives table.
//! Validation happens once at construction so downstream code can assume
//! unique identities, aligned column lengths, and finite attribute values.
//!
//! Key behaviors
//! -------------
//! - [`Choosers`] carries one row per tour: a unique tour id, person and
//!   household foreign keys, a purpose tag, and named `f64` attribute
//!   columns referenced by spec expressions.
//! - [`Alternatives`] carries one row per discrete option shared by every
//!   chooser of a category: a stable id plus `start` / `end` periods, with
//!   `duration = end − start` derived at construction and visible to
//!   expressions like any other column.
//! - Both types are consumed read-only by the engine; the only mutation
//!   entry point is [`Choosers::set_column`], used by the caller-side
//!   write-back of choice results.
//!
//! Invariants & assumptions
//! ------------------------
//! - Table identities are unique `u64` values. Alternative identities are
//!   additionally *positional*: the id at position `k` labels column `k`
//!   of the utility and probability matrices.
//! - Attribute columns have exactly one value per row and contain only
//!   finite values at construction time.
//! - `duration ≥ 0` for every alternative (a window cannot end before it
//!   starts).
//! - A [`Choosers`] table may be empty (a purpose with zero tours);
//!   an [`Alternatives`] table may not.
//!
//! Conventions
//! -----------
//! - Foreign keys (`person_id`, `household_id`) and the purpose tag are
//!   typed fields, not attribute columns; spec expressions cannot
//!   reference them.
//! - `start`, `end`, and `duration` are reserved alternative column names;
//!   extra alternative columns must not collide with them.
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction happy paths, each validation failure,
//!   the derived `duration` values, and purpose filtering.
use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array1;

use crate::scheduling::errors::{ChoiceError, ChoiceResult};

/// Reserved alternative column: window start period.
pub const START_COLUMN: &str = "start";
/// Reserved alternative column: window end period.
pub const END_COLUMN: &str = "end";
/// Reserved alternative column: derived `end − start`.
pub const DURATION_COLUMN: &str = "duration";

/// Choosers — validated tour table.
///
/// Purpose
/// -------
/// Represent the population of decision-making units (tours). Each row has
/// a unique tour id, the owning person and household, a purpose tag used
/// by category dispatch, and the named attributes that spec expressions
/// read.
///
/// Invariants
/// ----------
/// - Tour ids are unique.
/// - `person_ids`, `household_ids`, `purposes`, and every attribute column
///   have exactly `ids.len()` entries.
/// - Attribute values are finite at construction time. Columns written
///   later via [`Choosers::set_column`] may carry NaN for rows a result
///   series did not cover.
///
/// Notes
/// -----
/// - The engine never mutates a `Choosers` value; [`Choosers::set_column`]
///   exists for the caller-side write-back of merged choice results.
#[derive(Debug, Clone, PartialEq)]
pub struct Choosers {
    ids: Vec<u64>,
    person_ids: Vec<u64>,
    household_ids: Vec<u64>,
    purposes: Vec<String>,
    columns: BTreeMap<String, Array1<f64>>,
}

impl Choosers {
    /// Construct a validated chooser table.
    ///
    /// Parameters
    /// ----------
    /// - `ids`: unique tour ids, one per row.
    /// - `person_ids` / `household_ids`: owning person and household per
    ///   row.
    /// - `purposes`: category tag per row (e.g. `"school"`, `"work"`).
    /// - `columns`: named attribute columns referenced by spec
    ///   expressions; each must have one finite value per row.
    ///
    /// Returns
    /// -------
    /// `ChoiceResult<Choosers>`
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::DuplicateIndex` if a tour id repeats.
    /// - `ChoiceError::ColumnLengthMismatch` if any parallel vector or
    ///   column disagrees with `ids.len()`.
    /// - `ChoiceError::NonFiniteAttribute` if a column value is NaN/±inf;
    ///   the first offending row is reported.
    pub fn new(
        ids: Vec<u64>, person_ids: Vec<u64>, household_ids: Vec<u64>, purposes: Vec<String>,
        columns: BTreeMap<String, Array1<f64>>,
    ) -> ChoiceResult<Self> {
        const TABLE: &str = "choosers";
        let n = ids.len();

        check_unique(TABLE, &ids)?;
        check_len(TABLE, "person_id", n, person_ids.len())?;
        check_len(TABLE, "household_id", n, household_ids.len())?;
        check_len(TABLE, "purpose", n, purposes.len())?;
        for (name, column) in &columns {
            check_len(TABLE, name, n, column.len())?;
            check_finite(TABLE, name, column)?;
        }

        Ok(Choosers { ids, person_ids, household_ids, purposes, columns })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tour ids in row order.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Person foreign keys in row order.
    pub fn person_ids(&self) -> &[u64] {
        &self.person_ids
    }

    /// Household foreign keys in row order.
    pub fn household_ids(&self) -> &[u64] {
        &self.household_ids
    }

    /// Purpose tags in row order.
    pub fn purposes(&self) -> &[String] {
        &self.purposes
    }

    /// Look up an attribute column by name.
    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns.get(name)
    }

    /// Whether an attribute column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Attribute column names, sorted.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Extract the sub-table of rows whose purpose tag equals `purpose`,
    /// preserving row order.
    ///
    /// The result may be empty; invariants carry over from `self`, so no
    /// re-validation is performed.
    pub fn filter_by_purpose(&self, purpose: &str) -> Choosers {
        let rows: Vec<usize> = self
            .purposes
            .iter()
            .enumerate()
            .filter(|(_, tag)| tag.as_str() == purpose)
            .map(|(row, _)| row)
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|(name, column)| {
                let values: Vec<f64> = rows.iter().map(|&row| column[row]).collect();
                (name.clone(), Array1::from_vec(values))
            })
            .collect();

        Choosers {
            ids: rows.iter().map(|&row| self.ids[row]).collect(),
            person_ids: rows.iter().map(|&row| self.person_ids[row]).collect(),
            household_ids: rows.iter().map(|&row| self.household_ids[row]).collect(),
            purposes: rows.iter().map(|&row| self.purposes[row].clone()).collect(),
            columns,
        }
    }

    /// Insert or replace an attribute column.
    ///
    /// Length is validated; values are not required to be finite, because
    /// the choice write-back fills rows outside the result series with NaN
    /// (the "not scheduled" marker).
    pub fn set_column(&mut self, name: &str, values: Array1<f64>) -> ChoiceResult<()> {
        check_len("choosers", name, self.ids.len(), values.len())?;
        self.columns.insert(name.to_string(), values);
        Ok(())
    }
}

/// Alternatives — validated shared alternatives table.
///
/// Purpose
/// -------
/// Represent the discrete options available to every chooser of a
/// category: a start/end time-window pair per row, with the derived
/// `duration` column, plus any extra named attribute columns.
///
/// Invariants
/// ----------
/// - At least one row; ids unique.
/// - Position `k` in the table labels column `k` of the utility and
///   probability matrices ([`Alternatives::id_at`] maps back).
/// - `end ≥ start` for every row; `duration = end − start`.
/// - Extra columns do not use the reserved names `start`, `end`,
///   `duration`, have one value per row, and contain only finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternatives {
    ids: Vec<u64>,
    columns: BTreeMap<String, Array1<f64>>,
}

impl Alternatives {
    /// Construct a validated alternatives table, deriving `duration`.
    ///
    /// Parameters
    /// ----------
    /// - `ids`: unique alternative ids, one per row.
    /// - `start` / `end`: integer window boundaries per row.
    /// - `extra`: additional attribute columns visible to expressions.
    ///
    /// Returns
    /// -------
    /// `ChoiceResult<Alternatives>`
    ///
    /// Errors
    /// ------
    /// - `ChoiceError::EmptyTable` if there are no rows.
    /// - `ChoiceError::DuplicateIndex` if an id repeats.
    /// - `ChoiceError::ColumnLengthMismatch` if `start`, `end`, or an
    ///   extra column disagrees with `ids.len()`.
    /// - `ChoiceError::NegativeDuration` if a window ends before it
    ///   starts.
    /// - `ChoiceError::ReservedColumn` if an extra column uses `start`,
    ///   `end`, or `duration`.
    /// - `ChoiceError::NonFiniteAttribute` if an extra column value is
    ///   NaN/±inf.
    pub fn new(
        ids: Vec<u64>, start: Vec<i64>, end: Vec<i64>,
        extra: BTreeMap<String, Array1<f64>>,
    ) -> ChoiceResult<Self> {
        const TABLE: &str = "alternatives";
        let n = ids.len();

        if n == 0 {
            return Err(ChoiceError::EmptyTable { table: TABLE });
        }
        check_unique(TABLE, &ids)?;
        check_len(TABLE, START_COLUMN, n, start.len())?;
        check_len(TABLE, END_COLUMN, n, end.len())?;

        let mut duration = Vec::with_capacity(n);
        for (position, (&s, &e)) in start.iter().zip(&end).enumerate() {
            if e < s {
                return Err(ChoiceError::NegativeDuration {
                    position,
                    start: s as f64,
                    end: e as f64,
                });
            }
            duration.push((e - s) as f64);
        }

        let mut columns = BTreeMap::new();
        columns.insert(
            START_COLUMN.to_string(),
            Array1::from_vec(start.iter().map(|&v| v as f64).collect()),
        );
        columns.insert(
            END_COLUMN.to_string(),
            Array1::from_vec(end.iter().map(|&v| v as f64).collect()),
        );
        columns.insert(DURATION_COLUMN.to_string(), Array1::from_vec(duration));

        for (name, column) in extra {
            if columns.contains_key(&name) {
                return Err(ChoiceError::ReservedColumn { table: TABLE, column: name });
            }
            check_len(TABLE, &name, n, column.len())?;
            check_finite(TABLE, &name, &column)?;
            columns.insert(name, column);
        }

        Ok(Alternatives { ids, columns })
    }

    /// Number of alternatives.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows (never true for a constructed value).
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Alternative ids in positional order.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// The alternative id at matrix column `position`.
    pub fn id_at(&self, position: usize) -> u64 {
        self.ids[position]
    }

    /// Look up a column (including `start`, `end`, `duration`) by name.
    pub fn column(&self, name: &str) -> Option<&Array1<f64>> {
        self.columns.get(name)
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names, sorted.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// The derived `duration` column.
    pub fn durations(&self) -> &Array1<f64> {
        // Present by construction.
        &self.columns[DURATION_COLUMN]
    }
}

//
// ---------- Private helpers (compact docs) ----------
//

/// Reject duplicate ids, reporting the first repeat.
fn check_unique(table: &'static str, ids: &[u64]) -> ChoiceResult<()> {
    let mut seen = BTreeSet::new();
    for &id in ids {
        if !seen.insert(id) {
            return Err(ChoiceError::DuplicateIndex { table, id });
        }
    }
    Ok(())
}

/// Reject a column whose length disagrees with the index length.
fn check_len(
    table: &'static str, column: &str, expected: usize, actual: usize,
) -> ChoiceResult<()> {
    if expected != actual {
        return Err(ChoiceError::ColumnLengthMismatch {
            table,
            column: column.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Reject NaN/±inf values, reporting the first offending row.
fn check_finite(table: &'static str, column: &str, values: &Array1<f64>) -> ChoiceResult<()> {
    for (row, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(ChoiceError::NonFiniteAttribute {
                table,
                column: column.to_string(),
                row,
                value,
            });
        }
    }
    Ok(())
}
