//! CSV trace sink — one file per artifact per traced chunk.
//!
//! Purpose
//! -------
//! Write a traced household's interaction rows, utilities, probabilities,
//! and choices as CSV files into a caller-chosen directory, for validation
//! against reference runs and for debugging calibrated specs.
//!
//! Conventions
//! -----------
//! - File names are `<label>.<artifact>.csv` with path separators in the
//!   label replaced; a traced household spanning multiple chunks
//!   overwrites per-label files (labels are category-qualified upstream,
//!   so categories never collide).
//! - Matrix artifacts use `tour_id` as the first column and one column
//!   per alternative id; the interaction artifact uses one row per
//!   (tour, alternative) pair and one column per spec expression.
//!
//! Testing notes
//! -------------
//! - Tests write into a per-process temp directory and read the files
//!   back; they assert headers and row counts, not byte-exact output.
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::ArrayView2;

use super::{TraceError, TraceResult, TraceSink};

/// CsvTraceSink — writes trace artifacts as CSV files.
#[derive(Debug, Clone)]
pub struct CsvTraceSink {
    dir: PathBuf,
}

impl CsvTraceSink {
    /// Create the sink, ensuring the output directory exists.
    ///
    /// Errors
    /// ------
    /// - `TraceError::Io` if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>) -> TraceResult<CsvTraceSink> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| TraceError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(CsvTraceSink { dir })
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn artifact_path(&self, label: &str, artifact: &str) -> PathBuf {
        let safe: String = label
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{safe}.{artifact}.csv"))
    }

    /// Write `records` (header first) to `<label>.<artifact>.csv`.
    fn write_records(
        &self, label: &str, artifact: &str, records: Vec<Vec<String>>,
    ) -> TraceResult<()> {
        let path = self.artifact_path(label, artifact);
        let display = path.display().to_string();

        let mut writer = ::csv::Writer::from_path(&path)
            .map_err(|e| TraceError::Csv { path: display.clone(), message: e.to_string() })?;
        for record in records {
            writer
                .write_record(&record)
                .map_err(|e| TraceError::Csv { path: display.clone(), message: e.to_string() })?;
        }
        writer
            .flush()
            .map_err(|e| TraceError::Io { path: display, message: e.to_string() })
    }

    /// Header plus one row per tour for a tours × alternatives matrix.
    fn matrix_records(
        tour_ids: &[u64], alt_ids: &[u64], values: ArrayView2<f64>,
    ) -> Vec<Vec<String>> {
        let mut header = Vec::with_capacity(alt_ids.len() + 1);
        header.push("tour_id".to_string());
        header.extend(alt_ids.iter().map(|id| id.to_string()));

        let mut records = Vec::with_capacity(tour_ids.len() + 1);
        records.push(header);
        for (row, &tour_id) in tour_ids.iter().enumerate() {
            let mut record = Vec::with_capacity(alt_ids.len() + 1);
            record.push(tour_id.to_string());
            record.extend(values.row(row).iter().map(|v| v.to_string()));
            records.push(record);
        }
        records
    }
}

impl TraceSink for CsvTraceSink {
    fn write_interaction(
        &mut self, label: &str, expressions: &[String], tour_ids: &[u64], alt_ids: &[u64],
        values: ArrayView2<f64>,
    ) -> TraceResult<()> {
        let mut header = Vec::with_capacity(expressions.len() + 2);
        header.push("tour_id".to_string());
        header.push("alt_id".to_string());
        header.extend(expressions.iter().cloned());

        let mut records = Vec::with_capacity(tour_ids.len() + 1);
        records.push(header);
        for (row, (&tour_id, &alt_id)) in tour_ids.iter().zip(alt_ids).enumerate() {
            let mut record = Vec::with_capacity(expressions.len() + 2);
            record.push(tour_id.to_string());
            record.push(alt_id.to_string());
            record.extend(values.row(row).iter().map(|v| v.to_string()));
            records.push(record);
        }

        self.write_records(label, "interaction", records)
    }

    fn write_utilities(
        &mut self, label: &str, tour_ids: &[u64], alt_ids: &[u64],
        utilities: ArrayView2<f64>,
    ) -> TraceResult<()> {
        let records = Self::matrix_records(tour_ids, alt_ids, utilities);
        self.write_records(label, "utilities", records)
    }

    fn write_probabilities(
        &mut self, label: &str, tour_ids: &[u64], alt_ids: &[u64],
        probabilities: ArrayView2<f64>,
    ) -> TraceResult<()> {
        let records = Self::matrix_records(tour_ids, alt_ids, probabilities);
        self.write_records(label, "probabilities", records)
    }

    fn write_choices(
        &mut self, label: &str, tour_ids: &[u64], choices: &[u64], probabilities: &[f64],
    ) -> TraceResult<()> {
        let mut records = Vec::with_capacity(tour_ids.len() + 1);
        records.push(vec![
            "tour_id".to_string(),
            "choice".to_string(),
            "probability".to_string(),
        ]);
        for ((&tour_id, &choice), &probability) in
            tour_ids.iter().zip(choices).zip(probabilities)
        {
            records.push(vec![
                tour_id.to_string(),
                choice.to_string(),
                probability.to_string(),
            ]);
        }

        self.write_records(label, "choices", records)
    }
}
