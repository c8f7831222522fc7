//! ---
//! tie_section: "02-data-model"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Patient demographic records and the CSV loader."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
//! Canonical patient records for the feed.
//!
//! The input is a four-column CSV (`nhs_number, dob, family_name, given_names`).
//! The first row is a header and is always discarded without inspection.
#![warn(missing_docs)]

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::debug;

/// Minimum number of columns a data row must carry.
pub const REQUIRED_COLUMNS: usize = 4;

/// Shared result type for record loading.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Failures raised while loading the patient input.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// A data row carries fewer than [`REQUIRED_COLUMNS`] columns.
    #[error("row {row} has {columns} columns; expected at least 4")]
    InputFormat {
        /// 1-based record position, header excluded.
        row: usize,
        /// Number of columns actually present.
        columns: usize,
    },
    /// The input file could not be opened.
    #[error("unable to open patient input {path}: {source}")]
    Io {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The CSV reader rejected the input.
    #[error("invalid patient csv: {0}")]
    Csv(#[from] csv::Error),
}

/// A single patient as read from one input row. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    /// National identifier, verbatim from column 0.
    pub nhs_number: String,
    /// Date of birth in compact `YYYYMMDD` form.
    pub dob: String,
    /// Family name, verbatim from column 2.
    pub family_name: String,
    /// First given-name token.
    pub given_name_first: String,
    /// Remaining given-name tokens, present only when there was more than one.
    pub given_name_middle: Option<String>,
}

impl PatientRecord {
    /// Build a record from the four raw column values.
    pub fn from_columns(nhs_number: &str, dob: &str, family_name: &str, given_names: &str) -> Self {
        let mut tokens = given_names.split(' ');
        let given_name_first = tokens.next().unwrap_or_default().to_owned();
        let rest: Vec<&str> = tokens.collect();
        let given_name_middle = if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        };
        Self {
            nhs_number: nhs_number.to_owned(),
            dob: normalize_dob(dob),
            family_name: family_name.to_owned(),
            given_name_first,
            given_name_middle,
        }
    }
}

/// Compact a dashed `YYYY-MM-DD...` date into `YYYYMMDD`.
///
/// Characters are taken at fixed offsets `[0, 4)`, `[5, 7)` and `[8, 10)`. There is no
/// calendar validation; a short or malformed input simply yields whatever falls in
/// those windows.
pub fn normalize_dob(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let window = |start: usize, end: usize| chars.iter().skip(start).take(end - start);
    window(0, 4)
        .chain(window(5, 7))
        .chain(window(8, 10))
        .collect()
}

/// Ordered, read-only collection of loaded records addressed by 1-based row position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientRecords {
    records: Vec<PatientRecord>,
}

impl PatientRecords {
    /// Wrap an already ordered list of records.
    pub fn new(records: Vec<PatientRecord>) -> Self {
        Self { records }
    }

    /// Number of loaded records (header excluded).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the input held no data rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at the 1-based `position`, if any.
    pub fn get(&self, position: usize) -> Option<&PatientRecord> {
        position
            .checked_sub(1)
            .and_then(|index| self.records.get(index))
    }

    /// Records in input order.
    pub fn iter(&self) -> std::slice::Iter<'_, PatientRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a PatientRecords {
    type Item = &'a PatientRecord;
    type IntoIter = std::slice::Iter<'a, PatientRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Load all patient records from the CSV file at `path`.
pub fn load(path: &Path) -> Result<PatientRecords> {
    let file = File::open(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = from_reader(file)?;
    debug!(path = %path.display(), records = records.len(), "patient input loaded");
    Ok(records)
}

/// Load patient records from any CSV source, skipping the first row.
pub fn from_reader<R: Read>(reader: R) -> Result<PatientRecords> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate().skip(1) {
        let row = row?;
        if row.len() < REQUIRED_COLUMNS {
            return Err(RecordError::InputFormat {
                row: index,
                columns: row.len(),
            });
        }
        records.push(PatientRecord::from_columns(
            &row[0], &row[1], &row[2], &row[3],
        ));
    }
    Ok(PatientRecords::new(records))
}
