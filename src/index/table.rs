//! Tabular training input.
//!
//! Each row holds up to four category names followed by the example text in
//! the last column. The first empty category name ends the path.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxisError};
use crate::index::document::MAX_LEVELS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub names: Vec<String>,
    pub text: String,
}

impl TrainingRow {
    pub fn new<I, S, T>(names: I, text: T) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: Into<String>,
    {
        TrainingRow {
            names: names.into_iter().map(Into::into).collect(),
            text: text.into(),
        }
    }

    /// Rows without a first-level category or without text are not indexed.
    pub fn is_indexable(&self) -> bool {
        let has_category = self
            .names
            .first()
            .is_some_and(|name| !name.trim().is_empty());
        has_category && !self.text.trim().is_empty()
    }
}

/// Read training rows from delimited text without a header line.
pub fn read_rows<R: Read>(input: R, delimiter: char) -> Result<Vec<TrainingRow>> {
    if !delimiter.is_ascii() {
        return Err(TaxisError::invalid_argument(
            "delimiter must be an ASCII character",
        ));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(delimiter as u8)
        .from_reader(input);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut names: Vec<String> = record.iter().map(str::to_string).collect();
        let Some(text) = names.pop() else {
            continue;
        };
        names.truncate(MAX_LEVELS);
        rows.push(TrainingRow { names, text });
    }
    Ok(rows)
}

pub fn read_rows_from_path<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Vec<TrainingRow>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_rows(file, delimiter)
}
