use crate::error::{DataError, DataResult};
use std::path::Path;
use tracing::debug;

/// One row of the input file: feature columns followed by the label.
pub type Record = Vec<f32>;

/// Parsed rows with a uniform column count.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
    num_columns: usize,
}

impl Dataset {
    /// Builds a dataset from rows, rejecting empty input and ragged rows.
    pub fn from_records(records: Vec<Record>) -> DataResult<Self> {
        let num_columns = records
            .first()
            .map(Vec::len)
            .ok_or_else(|| DataError::Parse { line: 0, reason: "dataset is empty".to_string() })?;
        if num_columns == 0 {
            return Err(DataError::Parse { line: 1, reason: "record has no columns".to_string() });
        }
        for (idx, record) in records.iter().enumerate() {
            if record.len() != num_columns {
                return Err(DataError::Parse {
                    line: idx + 1,
                    reason: format!("expected {num_columns} columns, found {}", record.len()),
                });
            }
        }
        Ok(Self { records, num_columns })
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[must_use]
    pub fn label(&self, index: usize) -> f32 {
        self.records[index][self.num_columns - 1]
    }
}

/// Reads newline-delimited rows of whitespace-separated numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetLoader;

impl DatasetLoader {
    pub fn load(path: &Path) -> DataResult<Dataset> {
        let contents = std::fs::read_to_string(path)?;
        let dataset = Self::parse(&contents)?;
        debug!(
            path = %path.display(),
            records = dataset.num_records(),
            columns = dataset.num_columns(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Parses dataset text. Blank lines are skipped; line numbers in errors
    /// refer to the physical line in the input.
    pub fn parse(contents: &str) -> DataResult<Dataset> {
        let mut records = Vec::new();
        let mut expected: Option<usize> = None;

        for (idx, line) in contents.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            let record = line
                .split_whitespace()
                .map(|token| parse_token(token, line_no))
                .collect::<DataResult<Record>>()?;

            match expected {
                None => expected = Some(record.len()),
                Some(n) if n != record.len() => {
                    return Err(DataError::Parse {
                        line: line_no,
                        reason: format!("expected {n} columns, found {}", record.len()),
                    });
                }
                Some(_) => {}
            }
            records.push(record);
        }

        Dataset::from_records(records)
    }
}

fn parse_token(token: &str, line: usize) -> DataResult<f32> {
    match token.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DataError::Parse { line, reason: format!("'{token}' is not a finite number") }),
    }
}
