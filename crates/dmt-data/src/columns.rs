use crate::error::{DataError, DataResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which record columns are categorical and which are numerical.
/// The trailing column is always the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub categorical: [usize; 2],
    pub numerical: Vec<usize>,
}

impl Default for ColumnLayout {
    /// The Boston housing layout: CHAS and RAD are categorical.
    fn default() -> Self {
        Self { categorical: [3, 8], numerical: vec![0, 1, 2, 4, 5, 6, 7, 9, 10, 11, 12] }
    }
}

impl ColumnLayout {
    #[must_use]
    pub fn num_numerical(&self) -> usize {
        self.numerical.len()
    }

    #[must_use]
    pub fn num_categorical(&self) -> usize {
        self.categorical.len()
    }

    /// Checks `num_columns == numerical + categorical + 1` and that the
    /// feature columns are distinct and in range.
    pub fn validate(&self, num_columns: usize) -> DataResult<()> {
        let expected = self.num_numerical() + self.num_categorical() + 1;
        if num_columns != expected {
            return Err(DataError::Config(format!(
                "dataset has {num_columns} columns but layout describes {} numerical + {} categorical + 1 label",
                self.num_numerical(),
                self.num_categorical()
            )));
        }

        let label = num_columns - 1;
        let mut seen = BTreeSet::new();
        for &col in self.categorical.iter().chain(&self.numerical) {
            if col >= label {
                return Err(DataError::Config(format!(
                    "feature column {col} overlaps the label column {label}"
                )));
            }
            if !seen.insert(col) {
                return Err(DataError::Config(format!("column {col} is listed twice")));
            }
        }
        Ok(())
    }
}
