//! Ordinal encoding of categorical columns.

use crate::columns::ColumnLayout;
use crate::error::{DataError, DataResult};
use crate::loader::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted distinct raw values of one categorical column. The ordinal of a
/// value is its rank in this sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    column: usize,
    values: Vec<i32>,
}

impl Vocabulary {
    pub fn build<'a, I>(column: usize, records: I) -> DataResult<Self>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut distinct = BTreeSet::new();
        for record in records {
            let raw = *record.get(column).ok_or_else(|| {
                DataError::Config(format!("categorical column {column} is out of range"))
            })?;
            distinct.insert(category_code(raw, column)?);
        }
        Ok(Self { column, values: distinct.into_iter().collect() })
    }

    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    #[must_use]
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A value absent from the vocabulary is a configuration error.
    pub fn encode(&self, raw: f32) -> DataResult<u32> {
        let code = category_code(raw, self.column)?;
        self.values.binary_search(&code).map(|idx| idx as u32).map_err(|_| {
            DataError::Config(format!(
                "value {code} of categorical column {} is not in its vocabulary",
                self.column
            ))
        })
    }

    #[must_use]
    pub fn decode(&self, ordinal: u32) -> Option<i32> {
        self.values.get(ordinal as usize).copied()
    }
}

/// Categorical values are integer codes stored as floats in the input.
fn category_code(raw: f32, column: usize) -> DataResult<i32> {
    if raw.fract() != 0.0 || raw < i32::MIN as f32 || raw > i32::MAX as f32 {
        return Err(DataError::Config(format!(
            "categorical column {column} holds non-integral value {raw}"
        )));
    }
    Ok(raw as i32)
}

/// Vocabularies for the two categorical columns of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    vocabularies: [Vocabulary; 2],
}

impl FeatureEncoder {
    /// Collects the distinct values of each categorical column over `records`.
    pub fn build<'a, I>(records: I, layout: &ColumnLayout) -> DataResult<Self>
    where
        I: IntoIterator<Item = &'a Record> + Clone,
    {
        let [c1, c2] = layout.categorical;
        Ok(Self {
            vocabularies: [
                Vocabulary::build(c1, records.clone())?,
                Vocabulary::build(c2, records)?,
            ],
        })
    }

    #[must_use]
    pub fn vocabularies(&self) -> &[Vocabulary; 2] {
        &self.vocabularies
    }

    pub fn encode(&self, record: &Record) -> DataResult<[u32; 2]> {
        let [v1, v2] = &self.vocabularies;
        let raw = |col: usize| {
            record.get(col).copied().ok_or_else(|| {
                DataError::Config(format!("categorical column {col} is out of range"))
            })
        };
        Ok([v1.encode(raw(v1.column())?)?, v2.encode(raw(v2.column())?)?])
    }
}
