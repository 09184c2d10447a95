use crate::columns::ColumnLayout;
use crate::error::DataResult;
use crate::loader::Dataset;
use crate::vocabulary::FeatureEncoder;
use dmt_abstraction::{FeatureVector, LabeledExample};

/// One partition of the dataset with aligned numerical, categorical and label
/// data. `categorical[k][i]` is the ordinal of categorical column `k` for row `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fold {
    pub numerical: Vec<Vec<f32>>,
    pub categorical: [Vec<u32>; 2],
    pub labels: Vec<f32>,
}

impl Fold {
    /// Gathers the rows at `indices`, in that order.
    pub fn gather(
        dataset: &Dataset,
        indices: &[usize],
        layout: &ColumnLayout,
        encoder: &FeatureEncoder,
    ) -> DataResult<Self> {
        let records = dataset.records();
        let mut fold = Self {
            numerical: Vec::with_capacity(indices.len()),
            categorical: [Vec::with_capacity(indices.len()), Vec::with_capacity(indices.len())],
            labels: Vec::with_capacity(indices.len()),
        };

        for &idx in indices {
            let record = &records[idx];
            let [c1, c2] = encoder.encode(record)?;
            fold.numerical.push(layout.numerical.iter().map(|&col| record[col]).collect());
            fold.categorical[0].push(c1);
            fold.categorical[1].push(c2);
            fold.labels.push(dataset.label(idx));
        }
        Ok(fold)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn features(&self, index: usize) -> Option<FeatureVector> {
        Some(FeatureVector {
            numerical: self.numerical.get(index)?.clone(),
            categorical1: *self.categorical[0].get(index)?,
            categorical2: *self.categorical[1].get(index)?,
        })
    }

    #[must_use]
    pub fn example(&self, index: usize) -> Option<LabeledExample> {
        Some(LabeledExample { features: self.features(index)?, label: *self.labels.get(index)? })
    }

    pub fn examples(&self) -> impl Iterator<Item = LabeledExample> + '_ {
        (0..self.len()).filter_map(|i| self.example(i))
    }
}
