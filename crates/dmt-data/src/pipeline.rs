use crate::columns::ColumnLayout;
use crate::error::DataResult;
use crate::fold::Fold;
use crate::loader::{Dataset, DatasetLoader};
use crate::normalize::{normalize, NormalizationStats};
use crate::split::Splitter;
use crate::vocabulary::FeatureEncoder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Which records the categorical vocabularies are built from.
///
/// `FullDataset` sees test-fold values before the split, which leaks
/// category membership from test into train. `TrainFold` avoids that, but
/// then a test value never seen in training fails to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyScope {
    #[default]
    FullDataset,
    TrainFold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub train_percentage: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub vocabulary_scope: VocabularyScope,
    #[serde(default)]
    pub columns: ColumnLayout,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            train_percentage: 0.8,
            seed: None,
            vocabulary_scope: VocabularyScope::default(),
            columns: ColumnLayout::default(),
        }
    }
}

/// Output of the data pipeline: encoded, split and normalized folds plus the
/// statistics that produced them. Rebuilt wholesale whenever the train/test
/// ratio changes.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub train_percentage: f64,
    pub num_records: usize,
    pub num_columns: usize,
    pub layout: ColumnLayout,
    pub encoder: FeatureEncoder,
    pub stats: NormalizationStats,
    pub train: Fold,
    pub test: Fold,
}

impl PreparedData {
    #[must_use]
    pub fn num_train(&self) -> usize {
        self.train.len()
    }

    #[must_use]
    pub fn num_test(&self) -> usize {
        self.test.len()
    }

    #[must_use]
    pub fn num_numerical(&self) -> usize {
        self.layout.num_numerical()
    }

    #[must_use]
    pub fn num_categorical(&self) -> usize {
        self.layout.num_categorical()
    }

    #[must_use]
    pub fn num_labels(&self) -> usize {
        1
    }

    /// e.g. `Train / Test: 80%(405) / 20%(101)`
    #[must_use]
    pub fn proportions(&self) -> String {
        let train_pct = (self.train_percentage * 100.0).round() as u32;
        format!(
            "Train / Test: {}%({}) / {}%({})",
            train_pct,
            self.num_train(),
            100 - train_pct,
            self.num_test()
        )
    }
}

/// Ingest → shuffle → encode → split → normalize.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataPipeline;

impl DataPipeline {
    pub fn prepare_file(path: &Path, options: &PipelineOptions) -> DataResult<PreparedData> {
        let dataset = DatasetLoader::load(path)?;
        Self::prepare(&dataset, options)
    }

    /// Fails fast: no partially built data is returned on any error.
    pub fn prepare(dataset: &Dataset, options: &PipelineOptions) -> DataResult<PreparedData> {
        let layout = &options.columns;
        layout.validate(dataset.num_columns())?;

        let split = Splitter::new(options.seed).split(dataset.num_records(), options.train_percentage)?;

        let records = dataset.records();
        let encoder = match options.vocabulary_scope {
            VocabularyScope::FullDataset => FeatureEncoder::build(records, layout)?,
            VocabularyScope::TrainFold => {
                FeatureEncoder::build(split.train.iter().map(|&i| &records[i]), layout)?
            }
        };

        let mut train = Fold::gather(dataset, &split.train, layout, &encoder)?;
        let mut test = Fold::gather(dataset, &split.test, layout, &encoder)?;
        let stats = normalize(&mut train, &mut test, layout.num_numerical())?;

        debug!(
            records = dataset.num_records(),
            train = train.len(),
            test = test.len(),
            scope = ?options.vocabulary_scope,
            "Prepared dataset"
        );

        Ok(PreparedData {
            train_percentage: options.train_percentage,
            num_records: dataset.num_records(),
            num_columns: dataset.num_columns(),
            layout: layout.clone(),
            encoder,
            stats,
            train,
            test,
        })
    }
}
