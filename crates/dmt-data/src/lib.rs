//! DMT Data
//!
//! Deterministic preparation of a small tabular regression dataset:
//! - Parsing whitespace-delimited rows (`DatasetLoader`)
//! - Ordinal encoding of categorical columns (`FeatureEncoder`)
//! - Seeded train/test partitioning (`Splitter`)
//! - Train-fold normalization (`NormalizationStats`)

pub mod columns;
pub mod error;
pub mod fold;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod split;
pub mod vocabulary;

pub use columns::ColumnLayout;
pub use error::{DataError, DataResult};
pub use fold::Fold;
pub use loader::{Dataset, DatasetLoader, Record};
pub use normalize::{normalize, NormalizationStats};
pub use pipeline::{DataPipeline, PipelineOptions, PreparedData, VocabularyScope};
pub use split::{train_count, SplitIndices, Splitter};
pub use vocabulary::{FeatureEncoder, Vocabulary};
