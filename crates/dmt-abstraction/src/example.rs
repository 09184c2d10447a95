use serde::{Deserialize, Serialize};

/// Model inputs for a single record: normalized numerical features plus the
/// two ordinal-encoded categorical features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub numerical: Vec<f32>,
    pub categorical1: u32,
    pub categorical2: u32,
}

/// A training example: features with the expected label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub features: FeatureVector,
    pub label: f32,
}

impl LabeledExample {
    #[must_use]
    pub fn new(numerical: Vec<f32>, categorical1: u32, categorical2: u32, label: f32) -> Self {
        Self { features: FeatureVector { numerical, categorical1, categorical2 }, label }
    }
}
