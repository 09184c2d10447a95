use crate::error::{TrainingError, TrainingResult};
use dmt_abstraction::{LogSink, Predictor};
use dmt_data::Fold;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Baseline versus retrained error on the test fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalMetrics {
    pub samples: usize,
    pub mae_baseline: f64,
    pub mae_retrained: f64,
    pub rmse_baseline: f64,
    pub rmse_retrained: f64,
}

/// Predictions of both models for one test sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceItem {
    /// 1-based index into the test fold.
    pub sample: usize,
    pub expected: f32,
    pub baseline_prediction: f32,
    pub retrained_prediction: f32,
}

/// Mean absolute error.
#[must_use]
pub fn mae(expected: &[f32], observed: &[f32]) -> f64 {
    let n = expected.len().min(observed.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = expected
        .iter()
        .zip(observed)
        .map(|(&e, &o)| (f64::from(e) - f64::from(o)).abs())
        .sum();
    sum / n as f64
}

/// Root mean squared error.
#[must_use]
pub fn rmse(expected: &[f32], observed: &[f32]) -> f64 {
    let n = expected.len().min(observed.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = expected
        .iter()
        .zip(observed)
        .map(|(&e, &o)| (f64::from(e) - f64::from(o)).powi(2))
        .sum();
    (sum / n as f64).sqrt()
}

/// Scores the test fold with the baseline and retrained models.
///
/// Evaluation has no side effects besides activity log lines.
pub struct MetricsEvaluator<'a, P: Predictor> {
    predictor: &'a P,
    log: Arc<dyn LogSink>,
}

impl<'a, P: Predictor> MetricsEvaluator<'a, P> {
    pub fn new(predictor: &'a P, log: Arc<dyn LogSink>) -> Self {
        Self { predictor, log }
    }

    fn predict_all(&self, handle: &P::Handle, test: &Fold) -> TrainingResult<Vec<f32>> {
        (0..test.len())
            .filter_map(|i| test.features(i))
            .map(|features| self.predictor.predict(handle, &features).map_err(TrainingError::from))
            .collect()
    }

    pub fn evaluate(&self, test: &Fold, baseline: &P::Handle, retrained: &P::Handle) -> TrainingResult<FinalMetrics> {
        if test.is_empty() {
            return Err(TrainingError::EmptyFold);
        }

        let baseline_predictions = self.predict_all(baseline, test)?;
        let retrained_predictions = self.predict_all(retrained, test)?;

        let metrics = FinalMetrics {
            samples: test.len(),
            mae_baseline: mae(&test.labels, &baseline_predictions),
            mae_retrained: mae(&test.labels, &retrained_predictions),
            rmse_baseline: rmse(&test.labels, &baseline_predictions),
            rmse_retrained: rmse(&test.labels, &retrained_predictions),
        };
        debug!(?metrics, "Evaluated test fold");

        self.log.log("");
        self.log.log(&format!("Metrics (test dataset: {} samples):", metrics.samples));
        self.log.log(&format!("MAE for pre-trained model {}", metrics.mae_baseline));
        self.log.log(&format!("MAE for re-trained model {}", metrics.mae_retrained));
        self.log.log(&format!("RMSE for pre-trained model {}", metrics.rmse_baseline));
        self.log.log(&format!("RMSE for re-trained model {}", metrics.rmse_retrained));
        Ok(metrics)
    }

    /// Predicts test sample `sample` (1-based) with both models.
    pub fn infer_sample(
        &self,
        test: &Fold,
        sample: usize,
        baseline: &P::Handle,
        retrained: &P::Handle,
    ) -> TrainingResult<InferenceItem> {
        let out_of_range = || TrainingError::SampleOutOfRange { sample, len: test.len() };
        let index = sample.checked_sub(1).ok_or_else(out_of_range)?;
        let example = test.example(index).ok_or_else(out_of_range)?;

        Ok(InferenceItem {
            sample,
            expected: example.label,
            baseline_prediction: self.predictor.predict(baseline, &example.features)?,
            retrained_prediction: self.predictor.predict(retrained, &example.features)?,
        })
    }
}
