//! Session facade: one object holding the prepared data, the orchestrator
//! and the version store, exposing the user-level operations.

use crate::context::AppContext;
use crate::error::{CoreError, CoreResult};
use dmt_abstraction::{DataAugmenter, Predictor, SettingKey, Toggle, Trainer};
use dmt_data::{DataPipeline, PreparedData};
use dmt_store::{ModelVersionStore, OfflineRemote, RemoteStore};
use dmt_training::{FinalMetrics, InferenceItem, MetricsEvaluator, TrainingOrchestrator, TrainingSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of `Session::train`: the run summary followed by the metrics
/// measured right after it. A failed evaluation leaves `metrics` empty and
/// does not undo the completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub summary: TrainingSummary,
    pub metrics: Option<FinalMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
    pub trainings_count: usize,
}

pub struct Session<B: Trainer + Predictor> {
    ctx: AppContext,
    backend: B,
    orchestrator: TrainingOrchestrator,
    store: Arc<ModelVersionStore>,
    augmenter: Option<Arc<dyn DataAugmenter>>,
    data: Option<PreparedData>,
    train_percentage: f64,
    trainings_count: usize,
}

impl<B: Trainer + Predictor> Session<B> {
    /// Wires the store and orchestrator from `ctx`. The post-training backup
    /// is attached only when a backup service is configured. The baseline is
    /// copied to the updatable path if nothing is there yet.
    pub fn open(ctx: AppContext, backend: B) -> CoreResult<Self> {
        let configured = ctx.remote()?;
        let has_remote = configured.is_some();
        let remote: Arc<dyn RemoteStore> = configured.unwrap_or_else(|| Arc::new(OfflineRemote));
        Self::with_remote(ctx, backend, remote, has_remote)
    }

    /// Like `open`, with an explicit transport.
    pub fn with_remote(
        ctx: AppContext,
        backend: B,
        remote: Arc<dyn RemoteStore>,
        backup_after_training: bool,
    ) -> CoreResult<Self> {
        let store = Arc::new(ctx.version_store(remote)?);
        let mut orchestrator = ctx.orchestrator();
        if backup_after_training {
            orchestrator = orchestrator.with_backup(store.clone());
        }

        if ctx.baseline_path().exists() {
            store.install_default_if_absent()?;
        } else {
            warn!(path = %ctx.baseline_path().display(), "Baseline artifact is missing");
        }

        let train_percentage = ctx.config().train_percentage();
        debug!(backend = backend.id(), model_id = %store.model_id(), "Session opened");
        Ok(Self {
            ctx,
            backend,
            orchestrator,
            store,
            augmenter: None,
            data: None,
            train_percentage,
            trainings_count: 0,
        })
    }

    #[must_use]
    pub fn with_augmenter(mut self, augmenter: Arc<dyn DataAugmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ModelVersionStore> {
        &self.store
    }

    #[must_use]
    pub fn orchestrator(&self) -> &TrainingOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn prepared(&self) -> Option<&PreparedData> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn trainings_count(&self) -> usize {
        self.trainings_count
    }

    #[must_use]
    pub fn train_percentage(&self) -> f64 {
        self.train_percentage
    }

    /// Loads the dataset and rebuilds the folds at `train_percentage`.
    /// On error the previously prepared data is kept.
    pub fn prepare(&mut self, train_percentage: f64) -> CoreResult<&PreparedData> {
        let options = self.ctx.config().pipeline_options(train_percentage)?;
        let data = DataPipeline::prepare_file(&self.ctx.dataset_path(), &options)?;

        let log = self.ctx.log();
        log.log("Data prepared");
        log.log(&data.proportions());
        info!(train = data.num_train(), test = data.num_test(), "Data prepared");

        self.train_percentage = train_percentage;
        Ok(self.data.insert(data))
    }

    /// Draws a fresh split at `train_percentage`. With a configured seed the
    /// split is the same as the previous one.
    pub fn randomize(&mut self, train_percentage: f64) -> CoreResult<&PreparedData> {
        self.prepare(train_percentage)
    }

    fn ensure_prepared(&mut self) -> CoreResult<()> {
        if self.data.is_none() {
            self.prepare(self.train_percentage)?;
        }
        Ok(())
    }

    pub fn proportions(&self) -> CoreResult<String> {
        self.data.as_ref().map(PreparedData::proportions).ok_or(CoreError::NotPrepared)
    }

    /// Trains the updatable model on the train fold, then evaluates both
    /// models on the test fold.
    pub async fn train(&mut self) -> CoreResult<TrainingReport> {
        self.ensure_prepared()?;
        let data = self.data.as_ref().ok_or(CoreError::NotPrepared)?;

        let batch = self.orchestrator.prepare_batch(&data.train, self.augmenter.as_deref());
        let config = self.ctx.config().update_config();
        let summary = self.orchestrator.train(&self.backend, &batch, &config).await?;
        self.trainings_count += 1;

        let (metrics, evaluation_error) = match self.evaluate() {
            Ok(metrics) => (Some(metrics), None),
            Err(e) => {
                warn!(error = %e, "Evaluation after training failed");
                self.ctx.log().log(&format!("Evaluation failed: {e}"));
                (None, Some(e.to_string()))
            }
        };
        Ok(TrainingReport { summary, metrics, evaluation_error, trainings_count: self.trainings_count })
    }

    /// MAE and RMSE of the baseline and the updatable model on the test fold.
    pub fn evaluate(&mut self) -> CoreResult<FinalMetrics> {
        self.ensure_prepared()?;
        let data = self.data.as_ref().ok_or(CoreError::NotPrepared)?;
        let (baseline, retrained) = self.load_models()?;
        let evaluator = MetricsEvaluator::new(&self.backend, self.ctx.log());
        Ok(evaluator.evaluate(&data.test, &baseline, &retrained)?)
    }

    /// Predictions of both models for the 1-based test sample `sample`.
    pub fn infer_sample(&mut self, sample: usize) -> CoreResult<InferenceItem> {
        self.ensure_prepared()?;
        let data = self.data.as_ref().ok_or(CoreError::NotPrepared)?;
        let (baseline, retrained) = self.load_models()?;
        let evaluator = MetricsEvaluator::new(&self.backend, self.ctx.log());
        Ok(evaluator.infer_sample(&data.test, sample, &baseline, &retrained)?)
    }

    fn load_models(&self) -> CoreResult<(<B as Predictor>::Handle, <B as Predictor>::Handle)> {
        let layout = self.ctx.layout();
        let baseline = Predictor::load(&self.backend, layout.baseline_path())?;
        let retrained = Predictor::load(&self.backend, &layout.updatable_path())?;
        Ok((baseline, retrained))
    }

    /// Discards the trained model: removes the updatable artifact,
    /// re-prepares the data at the configured ratio and reinstalls the
    /// baseline copy. The baseline is reinstalled even if preparation fails.
    pub fn reset_model(&mut self) -> CoreResult<()> {
        self.store.remove_updatable()?;
        let prepared = self.prepare(self.ctx.config().train_percentage()).map(|_| ());
        self.store.install_default_if_absent()?;
        prepared?;
        self.trainings_count = 0;
        self.ctx.log().log("Model was reset to the baseline");
        Ok(())
    }

    /// `On` becomes `Off`; `Off` or unset becomes `On`.
    pub fn toggle_data_augmentation(&self) -> CoreResult<Toggle> {
        let settings = self.ctx.settings();
        let next = settings.toggle(SettingKey::DataAugmentationEnabled).map_or(Toggle::On, |t| t.flipped());
        settings.set_toggle(SettingKey::DataAugmentationEnabled, next)?;
        debug!(value = %next, "Data augmentation toggled");
        Ok(next)
    }

    #[must_use]
    pub fn data_augmentation_enabled(&self) -> bool {
        self.ctx.settings().is_enabled(SettingKey::DataAugmentationEnabled)
    }

    pub fn set_backup_enabled(&self, enabled: bool) -> CoreResult<()> {
        Ok(self.store.set_backup_enabled(enabled)?)
    }

    /// Final loss recorded by the last completed run, if any.
    #[must_use]
    pub fn last_final_loss(&self) -> Option<f64> {
        self.ctx.settings().get(SettingKey::FinalLossOfLastTraining).and_then(|v| v.parse().ok())
    }
}
