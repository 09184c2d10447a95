//! Training run lifecycle.
//!
//! The orchestrator drives an opaque `Trainer` over a prepared batch, keeps
//! the run state machine (`Idle -> Running -> {Completed, Failed}`), and
//! replaces the updatable artifact only after a run completes.

use crate::batch::prepare_batch;
use crate::error::{TrainingError, TrainingResult};
use crate::progress::{RunProgress, TrainingEvent, TrainingMetrics};
use dmt_abstraction::{
    replace_artifact, ArtifactLayout, BackupTrigger, DataAugmenter, LabeledExample, LogSink,
    SettingKey, SettingsStore, Trainer, UpdateConfig, UpdateOutcome,
};
use dmt_data::Fold;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 1024;

/// State of the orchestrator's current or most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingState {
    Idle,
    Running,
    Completed,
    Failed(String),
}

/// What happened to the post-training backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupOutcome {
    Skipped,
    Succeeded,
    Failed(String),
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub final_loss: f64,
    pub metrics: TrainingMetrics,
    pub backup: BackupOutcome,
}

/// Marks the run `Failed` and publishes its terminal event if the run future
/// is dropped before it finishes. The trainer itself may keep working until
/// its current epoch ends; that is not interrupted.
struct RunGuard<'a> {
    state: &'a Mutex<TrainingState>,
    progress: &'a RunProgress,
    events: broadcast::Sender<TrainingEvent>,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, terminal: TrainingState) {
        if let Ok(mut state) = self.state.lock() {
            *state = terminal;
        }
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let reason = "training run was abandoned".to_string();
        warn!(reason = %reason, "Training failed");
        self.progress.ensure_begun();
        let _ = self.events.send(TrainingEvent::Failed { reason: reason.clone() });
        if let Ok(mut state) = self.state.lock() {
            *state = TrainingState::Failed(reason);
        }
    }
}

pub struct TrainingOrchestrator {
    layout: ArtifactLayout,
    settings: Arc<dyn SettingsStore>,
    log: Arc<dyn LogSink>,
    backup: Option<Arc<dyn BackupTrigger>>,
    state: Mutex<TrainingState>,
    events: broadcast::Sender<TrainingEvent>,
}

impl TrainingOrchestrator {
    #[must_use]
    pub fn new(layout: ArtifactLayout, settings: Arc<dyn SettingsStore>, log: Arc<dyn LogSink>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            layout,
            settings,
            log,
            backup: None,
            state: Mutex::new(TrainingState::Idle),
            events,
        }
    }

    /// Backs up the new artifact after each successful run when the
    /// `modelBackupEnabled` setting is on.
    #[must_use]
    pub fn with_backup(mut self, backup: Arc<dyn BackupTrigger>) -> Self {
        self.backup = Some(backup);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrainingEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> TrainingState {
        self.state.lock().map(|s| s.clone()).unwrap_or(TrainingState::Idle)
    }

    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Builds the training batch, consulting the augmentation preference.
    pub fn prepare_batch(&self, train: &Fold, augmenter: Option<&dyn DataAugmenter>) -> Vec<LabeledExample> {
        let augmenter = augmenter.filter(|_| self.settings.is_enabled(SettingKey::DataAugmentationEnabled));
        let batch = prepare_batch(train, augmenter);
        debug!(examples = batch.len(), augmented = augmenter.is_some(), "Prepared training batch");
        self.log.log("Prepare training batch");
        batch
    }

    fn start<'a>(&'a self, progress: &'a RunProgress) -> TrainingResult<RunGuard<'a>> {
        let mut state = self.state.lock().map_err(|_| {
            TrainingError::TrainingFailed("orchestrator state lock poisoned".to_string())
        })?;
        if *state == TrainingState::Running {
            return Err(TrainingError::OperationInProgress);
        }
        *state = TrainingState::Running;
        Ok(RunGuard { state: &self.state, progress, events: self.events.clone(), finished: false })
    }

    fn fail(&self, guard: RunGuard<'_>, progress: &RunProgress, reason: String) -> TrainingError {
        warn!(reason = %reason, "Training failed");
        self.log.log("Training failed");
        progress.ensure_begun();
        let _ = self.events.send(TrainingEvent::Failed { reason: reason.clone() });
        guard.finish(TrainingState::Failed(reason.clone()));
        TrainingError::TrainingFailed(reason)
    }

    /// Runs one incremental update of the updatable artifact.
    ///
    /// A second call while a run is `Running` is rejected with
    /// `OperationInProgress`, and a zero epoch count with `InvalidConfig`,
    /// both before the state changes. On failure the stored artifact is
    /// untouched.
    pub async fn train<T: Trainer>(
        &self,
        trainer: &T,
        batch: &[LabeledExample],
        config: &UpdateConfig,
    ) -> TrainingResult<TrainingSummary> {
        if config.epochs == 0 {
            return Err(TrainingError::InvalidConfig("epochs must be at least 1".to_string()));
        }
        let progress = RunProgress::new(self.events.clone(), self.log.clone(), config.epochs);
        let guard = self.start(&progress)?;

        self.log.log("");
        self.log.log("Training starting:");
        info!(trainer = trainer.id(), examples = batch.len(), epochs = config.epochs, "Training starting");

        let canonical = self.layout.updatable_path();
        let handle = match trainer.load(&canonical).await {
            Ok(handle) => handle,
            Err(e) => return Err(self.fail(guard, &progress, format!("could not load model: {e}"))),
        };

        let (model, final_loss) = match trainer.update(&handle, batch, config, &progress).await {
            UpdateOutcome::Completed { model, final_loss } => (model, final_loss),
            UpdateOutcome::Failed { reason } => return Err(self.fail(guard, &progress, reason)),
        };

        // Persist through a staging copy; the canonical path only ever sees
        // a complete artifact.
        if let Err(e) = self.persist(trainer, &model).await {
            warn!(error = %e, path = %canonical.display(), "Keeping previous artifact");
            return Err(self.fail(guard, &progress, format!("could not persist model: {e}")));
        }

        self.log.log(&format!("Final loss: {final_loss}"));
        if let Err(e) = self.settings.set(SettingKey::FinalLossOfLastTraining, &final_loss.to_string()) {
            warn!(error = %e, "Could not persist final loss");
        }
        self.log.log("Training is done!");
        self.log.log("Model file was replaced with a new one");

        let metrics = progress.metrics();
        progress.ensure_begun();
        let _ = self.events.send(TrainingEvent::Completed { final_loss, total_loss: metrics.total_loss });
        guard.finish(TrainingState::Completed);
        info!(final_loss, total_loss = metrics.total_loss, "Training completed");

        let backup = self.backup_after_training().await;
        Ok(TrainingSummary { final_loss, metrics, backup })
    }

    async fn persist<T: Trainer>(&self, trainer: &T, model: &T::Handle) -> TrainingResult<()> {
        let staging = self.layout.staging_dir()?;
        let staged = self.layout.staged_artifact_path(&staging);
        trainer.save(model, &staged).await?;
        replace_artifact(&staged, &self.layout.updatable_path())?;
        Ok(())
    }

    async fn backup_after_training(&self) -> BackupOutcome {
        let Some(backup) = &self.backup else {
            return BackupOutcome::Skipped;
        };
        if !self.settings.is_enabled(SettingKey::ModelBackupEnabled) {
            return BackupOutcome::Skipped;
        }

        match backup.backup_current().await {
            Ok(()) => {
                self.log.log("New model was backed up to the cloud");
                BackupOutcome::Succeeded
            }
            Err(e) => {
                warn!(error = %e, "Backup after training failed");
                self.log.log(&format!("Backup of the new model failed: {e}"));
                BackupOutcome::Failed(e.to_string())
            }
        }
    }
}
