//! Integration tests for the training run lifecycle.

use async_trait::async_trait;
use dmt_abstraction::{
    ArtifactLayout, BackupTrigger, CapabilityError, CapabilityResult, DataAugmenter, LabeledExample,
    MemoryLogSink, MemorySettings, ProgressSink, SettingKey, SettingsStore, Toggle, Trainer,
    TrainerEvent, UpdateConfig, UpdateOutcome,
};
use dmt_data::Fold;
use dmt_training::{
    BackupOutcome, TrainingError, TrainingEvent, TrainingOrchestrator, TrainingState,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Artifact is a text file holding a single bias value; each epoch adds one.
#[derive(Default)]
struct BiasTrainer {
    fail_with: Option<String>,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Trainer for BiasTrainer {
    type Handle = f64;

    fn id(&self) -> &'static str {
        "bias"
    }

    async fn load(&self, path: &Path) -> CapabilityResult<f64> {
        let text = tokio::fs::read_to_string(path).await?;
        text.trim().parse().map_err(|e| CapabilityError::Trainer(format!("{e}")))
    }

    async fn update(
        &self,
        handle: &f64,
        batch: &[LabeledExample],
        config: &UpdateConfig,
        progress: &dyn ProgressSink,
    ) -> UpdateOutcome<f64> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        progress.on_event(TrainerEvent::TrainingBegin);
        let mut loss = 0.0;
        for epoch in 0..config.epochs {
            for batch_index in 0..batch.len() {
                progress.on_event(TrainerEvent::MiniBatchEnd { batch_index, loss: 1.0 });
            }
            loss = 1.0 / f64::from(epoch + 1);
            progress.on_event(TrainerEvent::EpochEnd { epoch_index: epoch, loss });
        }
        match &self.fail_with {
            Some(reason) => UpdateOutcome::Failed { reason: reason.clone() },
            None => UpdateOutcome::Completed { model: handle + f64::from(config.epochs), final_loss: loss },
        }
    }

    async fn save(&self, handle: &f64, path: &Path) -> CapabilityResult<()> {
        tokio::fs::write(path, handle.to_string()).await?;
        Ok(())
    }
}

#[derive(Default)]
struct CountingBackup {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl BackupTrigger for CountingBackup {
    async fn backup_current(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("remote unreachable");
        }
        Ok(())
    }
}

struct Duplicate;

impl DataAugmenter for Duplicate {
    fn augment(&self, example: &LabeledExample) -> Vec<LabeledExample> {
        vec![example.clone()]
    }
}

struct Fixture {
    _temp: TempDir,
    layout: ArtifactLayout,
    settings: Arc<MemorySettings>,
    log: Arc<MemoryLogSink>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let layout = ArtifactLayout::for_data_dir(temp.path(), PathBuf::from("/bundle/bias.txt"));
        layout.ensure_dirs().unwrap();
        std::fs::write(layout.updatable_path(), "1").unwrap();
        Self {
            _temp: temp,
            layout,
            settings: Arc::new(MemorySettings::new()),
            log: Arc::new(MemoryLogSink::new()),
        }
    }

    fn orchestrator(&self) -> TrainingOrchestrator {
        TrainingOrchestrator::new(self.layout.clone(), self.settings.clone(), self.log.clone())
    }

    fn stored(&self) -> String {
        std::fs::read_to_string(self.layout.updatable_path()).unwrap()
    }
}

fn batch() -> Vec<LabeledExample> {
    vec![
        LabeledExample::new(vec![0.5, -0.5], 0, 1, 21.0),
        LabeledExample::new(vec![-1.0, 1.0], 1, 0, 24.5),
    ]
}

fn config(epochs: u32) -> UpdateConfig {
    UpdateConfig { epochs, ..UpdateConfig::default() }
}

#[tokio::test]
async fn test_successful_run_replaces_artifact() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    assert_eq!(orchestrator.state(), TrainingState::Idle);

    let summary = orchestrator.train(&BiasTrainer::default(), &batch(), &config(4)).await.unwrap();

    assert_eq!(orchestrator.state(), TrainingState::Completed);
    assert_eq!(fx.stored(), "5");
    assert!((summary.final_loss - 0.25).abs() < 1e-12);
    assert!((summary.metrics.total_loss - (1.0 + 0.5 + 1.0 / 3.0 + 0.25)).abs() < 1e-12);
    assert_eq!(summary.metrics.epochs_completed, 4);
    assert_eq!(summary.backup, BackupOutcome::Skipped);
    assert_eq!(fx.settings.get(SettingKey::FinalLossOfLastTraining).as_deref(), Some("0.25"));
    assert!(fx.log.lines().contains(&"Final loss: 0.25".to_string()));

    // No staging leftovers next to the canonical artifact.
    let entries: Vec<_> = std::fs::read_dir(fx.layout.root()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_events_are_ordered() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    let mut rx = orchestrator.subscribe();

    orchestrator.train(&BiasTrainer::default(), &batch(), &config(3)).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&TrainingEvent::TrainingBegin));
    assert!(matches!(events.last(), Some(TrainingEvent::Completed { .. })));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(events.iter().filter(|e| **e == TrainingEvent::TrainingBegin).count(), 1);

    let epochs: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            TrainingEvent::EpochEnd { epoch_index, .. } => Some(*epoch_index),
            _ => None,
        })
        .collect();
    assert_eq!(epochs, vec![0, 1, 2]);

    // Two mini-batches precede every epoch end.
    let mini_batches = events.iter().filter(|e| matches!(e, TrainingEvent::MiniBatchEnd { .. })).count();
    assert_eq!(mini_batches, 6);
}

#[tokio::test]
async fn test_failed_run_keeps_previous_artifact() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    let mut rx = orchestrator.subscribe();
    let trainer = BiasTrainer { fail_with: Some("diverged".to_string()), ..BiasTrainer::default() };

    let err = orchestrator.train(&trainer, &batch(), &config(2)).await.unwrap_err();

    assert!(matches!(err, TrainingError::TrainingFailed(ref reason) if reason == "diverged"));
    assert_eq!(orchestrator.state(), TrainingState::Failed("diverged".to_string()));
    assert_eq!(fx.stored(), "1");
    assert_eq!(fx.settings.get(SettingKey::FinalLossOfLastTraining), None);

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(TrainingEvent::Failed { reason: "diverged".to_string() }));
}

#[tokio::test]
async fn test_missing_artifact_fails_run() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.layout.updatable_path()).unwrap();
    let orchestrator = fx.orchestrator();

    let err = orchestrator.train(&BiasTrainer::default(), &batch(), &config(1)).await.unwrap_err();
    assert!(matches!(err, TrainingError::TrainingFailed(_)));
    assert!(matches!(orchestrator.state(), TrainingState::Failed(_)));
}

#[tokio::test]
async fn test_second_run_is_rejected_while_running() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    let gate = Arc::new(Notify::new());
    let slow = BiasTrainer { gate: Some(gate.clone()), ..BiasTrainer::default() };
    let fast = BiasTrainer::default();
    let examples = batch();
    let config = config(2);

    let (first, second) = tokio::join!(orchestrator.train(&slow, &examples, &config), async {
        tokio::task::yield_now().await;
        let result = orchestrator.train(&fast, &examples, &config).await;
        gate.notify_one();
        result
    });

    assert!(matches!(second, Err(TrainingError::OperationInProgress)));
    assert!(first.is_ok());
    assert_eq!(fx.stored(), "3");
    assert_eq!(orchestrator.state(), TrainingState::Completed);
}

#[tokio::test]
async fn test_dropped_run_publishes_failure() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    let mut rx = orchestrator.subscribe();
    let gated = BiasTrainer { gate: Some(Arc::new(Notify::new())), ..BiasTrainer::default() };

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(100),
        orchestrator.train(&gated, &batch(), &config(2)),
    )
    .await;
    assert!(timed_out.is_err());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events,
        vec![
            TrainingEvent::TrainingBegin,
            TrainingEvent::Failed { reason: "training run was abandoned".to_string() },
        ]
    );
    assert!(matches!(orchestrator.state(), TrainingState::Failed(_)));
    assert_eq!(fx.stored(), "1");

    // The orchestrator accepts a new run afterwards.
    orchestrator.train(&BiasTrainer::default(), &batch(), &config(1)).await.unwrap();
    assert_eq!(fx.stored(), "2");
}

#[tokio::test]
async fn test_zero_epochs_is_rejected_before_running() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    let mut rx = orchestrator.subscribe();

    let err = orchestrator.train(&BiasTrainer::default(), &batch(), &config(0)).await.unwrap_err();

    assert!(matches!(err, TrainingError::InvalidConfig(_)));
    assert_eq!(orchestrator.state(), TrainingState::Idle);
    assert!(rx.try_recv().is_err());
    assert_eq!(fx.settings.get(SettingKey::FinalLossOfLastTraining), None);
    assert_eq!(fx.stored(), "1");
}

#[tokio::test]
async fn test_backup_runs_only_when_enabled() {
    let fx = Fixture::new();
    let backup = Arc::new(CountingBackup::default());
    let orchestrator = fx.orchestrator().with_backup(backup.clone());

    let summary = orchestrator.train(&BiasTrainer::default(), &batch(), &config(1)).await.unwrap();
    assert_eq!(summary.backup, BackupOutcome::Skipped);
    assert_eq!(backup.calls.load(Ordering::SeqCst), 0);

    fx.settings.set_toggle(SettingKey::ModelBackupEnabled, Toggle::On).unwrap();
    let summary = orchestrator.train(&BiasTrainer::default(), &batch(), &config(1)).await.unwrap();
    assert_eq!(summary.backup, BackupOutcome::Succeeded);
    assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_backup_failure_does_not_revert_training() {
    let fx = Fixture::new();
    fx.settings.set_toggle(SettingKey::ModelBackupEnabled, Toggle::On).unwrap();
    let backup = Arc::new(CountingBackup { fail: true, ..CountingBackup::default() });
    let orchestrator = fx.orchestrator().with_backup(backup);

    let summary = orchestrator.train(&BiasTrainer::default(), &batch(), &config(2)).await.unwrap();

    assert!(matches!(summary.backup, BackupOutcome::Failed(ref msg) if msg.contains("unreachable")));
    assert_eq!(orchestrator.state(), TrainingState::Completed);
    assert_eq!(fx.stored(), "3");
}

#[tokio::test]
async fn test_prepare_batch_honours_augmentation_setting() {
    let fx = Fixture::new();
    let orchestrator = fx.orchestrator();
    let fold = Fold {
        numerical: vec![vec![0.1], vec![0.2], vec![0.3]],
        categorical: [vec![0, 1, 0], vec![2, 2, 1]],
        labels: vec![1.0, 2.0, 3.0],
    };

    assert_eq!(orchestrator.prepare_batch(&fold, Some(&Duplicate)).len(), 3);

    fx.settings.set_toggle(SettingKey::DataAugmentationEnabled, Toggle::On).unwrap();
    assert_eq!(orchestrator.prepare_batch(&fold, Some(&Duplicate)).len(), 6);
    assert_eq!(orchestrator.prepare_batch(&fold, None).len(), 3);
}
