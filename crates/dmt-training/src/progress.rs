use dmt_abstraction::{LogSink, ProgressSink, TrainerEvent};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events published by the orchestrator for one training run.
///
/// Order per run: `TrainingBegin`, then per epoch `MiniBatchEnd*` and one
/// `EpochEnd` with strictly increasing index, then exactly one of
/// `Completed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingEvent {
    TrainingBegin,
    MiniBatchEnd { batch_index: usize, loss: f64 },
    EpochEnd { epoch_index: u32, loss: f64, total_loss: f64 },
    Completed { final_loss: f64, total_loss: f64 },
    Failed { reason: String },
}

impl TrainingEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Running loss accumulator for one training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub total_loss: f64,
    pub epochs_completed: u32,
    pub last_epoch_loss: Option<f64>,
}

/// Only the first epoch, every tenth epoch and the final epoch reach the
/// activity log.
#[must_use]
pub fn should_log_epoch(epoch_index: u32, epochs: u32) -> bool {
    epoch_index == 0 || epoch_index % 10 == 0 || epoch_index + 1 == epochs
}

#[derive(Debug, Default)]
struct RunState {
    began: bool,
    last_epoch: Option<u32>,
    metrics: TrainingMetrics,
}

/// Progress sink handed to the trainer for a single run.
///
/// Re-publishes trainer events on the orchestrator's channel, enforces the
/// event order, and accumulates `total_loss += epoch_loss`.
pub(crate) struct RunProgress {
    events: broadcast::Sender<TrainingEvent>,
    log: Arc<dyn LogSink>,
    epochs: u32,
    state: Mutex<RunState>,
}

impl RunProgress {
    pub(crate) fn new(events: broadcast::Sender<TrainingEvent>, log: Arc<dyn LogSink>, epochs: u32) -> Self {
        Self { events, log, epochs, state: Mutex::new(RunState::default()) }
    }

    pub(crate) fn metrics(&self) -> TrainingMetrics {
        self.state.lock().map(|s| s.metrics.clone()).unwrap_or_default()
    }

    pub(crate) fn ensure_begun(&self) {
        if let Ok(mut state) = self.state.lock() {
            self.begin(&mut state);
        }
    }

    fn begin(&self, state: &mut RunState) {
        if !state.began {
            state.began = true;
            let _ = self.events.send(TrainingEvent::TrainingBegin);
        }
    }
}

impl ProgressSink for RunProgress {
    fn on_event(&self, event: TrainerEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        match event {
            TrainerEvent::TrainingBegin => {
                if state.began {
                    debug!("Ignoring repeated trainingBegin");
                }
                self.begin(&mut state);
            }
            TrainerEvent::MiniBatchEnd { batch_index, loss } => {
                self.begin(&mut state);
                let _ = self.events.send(TrainingEvent::MiniBatchEnd { batch_index, loss });
            }
            TrainerEvent::EpochEnd { epoch_index, loss } => {
                self.begin(&mut state);
                if state.last_epoch.is_some_and(|last| epoch_index <= last) {
                    warn!(
                        epoch_index,
                        last = ?state.last_epoch,
                        "Dropping out-of-order epochEnd from trainer"
                    );
                    return;
                }
                state.last_epoch = Some(epoch_index);
                state.metrics.total_loss += loss;
                state.metrics.epochs_completed += 1;
                state.metrics.last_epoch_loss = Some(loss);

                debug!(epoch_index, loss, "Epoch end");
                if should_log_epoch(epoch_index, self.epochs) {
                    self.log.log(&format!("Epoch {epoch_index} end with loss {loss}"));
                }
                let _ = self.events.send(TrainingEvent::EpochEnd {
                    epoch_index,
                    loss,
                    total_loss: state.metrics.total_loss,
                });
            }
        }
    }
}
