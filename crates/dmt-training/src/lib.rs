//! DMT Training
//!
//! Drives an opaque incremental `Trainer` over a prepared batch and scores the
//! result against the frozen baseline:
//! - `TrainingOrchestrator`: run state machine, ordered progress events,
//!   atomic artifact replacement, post-training backup
//! - `MetricsEvaluator`: MAE/RMSE on the test fold, single-sample inference

pub mod batch;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod progress;

pub use batch::prepare_batch;
pub use error::{TrainingError, TrainingResult};
pub use metrics::{mae, rmse, FinalMetrics, InferenceItem, MetricsEvaluator};
pub use orchestrator::{BackupOutcome, TrainingOrchestrator, TrainingState, TrainingSummary};
pub use progress::{should_log_epoch, TrainingEvent, TrainingMetrics};
