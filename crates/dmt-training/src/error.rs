use dmt_abstraction::CapabilityError;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("a training run is already in progress")]
    OperationInProgress,

    #[error("training failed: {0}")]
    TrainingFailed(String),

    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("test fold is empty")]
    EmptyFold,

    #[error("sample {sample} is out of range (1..={len})")]
    SampleOutOfRange { sample: usize, len: usize },

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
