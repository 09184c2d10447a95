use dmt_abstraction::CapabilityError;
use dmt_data::DataError;
use dmt_store::{RemoteError, StoreError};
use dmt_training::TrainingError;
use thiserror::Error;

pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("data has not been prepared yet")]
    NotPrepared,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("backup service: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
