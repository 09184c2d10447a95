use dmt_abstraction::CapabilityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Why a remote action did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    /// The backend answered with an unexpected status code.
    Status(u16),
    /// The request never produced a response.
    Transport(String),
    /// The backend answered 200 without a payload.
    EmptyBody,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "status {code}"),
            Self::Transport(reason) => write!(f, "transport error: {reason}"),
            Self::EmptyBody => f.write_str("empty response body"),
        }
    }
}

/// Transport-level failure of a `RemoteStore` request.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RemoteError(pub String);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("another backup, restore or rename is in progress")]
    OperationInProgress,

    #[error("backup failed: {0}")]
    BackupFailed(FailureCause),

    #[error("restore failed: {0}")]
    RestoreFailed(FailureCause),

    #[error("no remote backup exists for this model id")]
    NotFound,

    #[error("a model with this id already exists")]
    RenameConflict,

    #[error("rename failed: {0}")]
    RenameFailed(FailureCause),

    #[error("invalid model id: {0}")]
    InvalidModelId(String),

    #[error("no updatable model at {0}")]
    MissingArtifact(String),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
