//! Transport seam between the version store and the backup service.
//!
//! The service exposes three endpoints, all authenticated with a shared
//! `apiKey` query parameter:
//!
//! | action | request | statuses |
//! |---|---|---|
//! | backup | `POST /backupModel?apiKey=&modelId=` + blob | 200/201 ok, 401 bad key, 400 storage failure |
//! | restore | `GET /restoreModel?apiKey=&modelId=` | 200 + blob, 404 not found |
//! | rename | `PUT /changeModelId?apiKey=&oldId=&newId=` | 200 ok, 403 destination exists, 404 source missing, 400 failure |

use crate::error::RemoteError;
use async_trait::async_trait;

/// Raw answer of the backup service. Status interpretation is left to the
/// version store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self { status, body: Vec::new() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn backup_model(&self, model_id: &str, blob: Vec<u8>) -> Result<RemoteResponse, RemoteError>;

    async fn restore_model(&self, model_id: &str) -> Result<RemoteResponse, RemoteError>;

    async fn change_model_id(&self, old_id: &str, new_id: &str) -> Result<RemoteResponse, RemoteError>;
}

/// Stands in when no backup service is configured. Every request fails at
/// the transport level, so local operations keep working.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

impl OfflineRemote {
    fn unavailable() -> RemoteError {
        RemoteError("no backup service configured".to_string())
    }
}

#[async_trait]
impl RemoteStore for OfflineRemote {
    async fn backup_model(&self, _model_id: &str, _blob: Vec<u8>) -> Result<RemoteResponse, RemoteError> {
        Err(Self::unavailable())
    }

    async fn restore_model(&self, _model_id: &str) -> Result<RemoteResponse, RemoteError> {
        Err(Self::unavailable())
    }

    async fn change_model_id(&self, _old_id: &str, _new_id: &str) -> Result<RemoteResponse, RemoteError> {
        Err(Self::unavailable())
    }
}
