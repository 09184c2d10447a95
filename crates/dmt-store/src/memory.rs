//! In-process emulation of the backup service.

use crate::error::RemoteError;
use crate::remote::{RemoteResponse, RemoteStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps backups in a map keyed by model id and answers with the backend's
/// status codes, including `401` when the client key does not match.
///
/// A rename checks the source first, so renaming a missing id onto an
/// existing one is `404`, not `403`.
#[derive(Debug)]
pub struct InMemoryRemote {
    secret: String,
    client_key: String,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    requests: AtomicUsize,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        Self::with_keys(api_key, api_key)
    }

    /// Backend holding `secret`, called by a client presenting `client_key`.
    #[must_use]
    pub fn with_keys(secret: &str, client_key: &str) -> Self {
        Self {
            secret: secret.to_string(),
            client_key: client_key.to_string(),
            blobs: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, model_id: &str, blob: Vec<u8>) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(model_id.to_string(), blob);
        }
    }

    pub fn blob(&self, model_id: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok().and_then(|b| b.get(model_id).cloned())
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.blobs.lock().is_ok_and(|b| b.contains_key(model_id))
    }

    /// Number of requests received, authorized or not.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn authorize(&self) -> Result<(), RemoteResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.client_key == self.secret { Ok(()) } else { Err(RemoteResponse::status(401)) }
    }

    fn blobs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>, RemoteError> {
        self.blobs.lock().map_err(|_| RemoteError("backup map lock poisoned".to_string()))
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn backup_model(&self, model_id: &str, blob: Vec<u8>) -> Result<RemoteResponse, RemoteError> {
        if let Err(denied) = self.authorize() {
            return Ok(denied);
        }
        if model_id.is_empty() {
            return Ok(RemoteResponse::status(400));
        }
        self.blobs()?.insert(model_id.to_string(), blob);
        Ok(RemoteResponse::status(201))
    }

    async fn restore_model(&self, model_id: &str) -> Result<RemoteResponse, RemoteError> {
        if let Err(denied) = self.authorize() {
            return Ok(denied);
        }
        Ok(match self.blobs()?.get(model_id) {
            Some(blob) => RemoteResponse { status: 200, body: blob.clone() },
            None => RemoteResponse::status(404),
        })
    }

    async fn change_model_id(&self, old_id: &str, new_id: &str) -> Result<RemoteResponse, RemoteError> {
        if let Err(denied) = self.authorize() {
            return Ok(denied);
        }
        let mut blobs = self.blobs()?;
        if !blobs.contains_key(old_id) {
            return Ok(RemoteResponse::status(404));
        }
        if blobs.contains_key(new_id) {
            return Ok(RemoteResponse::status(403));
        }
        if let Some(blob) = blobs.remove(old_id) {
            blobs.insert(new_id.to_string(), blob);
        }
        Ok(RemoteResponse::status(200))
    }
}
