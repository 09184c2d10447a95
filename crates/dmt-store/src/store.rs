//! Model version store: local artifact lifecycle plus remote
//! backup, restore and rename.

use crate::error::{FailureCause, StoreError, StoreResult};
use crate::package::{pack_artifact, unpack_artifact};
use crate::remote::{RemoteResponse, RemoteStore};
use async_trait::async_trait;
use dmt_abstraction::{
    copy_artifact, remove_artifact, replace_artifact, ArtifactLayout, BackupTrigger, LogSink,
    SettingKey, SettingsStore, Toggle,
};
use serde::{Deserialize, Serialize};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreAction {
    Backup,
    Restore,
    ChangeId,
}

/// Published on the store's event stream.
///
/// Every remote action emits `ActivityChanged { busy: true }`, then exactly
/// one of `Completed` or `Failed`, then `ActivityChanged { busy: false }`.
/// A cancelled action only emits the final `ActivityChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    ActivityChanged { busy: bool },
    Completed { action: StoreAction },
    Failed { action: StoreAction, reason: String },
}

/// Clears the busy flag when an action ends or its future is dropped.
struct BusyGuard<'a> {
    store: &'a ModelVersionStore,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.store.busy.store(false, Ordering::SeqCst);
        let _ = self.store.events.send(StoreEvent::ActivityChanged { busy: false });
    }
}

pub struct ModelVersionStore {
    layout: ArtifactLayout,
    settings: Arc<dyn SettingsStore>,
    remote: Arc<dyn RemoteStore>,
    log: Arc<dyn LogSink>,
    model_id: RwLock<String>,
    busy: AtomicBool,
    events: broadcast::Sender<StoreEvent>,
}

impl ModelVersionStore {
    /// Opens the store, generating and persisting a model id on first use.
    /// A freshly generated id also switches the backup preference on.
    pub fn new(
        layout: ArtifactLayout,
        settings: Arc<dyn SettingsStore>,
        remote: Arc<dyn RemoteStore>,
        log: Arc<dyn LogSink>,
    ) -> StoreResult<Self> {
        let model_id = match settings.get(SettingKey::ModelId).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                settings.set(SettingKey::ModelId, &id)?;
                settings.set_toggle(SettingKey::ModelBackupEnabled, Toggle::On)?;
                info!(model_id = %id, "Generated model id");
                id
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            layout,
            settings,
            remote,
            log,
            model_id: RwLock::new(model_id),
            busy: AtomicBool::new(false),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn model_id(&self) -> String {
        self.model_id.read().map(|id| id.clone()).unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn backup_enabled(&self) -> bool {
        self.settings.is_enabled(SettingKey::ModelBackupEnabled)
    }

    pub fn set_backup_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.settings.set_toggle(SettingKey::ModelBackupEnabled, Toggle::from(enabled))?;
        Ok(())
    }

    // Local lifecycle

    /// Copies the bundled baseline to the updatable path if nothing is there.
    /// Returns whether a copy was made.
    pub fn install_default_if_absent(&self) -> StoreResult<bool> {
        let canonical = self.layout.updatable_path();
        if canonical.exists() {
            return Ok(false);
        }

        let staging = self.layout.staging_dir()?;
        let staged = self.layout.staged_artifact_path(&staging);
        copy_artifact(self.layout.baseline_path(), &staged)?;
        replace_artifact(&staged, &canonical)?;
        debug!(path = %canonical.display(), "Installed baseline copy");
        Ok(true)
    }

    /// Deletes the updatable artifact. Returns whether anything was removed.
    pub fn remove_updatable(&self) -> StoreResult<bool> {
        let removed = remove_artifact(&self.layout.updatable_path())?;
        if removed {
            debug!("Removed updatable artifact");
        }
        Ok(removed)
    }

    /// Compresses the updatable artifact into a single transport blob.
    pub fn package_artifact(&self) -> StoreResult<Vec<u8>> {
        let canonical = self.layout.updatable_path();
        if !canonical.exists() {
            return Err(StoreError::MissingArtifact(canonical.display().to_string()));
        }
        Ok(pack_artifact(&canonical, Path::new(self.layout.artifact_name()))?)
    }

    // Remote protocol

    fn begin(&self) -> StoreResult<BusyGuard<'_>> {
        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(StoreError::OperationInProgress);
        }
        let _ = self.events.send(StoreEvent::ActivityChanged { busy: true });
        Ok(BusyGuard { store: self })
    }

    fn finish(&self, action: StoreAction, result: StoreResult<()>) -> StoreResult<()> {
        match &result {
            Ok(()) => {
                let _ = self.events.send(StoreEvent::Completed { action });
            }
            Err(e) => {
                warn!(?action, error = %e, "Model store action failed");
                self.log.log(&e.to_string());
                let _ = self.events.send(StoreEvent::Failed { action, reason: e.to_string() });
            }
        }
        result
    }

    /// Packages the updatable artifact and uploads it under the current id.
    pub async fn backup(&self) -> StoreResult<()> {
        let _guard = self.begin()?;
        let model_id = self.model_id();
        let result = match self.package_artifact() {
            Ok(blob) => self.upload(&model_id, blob).await,
            Err(e) => Err(e),
        };
        self.finish(StoreAction::Backup, result)
    }

    /// Uploads `blob` under `model_id`.
    pub async fn backup_model(&self, model_id: &str, blob: Vec<u8>) -> StoreResult<()> {
        let _guard = self.begin()?;
        let result = self.upload(model_id, blob).await;
        self.finish(StoreAction::Backup, result)
    }

    async fn upload(&self, model_id: &str, blob: Vec<u8>) -> StoreResult<()> {
        let bytes = blob.len();
        let response = self
            .remote
            .backup_model(model_id, blob)
            .await
            .map_err(|e| StoreError::BackupFailed(FailureCause::Transport(e.0)))?;

        if !response.is_success() {
            return Err(StoreError::BackupFailed(FailureCause::Status(response.status)));
        }
        info!(model_id, bytes, "Model backed up");
        self.log.log("Model was backed up to the cloud");
        Ok(())
    }

    /// Replaces the updatable artifact with the remote backup of `model_id`.
    pub async fn restore(&self, model_id: &str) -> StoreResult<()> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(StoreError::InvalidModelId("model id is empty".to_string()));
        }

        let _guard = self.begin()?;
        let result = self.download(model_id).await;
        self.finish(StoreAction::Restore, result)
    }

    async fn download(&self, model_id: &str) -> StoreResult<()> {
        let response = self
            .remote
            .restore_model(model_id)
            .await
            .map_err(|e| StoreError::RestoreFailed(FailureCause::Transport(e.0)))?;

        match response {
            RemoteResponse { status: 200, body } if body.is_empty() => {
                Err(StoreError::RestoreFailed(FailureCause::EmptyBody))
            }
            RemoteResponse { status: 200, body } => {
                self.install_blob(&body)?;
                info!(model_id, bytes = body.len(), "Model restored");
                self.log.log("Model was restored from the cloud");
                Ok(())
            }
            RemoteResponse { status: 404, .. } => Err(StoreError::NotFound),
            RemoteResponse { status, .. } => Err(StoreError::RestoreFailed(FailureCause::Status(status))),
        }
    }

    /// Writes the blob to a temp file, unpacks it into a staging directory
    /// and moves the artifact into place. The temp file goes away once the
    /// artifact is installed.
    fn install_blob(&self, blob: &[u8]) -> StoreResult<()> {
        self.layout.ensure_dirs()?;
        let mut archive = tempfile::Builder::new()
            .prefix(".restore-")
            .suffix(".tar.gz")
            .tempfile_in(self.layout.root())?;
        archive.write_all(blob)?;
        archive.flush()?;
        archive.as_file_mut().seek(SeekFrom::Start(0))?;

        let staging = self.layout.staging_dir()?;
        unpack_artifact(archive.as_file(), staging.path())?;

        let staged = self.layout.staged_artifact_path(&staging);
        if !staged.exists() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("backup does not contain {}", self.layout.artifact_name().to_string_lossy()),
            )));
        }
        replace_artifact(&staged, &self.layout.updatable_path())?;
        archive.close()?;
        Ok(())
    }

    /// Moves the remote backup of the current id to `new_id` and adopts it.
    pub async fn rename(&self, new_id: &str) -> StoreResult<()> {
        let old_id = self.model_id();
        self.change_id(&old_id, new_id).await
    }

    /// Moves the remote backup of `old_id` to `new_id`.
    ///
    /// If `old_id` has no backup yet and `new_id` is free, the local artifact
    /// is uploaded under `old_id` first and the rename is retried once. An
    /// occupied `new_id` is a conflict before anything is uploaded. The destination check
    /// and the move are not atomic against another client renaming onto the
    /// same id.
    pub async fn change_id(&self, old_id: &str, new_id: &str) -> StoreResult<()> {
        let new_id = new_id.trim();
        if new_id.is_empty() {
            return Err(StoreError::InvalidModelId("new model id is empty".to_string()));
        }
        if new_id == old_id {
            return Err(StoreError::InvalidModelId(format!("model id is already '{new_id}'")));
        }

        let _guard = self.begin()?;
        let result = self.move_backup(old_id, new_id).await;
        self.finish(StoreAction::ChangeId, result)
    }

    async fn move_backup(&self, old_id: &str, new_id: &str) -> StoreResult<()> {
        let mut backed_up = false;
        loop {
            let response = self
                .remote
                .change_model_id(old_id, new_id)
                .await
                .map_err(|e| StoreError::RenameFailed(FailureCause::Transport(e.0)))?;

            match response.status {
                200 => break,
                403 => return Err(StoreError::RenameConflict),
                404 if !backed_up => {
                    // The backend may report a missing source before it looks
                    // at the destination, so check it before writing `old_id`.
                    self.ensure_destination_free(new_id).await?;
                    debug!(old_id, "No remote backup for old id, uploading before rename");
                    let blob = self.package_artifact()?;
                    self.upload(old_id, blob).await?;
                    backed_up = true;
                }
                status => return Err(StoreError::RenameFailed(FailureCause::Status(status))),
            }
        }

        if self.model_id() == old_id {
            self.settings.set(SettingKey::ModelId, new_id)?;
            if let Ok(mut id) = self.model_id.write() {
                *id = new_id.to_string();
            }
        }
        info!(old_id, new_id, "Model id changed");
        self.log.log(&format!("Model id changed to {new_id}"));
        Ok(())
    }

    async fn ensure_destination_free(&self, new_id: &str) -> StoreResult<()> {
        let response = self
            .remote
            .restore_model(new_id)
            .await
            .map_err(|e| StoreError::RenameFailed(FailureCause::Transport(e.0)))?;

        match response.status {
            200 => Err(StoreError::RenameConflict),
            404 => Ok(()),
            status => Err(StoreError::RenameFailed(FailureCause::Status(status))),
        }
    }
}

#[async_trait]
impl BackupTrigger for ModelVersionStore {
    async fn backup_current(&self) -> anyhow::Result<()> {
        self.backup().await?;
        Ok(())
    }
}
