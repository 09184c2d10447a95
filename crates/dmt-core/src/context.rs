//! Explicit application context, built once at startup and passed to the
//! components that need it.

use crate::config::DmtConfig;
use crate::error::{CoreError, CoreResult};
use crate::settings::{FileSettings, SETTINGS_FILE};
use dmt_abstraction::{ArtifactLayout, LogSink, SettingsStore};
use dmt_store::{HttpRemoteStore, ModelVersionStore, RemoteStore};
use dmt_training::TrainingOrchestrator;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct AppContext {
    config: DmtConfig,
    settings: Arc<dyn SettingsStore>,
    layout: ArtifactLayout,
    log: Arc<dyn LogSink>,
}

impl AppContext {
    /// Creates the data directory if needed and opens the settings file in it.
    pub fn open(config: DmtConfig, log: Arc<dyn LogSink>) -> CoreResult<Self> {
        let data_dir = config.data_dir();
        std::fs::create_dir_all(&data_dir)?;
        let settings = Arc::new(FileSettings::open(data_dir.join(SETTINGS_FILE))?);
        debug!(data_dir = %data_dir.display(), "Opened application context");
        Ok(Self::with_settings(config, settings, log))
    }

    #[must_use]
    pub fn with_settings(config: DmtConfig, settings: Arc<dyn SettingsStore>, log: Arc<dyn LogSink>) -> Self {
        let layout = ArtifactLayout::for_data_dir(&config.data_dir(), config.baseline_artifact());
        Self { config, settings, layout, log }
    }

    #[must_use]
    pub fn config(&self) -> &DmtConfig {
        &self.config
    }

    #[must_use]
    pub fn data_dir(&self) -> std::path::PathBuf {
        self.config.data_dir()
    }

    #[must_use]
    pub fn settings(&self) -> Arc<dyn SettingsStore> {
        self.settings.clone()
    }

    #[must_use]
    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    #[must_use]
    pub fn log(&self) -> Arc<dyn LogSink> {
        self.log.clone()
    }

    #[must_use]
    pub fn dataset_path(&self) -> std::path::PathBuf {
        self.config.dataset_path()
    }

    #[must_use]
    pub fn baseline_path(&self) -> &Path {
        self.layout.baseline_path()
    }

    /// The configured backup service, if any.
    pub fn remote(&self) -> CoreResult<Option<Arc<dyn RemoteStore>>> {
        let Some(base_url) = &self.config.remote.base_url else {
            return Ok(None);
        };
        let api_key = self
            .config
            .remote
            .api_key
            .as_deref()
            .ok_or_else(|| CoreError::Config("remote.api_key (or DMT_API_KEY) is required with a base_url".to_string()))?;
        let remote = HttpRemoteStore::new(base_url, api_key, self.config.remote_timeout())?;
        Ok(Some(Arc::new(remote)))
    }

    pub fn version_store(&self, remote: Arc<dyn RemoteStore>) -> CoreResult<ModelVersionStore> {
        Ok(ModelVersionStore::new(self.layout.clone(), self.settings.clone(), remote, self.log.clone())?)
    }

    #[must_use]
    pub fn orchestrator(&self) -> TrainingOrchestrator {
        TrainingOrchestrator::new(self.layout.clone(), self.settings.clone(), self.log.clone())
    }
}
