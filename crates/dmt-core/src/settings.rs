//! JSON-file backed `SettingsStore`.

use dmt_abstraction::{CapabilityError, CapabilityResult, SettingKey, SettingsStore};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.json";

/// Settings persisted as a flat JSON object keyed by setting name.
///
/// Every write rewrites the whole file through a temp file and a rename.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Opens `path`, starting empty if it does not exist. A corrupt file is
    /// reported and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> CapabilityResult<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F: FnOnce(&mut BTreeMap<String, String>)>(&self, f: F) -> CapabilityResult<()> {
        let mut values =
            self.values.lock().map_err(|_| CapabilityError::Settings("settings lock poisoned".to_string()))?;
        f(&mut values);

        let json = serde_json::to_string_pretty(&*values)
            .map_err(|e| CapabilityError::Settings(format!("Failed to serialize settings: {e}")))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values.lock().ok().and_then(|v| v.get(key.as_str()).cloned())
    }

    fn set(&self, key: SettingKey, value: &str) -> CapabilityResult<()> {
        self.update(|values| {
            values.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: SettingKey) -> CapabilityResult<()> {
        self.update(|values| {
            values.remove(key.as_str());
        })
    }
}
