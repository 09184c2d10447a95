//! Key-value settings collaborator.
//!
//! Each key has one owning component: `FinalLossOfLastTraining` belongs to the
//! training orchestrator, `ModelId` and `ModelBackupEnabled` to the version
//! store, `DataAugmentationEnabled` to the session.

use crate::CapabilityResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// Known settings keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    #[serde(rename = "finalLossOfLastTraining")]
    FinalLossOfLastTraining,
    #[serde(rename = "modelId")]
    ModelId,
    #[serde(rename = "modelBackupEnabled")]
    ModelBackupEnabled,
    #[serde(rename = "dataAugmentationEnabled")]
    DataAugmentationEnabled,
}

impl SettingKey {
    pub const ALL: [Self; 4] = [
        Self::FinalLossOfLastTraining,
        Self::ModelId,
        Self::ModelBackupEnabled,
        Self::DataAugmentationEnabled,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinalLossOfLastTraining => "finalLossOfLastTraining",
            Self::ModelId => "modelId",
            Self::ModelBackupEnabled => "modelBackupEnabled",
            Self::DataAugmentationEnabled => "dataAugmentationEnabled",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An "On"/"Off" preference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
        }
    }

    #[must_use]
    pub fn is_on(&self) -> bool {
        *self == Self::On
    }

    #[must_use]
    pub fn flipped(&self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(Self::On),
            "off" | "false" | "0" => Ok(Self::Off),
            other => Err(format!("expected On or Off, got '{other}'")),
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String key-value store shared by the components.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: SettingKey) -> Option<String>;

    fn set(&self, key: SettingKey, value: &str) -> CapabilityResult<()>;

    fn remove(&self, key: SettingKey) -> CapabilityResult<()>;

    /// Reads a toggle; a missing or unparseable value reads as `None`.
    fn toggle(&self, key: SettingKey) -> Option<Toggle> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    fn set_toggle(&self, key: SettingKey, value: Toggle) -> CapabilityResult<()> {
        self.set(key, value.as_str())
    }

    fn is_enabled(&self, key: SettingKey) -> bool {
        self.toggle(key).is_some_and(|t| t.is_on())
    }
}

/// In-memory settings, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<SettingKey, String>>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: SettingKey) -> Option<String> {
        self.values.read().ok().and_then(|v| v.get(&key).cloned())
    }

    fn set(&self, key: SettingKey, value: &str) -> CapabilityResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| crate::CapabilityError::Settings("settings lock poisoned".to_string()))?;
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SettingKey) -> CapabilityResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| crate::CapabilityError::Settings("settings lock poisoned".to_string()))?;
        values.remove(&key);
        Ok(())
    }
}
