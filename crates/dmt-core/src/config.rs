//! Configuration file support.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Global config (`~/.dmt/config.toml`)
//! 2. Local config (`./.dmtrc`)
//! 3. An explicit `--config` file
//! 4. Environment (`DMT_API_KEY`, `DMT_BASE_URL`, `DMT_DATA_DIR`)
//!
//! Command-line flags are applied on top by the binary.

use crate::error::{CoreError, CoreResult};
use dmt_abstraction::UpdateConfig;
use dmt_data::{ColumnLayout, PipelineOptions, VocabularyScope};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_EPOCHS: u32 = 500;
pub const DEFAULT_TRAIN_PERCENTAGE: f64 = 0.8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DATASET_FILE: &str = "housing.csv";
const BASELINE_FILE: &str = "housing_model.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub epochs: Option<u32>,
    #[serde(default)]
    pub train_percentage: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub vocabulary_scope: Option<VocabularyScope>,
    #[serde(default)]
    pub learning_rate: Option<f64>,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnsConfig {
    #[serde(default)]
    pub categorical: Option<[usize; 2]>,
    #[serde(default)]
    pub numerical: Option<Vec<usize>>,
}

/// Merged configuration. Every field is optional so that layers can be
/// stacked; resolved values come from the accessor methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DmtConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub dataset_path: Option<PathBuf>,
    #[serde(default)]
    pub baseline_artifact: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
}

fn home_dir() -> PathBuf {
    std::env::var("HOME").map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

impl DmtConfig {
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save_to_file(&self, path: &Path) -> CoreResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(format!("Failed to serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn default_global_path() -> PathBuf {
        home_dir().join(".dmt").join("config.toml")
    }

    #[must_use]
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".dmtrc")
    }

    /// Loads every configuration layer. A missing global or local file is
    /// skipped; a missing or malformed explicit file is an error.
    pub fn discover_and_load(explicit: Option<&Path>) -> CoreResult<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            if path.is_file() {
                config.merge(&Self::load_from_file(&path)?);
            }
        }
        if let Some(path) = explicit {
            config.merge(&Self::load_from_file(path)?);
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Values set in `other` override values in `self`.
    pub fn merge(&mut self, other: &Self) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(value) = src {
                *dst = Some(value.clone());
            }
        }

        take(&mut self.data_dir, &other.data_dir);
        take(&mut self.dataset_path, &other.dataset_path);
        take(&mut self.baseline_artifact, &other.baseline_artifact);
        take(&mut self.log_level, &other.log_level);

        take(&mut self.remote.base_url, &other.remote.base_url);
        take(&mut self.remote.api_key, &other.remote.api_key);
        take(&mut self.remote.timeout_secs, &other.remote.timeout_secs);

        take(&mut self.training.epochs, &other.training.epochs);
        take(&mut self.training.train_percentage, &other.training.train_percentage);
        take(&mut self.training.seed, &other.training.seed);
        take(&mut self.training.vocabulary_scope, &other.training.vocabulary_scope);
        take(&mut self.training.learning_rate, &other.training.learning_rate);
        take(&mut self.training.batch_size, &other.training.batch_size);

        take(&mut self.columns.categorical, &other.columns.categorical);
        take(&mut self.columns.numerical, &other.columns.numerical);
    }

    /// Applies `DMT_*` variables found through `lookup`.
    pub fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(key) = lookup("DMT_API_KEY") {
            self.remote.api_key = Some(key);
        }
        if let Some(url) = lookup("DMT_BASE_URL") {
            self.remote.base_url = Some(url);
        }
        if let Some(dir) = lookup("DMT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    // Resolved values

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| home_dir().join(".dmt").join("data"))
    }

    #[must_use]
    pub fn dataset_path(&self) -> PathBuf {
        self.dataset_path.clone().unwrap_or_else(|| self.data_dir().join(DATASET_FILE))
    }

    #[must_use]
    pub fn baseline_artifact(&self) -> PathBuf {
        self.baseline_artifact.clone().unwrap_or_else(|| self.data_dir().join("baseline").join(BASELINE_FILE))
    }

    #[must_use]
    pub fn train_percentage(&self) -> f64 {
        self.training.train_percentage.unwrap_or(DEFAULT_TRAIN_PERCENTAGE)
    }

    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn column_layout(&self) -> ColumnLayout {
        let default = ColumnLayout::default();
        ColumnLayout {
            categorical: self.columns.categorical.unwrap_or(default.categorical),
            numerical: self.columns.numerical.clone().unwrap_or(default.numerical),
        }
    }

    /// Pipeline options at the given ratio.
    pub fn pipeline_options(&self, train_percentage: f64) -> CoreResult<PipelineOptions> {
        if !(train_percentage > 0.0 && train_percentage < 1.0) {
            return Err(CoreError::Config(format!(
                "train percentage must be between 0 and 1 (exclusive), got {train_percentage}"
            )));
        }
        Ok(PipelineOptions {
            train_percentage,
            seed: self.training.seed,
            vocabulary_scope: self.training.vocabulary_scope.unwrap_or_default(),
            columns: self.column_layout(),
        })
    }

    #[must_use]
    pub fn update_config(&self) -> UpdateConfig {
        UpdateConfig {
            epochs: self.training.epochs.unwrap_or(DEFAULT_EPOCHS),
            learning_rate: self.training.learning_rate,
            batch_size: self.training.batch_size,
        }
    }
}
