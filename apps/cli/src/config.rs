//! CLI configuration loading and merging.

use anyhow::Context;
use dmt_core::DmtConfig;
use std::path::{Path, PathBuf};

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. CLI arguments
/// 2. Environment variables
/// 3. Explicit `--config` file
/// 4. Local config file (./.dmtrc)
/// 5. Global config file (~/.dmt/config.toml)
/// 6. Defaults
pub fn load_config(explicit: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<DmtConfig> {
    let mut config = DmtConfig::discover_and_load(explicit).context("Failed to load configuration")?;
    if data_dir.is_some() {
        config.data_dir = data_dir;
    }
    Ok(config)
}

/// Applies a `--seed` flag.
pub fn with_seed(mut config: DmtConfig, seed: Option<u64>) -> DmtConfig {
    if seed.is_some() {
        config.training.seed = seed;
    }
    config
}
