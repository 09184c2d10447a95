//! Command implementations for the DMT CLI.

pub mod backup;
pub mod evaluate;
pub mod infer;
pub mod init;
pub mod prepare;
pub mod rename;
pub mod reset;
pub mod restore;
pub mod settings;
pub mod train;
pub mod types;

pub use types::{AugmentationAction, SettingsCommand};

use crate::output;
use anyhow::Context;
use dmt_core::{AppContext, DmtConfig, JitterAugmenter, LinearRegressor, Session};
use std::sync::Arc;

/// Perturbation applied to standardized features when augmentation is on.
const JITTER_SCALE: f32 = 0.05;

/// Opens a session over the configured data directory with the linear
/// backend. The augmenter is attached but only used while the
/// data-augmentation preference is on.
pub fn open_session(config: DmtConfig, json: bool) -> anyhow::Result<Session<LinearRegressor>> {
    let seed = config.training.seed;
    let ctx = AppContext::open(config, output::activity_log(json)).context("Failed to open data directory")?;
    let session = Session::open(ctx, LinearRegressor)
        .context("Failed to open session. Run `dmt init` first.")?
        .with_augmenter(Arc::new(JitterAugmenter::new(JITTER_SCALE, seed)));
    Ok(session)
}
