//! DMT Core
//!
//! Wires the data pipeline, training orchestrator and version store into a
//! `Session`, driven by a layered TOML configuration and a file-backed
//! settings store. Ships a small linear regressor as the reference backend.

pub mod config;
pub mod context;
pub mod error;
pub mod linear;
pub mod session;
pub mod settings;

pub use config::{
    ColumnsConfig, DmtConfig, RemoteConfig, TrainingConfig, DEFAULT_EPOCHS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TRAIN_PERCENTAGE,
};
pub use context::AppContext;
pub use error::{CoreError, CoreResult};
pub use linear::{JitterAugmenter, LinearModel, LinearRegressor};
pub use session::{Session, TrainingReport};
pub use settings::{FileSettings, SETTINGS_FILE};
