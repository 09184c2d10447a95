//! DMT Store
//!
//! Versioning of the updatable model artifact:
//! - local lifecycle (install baseline copy, remove, package)
//! - remote backup, restore and rename through a `RemoteStore`
//! - one remote action at a time, with cancellation by dropping the future

pub mod error;
pub mod http;
pub mod memory;
pub mod package;
pub mod remote;
pub mod store;

pub use error::{FailureCause, RemoteError, StoreError, StoreResult};
pub use http::{HttpRemoteStore, DEFAULT_TIMEOUT};
pub use memory::InMemoryRemote;
pub use package::{pack_artifact, unpack_artifact};
pub use remote::{OfflineRemote, RemoteResponse, RemoteStore};
pub use store::{ModelVersionStore, StoreAction, StoreEvent};
