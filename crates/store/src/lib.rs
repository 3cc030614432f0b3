//! Persisted provisioning state.
//!
//! Two facts survive across runs: a stable device identifier and the last
//! provisioning URL that delivered a configuration. Both live in a simple
//! key-value store scoped to the installation.

pub mod endpoint;
pub mod identity;
pub mod kv;

pub use endpoint::LastEndpointStore;
pub use identity::DeviceIdentity;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};

/// Key holding the generated device identifier.
pub const DEVICE_ID_KEY: &str = "device_id";

/// Key holding the last provisioning URL that succeeded.
pub const LAST_WORKING_URL_KEY: &str = "last_working_provisioning_url";

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
