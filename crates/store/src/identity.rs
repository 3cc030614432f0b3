//! Stable per-installation device identifier.

use tracing::info;

use crate::kv::KeyValueStore;
use crate::{DEVICE_ID_KEY, StoreError};

/// Accessor for the device identifier kept in a [`KeyValueStore`].
///
/// The identifier is a random v4 UUID generated on first use and never
/// regenerated afterwards.
pub struct DeviceIdentity<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> DeviceIdentity<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Returns the stored identifier, generating and persisting one if absent.
    ///
    /// Fails if a freshly generated identifier could not be persisted, so a
    /// caller never sends an identifier that the next run would not reuse.
    pub fn get_or_create(&self) -> Result<String, StoreError> {
        if let Some(id) = self.store.get(DEVICE_ID_KEY).filter(|id| !id.is_empty()) {
            info!(device_id = %id, "using existing device id");
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.store.set(DEVICE_ID_KEY, &id)?;
        info!(device_id = %id, "generated new device id");
        Ok(id)
    }
}
