//! Last provisioning URL that delivered a configuration.

use tracing::info;

use crate::kv::KeyValueStore;
use crate::{LAST_WORKING_URL_KEY, StoreError};

/// Accessor for the last working provisioning URL.
///
/// Absent until the first success. Never expires: a stale value is simply
/// tried first and falls through if it no longer answers.
pub struct LastEndpointStore<'a> {
    store: &'a dyn KeyValueStore,
}

impl<'a> LastEndpointStore<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store }
    }

    /// Returns the last working URL, if one was ever saved.
    pub fn load(&self) -> Option<String> {
        self.store
            .get(LAST_WORKING_URL_KEY)
            .filter(|url| !url.is_empty())
    }

    /// Records `url` as the last working provisioning URL. Last write wins.
    pub fn save(&self, url: &str) -> Result<(), StoreError> {
        self.store.set(LAST_WORKING_URL_KEY, url)?;
        info!(url = %url, "saved last working provisioning url");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    #[test]
    fn absent_until_saved() {
        let store = MemoryStore::new();
        let last = LastEndpointStore::new(&store);
        assert!(last.load().is_none());

        last.save("http://1.2.3.4:8888/provision").unwrap();
        assert_eq!(last.load().unwrap(), "http://1.2.3.4:8888/provision");
    }

    #[test]
    fn later_write_wins() {
        let store = MemoryStore::new();
        let last = LastEndpointStore::new(&store);
        last.save("http://a/provision").unwrap();
        last.save("http://b/provision").unwrap();
        assert_eq!(last.load().unwrap(), "http://b/provision");
    }

    #[test]
    fn empty_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set(LAST_WORKING_URL_KEY, "").unwrap();
        assert!(LastEndpointStore::new(&store).load().is_none());
    }
}
