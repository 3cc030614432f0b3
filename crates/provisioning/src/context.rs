//! Collaborators shared by the orchestrator and the deep-link entry point.

use std::sync::Arc;

use autoprov_notice::Notifier;
use autoprov_store::KeyValueStore;

use crate::fetcher::{ConfigFetcher, ConfigImporter};
use crate::http::HttpGet;
use crate::resolver::EndpointResolver;

/// External effects the provisioning flow depends on.
#[derive(Clone)]
pub struct ProvisioningContext {
    pub http: Arc<dyn HttpGet>,
    pub importer: Arc<dyn ConfigImporter>,
    pub store: Arc<dyn KeyValueStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl ProvisioningContext {
    pub fn new(
        http: Arc<dyn HttpGet>,
        importer: Arc<dyn ConfigImporter>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            http,
            importer,
            store,
            notifier,
        }
    }

    pub(crate) fn resolver(&self) -> EndpointResolver {
        EndpointResolver::new(self.http.clone())
    }

    pub(crate) fn fetcher(&self) -> ConfigFetcher {
        ConfigFetcher::new(self.http.clone(), self.importer.clone())
    }
}
