//! Authenticated configuration fetch.
//!
//! GETs `<provision_url>?device_id=<id>` and hands the returned
//! configuration URI to the importer.

use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{info, warn};

use crate::ProvisionError;
use crate::http::{HttpGet, get_ok_text};

/// Everything but RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Receives fetched configuration payloads.
///
/// Parsing and validation of the payload belong to the implementor.
pub trait ConfigImporter: Send + Sync {
    fn import(&self, payload: &str);
}

/// Fetches configuration payloads and imports them.
#[derive(Clone)]
pub struct ConfigFetcher {
    http: Arc<dyn HttpGet>,
    importer: Arc<dyn ConfigImporter>,
}

impl ConfigFetcher {
    pub fn new(http: Arc<dyn HttpGet>, importer: Arc<dyn ConfigImporter>) -> Self {
        Self { http, importer }
    }

    /// Fetches the configuration for `device_id` from `provision_url` and
    /// imports it.
    ///
    /// Returns `Ok(false)` without importing on a non-200 status. Timeouts
    /// and transport failures are returned to the caller.
    pub async fn fetch_and_import(
        &self,
        provision_url: &str,
        device_id: &str,
        timeout: Duration,
    ) -> Result<bool, ProvisionError> {
        let full_url = with_device_id(provision_url, device_id);
        info!(url = %full_url, "fetching config");

        match get_ok_text(&*self.http, &full_url, timeout).await {
            Ok(payload) => {
                info!(url = %provision_url, "received config, importing");
                self.importer.import(&payload);
                Ok(true)
            }
            Err(ProvisionError::Http { status, .. }) => {
                warn!(url = %provision_url, status, "provisioning endpoint answered with an error status");
                Ok(false)
            }
            Err(e) => {
                warn!(url = %provision_url, error = %e, "failed to fetch config");
                Err(e)
            }
        }
    }
}

/// Appends the `device_id` query parameter to `url`.
pub fn with_device_id(url: &str, device_id: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let encoded = utf8_percent_encode(device_id, QUERY_VALUE);
    format!("{url}{separator}device_id={encoded}")
}
