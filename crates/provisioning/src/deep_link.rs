//! Activation deep links.
//!
//! `<scheme>://import?url=<provisioning URL>` provisions straight from the
//! given URL with the patient timeout, skipping the candidate search. This
//! path does not take the orchestrator's single-flight slot; if both run at
//! once, the later write of the last working URL wins.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use autoprov_notice::Notifier;
use autoprov_store::{DeviceIdentity, KeyValueStore, LastEndpointStore};

use crate::config::ProvisioningConfig;
use crate::context::ProvisioningContext;
use crate::fetcher::ConfigFetcher;
use crate::waiting::WaitingIndicator;
use crate::{ProvisionError, SUCCESS_MESSAGE};

/// Action name carried by activation links.
const IMPORT_ACTION: &str = "import";

/// Query parameter holding the provisioning URL.
const URL_PARAM: &str = "url";

/// What handling a deep link did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkOutcome {
    /// Not an activation link for this application.
    Ignored,
    /// The configuration was fetched and imported.
    Imported { provision_url: String },
    /// The endpoint answered with a non-200 status; nothing was imported.
    Rejected { provision_url: String },
}

/// Extracts the provisioning URL from an activation link.
///
/// Returns `Ok(None)` when `link` uses a different scheme, and
/// [`ProvisionError::InvalidDeepLink`] when it uses ours but carries no
/// `url` parameter. An action other than `import` is only logged.
pub fn parse_activation_url(link: &str, scheme: &str) -> Result<Option<String>, ProvisionError> {
    let url = Url::parse(link).map_err(|e| ProvisionError::InvalidDeepLink(format!("{link}: {e}")))?;
    if !url.scheme().eq_ignore_ascii_case(scheme) {
        return Ok(None);
    }

    // `scheme://import?..` carries the action as host, `scheme:import?..` as path.
    let action = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => url
            .path()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    if !action.eq_ignore_ascii_case(IMPORT_ACTION) {
        warn!(link = %link, action = %action, "unexpected activation link action, importing anyway");
    }

    url.query_pairs()
        .find(|(key, _)| key == URL_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(Some)
        .ok_or_else(|| ProvisionError::InvalidDeepLink(format!("missing '{URL_PARAM}' parameter")))
}

/// Handles activation deep links.
pub struct DeepLinkHandler {
    scheme: String,
    timeout: Duration,
    fetcher: ConfigFetcher,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
}

impl DeepLinkHandler {
    pub fn new(config: &ProvisioningConfig, ctx: ProvisioningContext) -> Self {
        Self {
            scheme: config.deep_link_scheme.clone(),
            timeout: config.patient_timeout(),
            fetcher: ctx.fetcher(),
            store: ctx.store,
            notifier: ctx.notifier,
        }
    }

    /// Provisions from the URL carried by `activation_url`.
    pub async fn handle(&self, activation_url: &str) -> Result<DeepLinkOutcome, ProvisionError> {
        let provision_url = match parse_activation_url(activation_url, &self.scheme) {
            Ok(Some(url)) => url,
            Ok(None) => {
                debug!(link = %activation_url, "not an activation link");
                return Ok(DeepLinkOutcome::Ignored);
            }
            Err(e) => {
                warn!(link = %activation_url, error = %e, "ignoring malformed activation link");
                return Err(e);
            }
        };
        info!(url = %provision_url, "activation link detected, provisioning");

        let device_id = DeviceIdentity::new(&*self.store).get_or_create()?;
        let _waiting = WaitingIndicator::show(&*self.notifier);

        if !self
            .fetcher
            .fetch_and_import(&provision_url, &device_id, self.timeout)
            .await?
        {
            return Ok(DeepLinkOutcome::Rejected { provision_url });
        }

        if let Err(e) = LastEndpointStore::new(&*self.store).save(&provision_url) {
            warn!(url = %provision_url, error = %e, "failed to save last working url");
        }
        self.notifier.notify(SUCCESS_MESSAGE);
        Ok(DeepLinkOutcome::Imported { provision_url })
    }
}
