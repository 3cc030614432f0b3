//! Provisioning fallback protocol.
//!
//! Finds a working configuration-delivery endpoint behind a possibly
//! blocked primary: walks a prioritized candidate list in two cycles (quick
//! scan, then a patient retry of whatever timed out), resolves indirect
//! relay sources into concrete provisioning URLs, and remembers the URL
//! that worked. At most one orchestration runs at a time.

pub mod candidates;
pub mod config;
pub mod context;
pub mod deep_link;
pub mod fetcher;
pub mod http;
pub mod orchestrator;
pub mod resolver;
pub mod types;
mod waiting;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use candidates::{CandidateSource, build_candidates};
pub use config::ProvisioningConfig;
pub use context::ProvisioningContext;
pub use deep_link::{DeepLinkHandler, DeepLinkOutcome, parse_activation_url};
pub use fetcher::{ConfigFetcher, ConfigImporter, with_device_id};
pub use http::{GetFuture, HttpGet, HttpResponse, ReqwestHttp};
pub use orchestrator::Orchestrator;
pub use resolver::{EndpointResolver, normalize_endpoint};
pub use types::{Cycle, ProvisionEvent, Provisioned, ProvisioningState};

/// Notice posted when a configuration was imported.
pub const SUCCESS_MESSAGE: &str = "Configuration imported";

/// Notice posted before the patient retry cycle starts.
pub const RETRY_MESSAGE: &str = "Still connecting, this may take a little longer";

/// Notice posted when every candidate failed.
pub const FAILURE_MESSAGE: &str = "Provisioning failed";

/// Errors produced by the provisioning flow.
///
/// Only [`ProvisionError::Timeout`] makes a candidate eligible for the
/// patient retry cycle; everything else drops it for the current run.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("timed out after {}ms: {url}", .timeout.as_millis())]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("store error: {0}")]
    Store(#[from] autoprov_store::StoreError),

    #[error("provisioning already in progress")]
    AlreadyRunning,

    #[error("no provisioning candidate succeeded ({attempted} tried)")]
    NoCandidatesSucceeded { attempted: usize },

    #[error("invalid deep link: {0}")]
    InvalidDeepLink(String),
}

impl ProvisionError {
    /// Whether this failure was a connect or read timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
