//! Relay resolution: turns a relay URL into a concrete provisioning URL.
//!
//! A relay answers `200 OK` with plain text that is either a full URL or a
//! bare `host[:port]`/domain.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::ProvisionError;
use crate::http::{HttpGet, get_ok_text};

/// Path appended to bare hosts returned by a relay.
const PROVISION_PATH: &str = "/provision";

/// Resolves relay URLs through an [`HttpGet`].
#[derive(Clone)]
pub struct EndpointResolver {
    http: Arc<dyn HttpGet>,
}

impl EndpointResolver {
    pub fn new(http: Arc<dyn HttpGet>) -> Self {
        Self { http }
    }

    /// Fetches `relay_url` and normalizes its body into a provisioning URL.
    ///
    /// Returns `Ok(None)` for a non-200 status or an empty body. Timeouts and
    /// transport failures are returned so the caller can tell them apart.
    pub async fn resolve(
        &self,
        relay_url: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ProvisionError> {
        match get_ok_text(&*self.http, relay_url, timeout).await {
            Ok(text) if text.is_empty() => {
                warn!(relay = %relay_url, "relay returned an empty endpoint");
                Ok(None)
            }
            Ok(text) => {
                let provision_url = normalize_endpoint(&text);
                debug!(relay = %relay_url, provision_url = %provision_url, "relay resolved");
                Ok(Some(provision_url))
            }
            Err(ProvisionError::Http { status, .. }) => {
                warn!(relay = %relay_url, status, "relay answered with an error status");
                Ok(None)
            }
            Err(e) => {
                warn!(relay = %relay_url, error = %e, "failed to fetch from relay");
                Err(e)
            }
        }
    }
}

/// Builds a provisioning URL from a relay's text answer.
///
/// Full `http://`/`https://` URLs pass through unchanged; anything else is
/// taken as a host and becomes `http://<text>/provision`.
pub fn normalize_endpoint(text: &str) -> String {
    let text = text.trim();
    if text.starts_with("http://") || text.starts_with("https://") {
        text.to_string()
    } else {
        // Plain HTTP until relays hand out HTTPS-only endpoints.
        format!("http://{text}{PROVISION_PATH}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestHttp;
    use crate::testing::{FakeHttp, Reply, mock_server};

    const RELAY: &str = "https://relay.test/endpoint.txt";

    fn resolver(http: FakeHttp) -> EndpointResolver {
        EndpointResolver::new(Arc::new(http))
    }

    #[test]
    fn full_urls_are_unchanged() {
        assert_eq!(
            normalize_endpoint("https://example.com/provision"),
            "https://example.com/provision"
        );
        assert_eq!(
            normalize_endpoint("http://example.com/custom?x=1"),
            "http://example.com/custom?x=1"
        );
    }

    #[test]
    fn bare_hosts_get_scheme_and_path() {
        assert_eq!(
            normalize_endpoint("1.2.3.4:8888"),
            "http://1.2.3.4:8888/provision"
        );
        assert_eq!(
            normalize_endpoint("  provision.example.com\n"),
            "http://provision.example.com/provision"
        );
    }

    #[tokio::test]
    async fn resolves_bare_host() {
        let r = resolver(FakeHttp::new().route(RELAY, &[Reply::Ok("1.2.3.4:8888\n")]));
        let url = r.resolve(RELAY, Duration::from_secs(3)).await.unwrap();
        assert_eq!(url.as_deref(), Some("http://1.2.3.4:8888/provision"));
    }

    #[tokio::test]
    async fn error_status_resolves_to_none() {
        let r = resolver(FakeHttp::new().route(RELAY, &[Reply::Status(404)]));
        assert!(r.resolve(RELAY, Duration::from_secs(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_body_resolves_to_none() {
        let r = resolver(FakeHttp::new().route(RELAY, &[Reply::Ok("   \n")]));
        assert!(r.resolve(RELAY, Duration::from_secs(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn timeout_is_propagated() {
        let r = resolver(FakeHttp::new().route(RELAY, &[Reply::Timeout]));
        let err = r.resolve(RELAY, Duration::from_secs(3)).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let r = resolver(FakeHttp::new());
        let err = r.resolve(RELAY, Duration::from_secs(3)).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Transport { .. }));
    }

    #[tokio::test]
    async fn resolves_over_real_http() {
        let (url, handle) = mock_server(200, "https://example.com/provision\n").await;
        let r = EndpointResolver::new(Arc::new(ReqwestHttp::new()));

        let resolved = r.resolve(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(resolved.as_deref(), Some("https://example.com/provision"));
        handle.await.unwrap();
    }
}
