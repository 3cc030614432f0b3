//! Provisioning endpoints and timeouts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Cycle;

/// Provisioning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Hardcoded primary provisioning endpoint, tried right after the last
    /// working URL.
    #[serde(default = "default_primary_url")]
    pub primary_url: String,

    /// Relay URLs that answer with the current provisioning endpoint, in
    /// priority order.
    #[serde(default = "default_fallback_relay_urls")]
    pub fallback_relay_urls: Vec<String>,

    /// Connect/read timeout for the quick scan, in milliseconds.
    #[serde(default = "default_quick_timeout_ms")]
    pub quick_timeout_ms: u64,

    /// Connect/read timeout for the patient retry and deep links, in
    /// milliseconds.
    #[serde(default = "default_patient_timeout_ms")]
    pub patient_timeout_ms: u64,

    /// URL scheme of activation deep links.
    #[serde(default = "default_deep_link_scheme")]
    pub deep_link_scheme: String,
}

fn default_primary_url() -> String {
    "http://provision.autoprov.net:8888/provision".into()
}

fn default_fallback_relay_urls() -> Vec<String> {
    vec!["https://relay.autoprov.net/endpoint.txt".into()]
}

fn default_quick_timeout_ms() -> u64 {
    3000
}

fn default_patient_timeout_ms() -> u64 {
    10_000
}

fn default_deep_link_scheme() -> String {
    "vsemoionline".into()
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            fallback_relay_urls: default_fallback_relay_urls(),
            quick_timeout_ms: default_quick_timeout_ms(),
            patient_timeout_ms: default_patient_timeout_ms(),
            deep_link_scheme: default_deep_link_scheme(),
        }
    }
}

impl ProvisioningConfig {
    pub fn quick_timeout(&self) -> Duration {
        Duration::from_millis(self.quick_timeout_ms)
    }

    pub fn patient_timeout(&self) -> Duration {
        Duration::from_millis(self.patient_timeout_ms)
    }

    /// Per-call timeout used during `cycle`.
    pub fn timeout_for(&self, cycle: Cycle) -> Duration {
        match cycle {
            Cycle::Quick => self.quick_timeout(),
            Cycle::Patient => self.patient_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let config = ProvisioningConfig::default();
        assert_eq!(config.timeout_for(Cycle::Quick), Duration::from_millis(3000));
        assert_eq!(config.timeout_for(Cycle::Patient), Duration::from_secs(10));
        assert_eq!(config.deep_link_scheme, "vsemoionline");
        assert!(config.primary_url.ends_with("/provision"));
    }

    #[test]
    fn partial_config_uses_defaults() {
        let json = r#"{"primary_url": "http://10.0.0.1:8888/provision", "quick_timeout_ms": 500}"#;
        let config: ProvisioningConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.primary_url, "http://10.0.0.1:8888/provision");
        assert_eq!(config.quick_timeout(), Duration::from_millis(500));
        assert_eq!(config.patient_timeout_ms, 10_000);
        assert_eq!(
            config.fallback_relay_urls,
            ProvisioningConfig::default().fallback_relay_urls
        );
    }

    #[test]
    fn empty_relay_list_is_allowed() {
        let json = r#"{"fallback_relay_urls": []}"#;
        let config: ProvisioningConfig = serde_json::from_str(json).unwrap();
        assert!(config.fallback_relay_urls.is_empty());
    }
}
