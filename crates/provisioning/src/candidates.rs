//! Candidate source list.

use crate::config::ProvisioningConfig;

/// A place to try provisioning from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSource {
    pub url: String,
    /// `true` if `url` is itself a provisioning endpoint; `false` if it is a
    /// relay that must be resolved first.
    pub is_direct: bool,
}

impl CandidateSource {
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_direct: true,
        }
    }

    pub fn relay(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_direct: false,
        }
    }
}

/// Builds the candidate list for one orchestration run.
///
/// Priority: the last working URL (always direct, since it is the resolved
/// provisioning URL), then the primary endpoint, then the relays in
/// configured order. A source already in the list is not added twice.
pub fn build_candidates(
    last_working: Option<&str>,
    config: &ProvisioningConfig,
) -> Vec<CandidateSource> {
    let mut candidates = Vec::with_capacity(config.fallback_relay_urls.len() + 2);

    let ordered = last_working
        .map(CandidateSource::direct)
        .into_iter()
        .chain(std::iter::once(CandidateSource::direct(&config.primary_url)))
        .chain(config.fallback_relay_urls.iter().map(CandidateSource::relay));

    for candidate in ordered {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
