//! Public types for the provisioning orchestrator.

use crate::candidates::CandidateSource;

/// Named orchestration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    /// No orchestration running; a new request is accepted.
    Idle,
    /// Quick scan over the full candidate list.
    Cycle1Scanning,
    /// Patient retry over the candidates that timed out in the quick scan.
    Cycle2Retrying,
}

impl ProvisioningState {
    /// Whether an orchestration currently holds the single-flight slot.
    pub fn is_running(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// One pass over a candidate list at a fixed timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    Quick,
    Patient,
}

impl Cycle {
    /// 1-based cycle number, for logs.
    pub fn number(self) -> u8 {
        match self {
            Self::Quick => 1,
            Self::Patient => 2,
        }
    }
}

/// A successful provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// The concrete provisioning URL that delivered the configuration.
    pub provision_url: String,
    /// The candidate that led to it (a relay, for indirect sources).
    pub source: CandidateSource,
    /// The cycle in which it succeeded.
    pub cycle: Cycle,
}

/// Events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionEvent {
    /// The orchestration state changed.
    StateChanged(ProvisioningState),
    /// A candidate failed. `retry` is set when it was queued for cycle 2.
    CandidateFailed {
        url: String,
        cycle: Cycle,
        reason: String,
        retry: bool,
    },
    /// Cycle 1 ended without success; `count` candidates will be retried.
    RetryScheduled { count: usize },
    /// Provisioning succeeded.
    Succeeded(Provisioned),
    /// Every candidate failed in every cycle.
    Failed,
}
