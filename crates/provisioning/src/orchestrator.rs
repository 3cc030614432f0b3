//! Two-cycle provisioning orchestrator.
//!
//! Cycle 1 walks every candidate with the quick timeout. Candidates that
//! timed out are retried once more in cycle 2 with the patient timeout;
//! any other failure drops the candidate for the rest of the run. The first
//! success ends the run and is remembered as the last working URL.
//!
//! Runs are single-flight: a request arriving while one is active is
//! discarded, and the slot is released on every exit path.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tracing::{error, info, trace, warn};

use autoprov_notice::Notifier;
use autoprov_store::{DeviceIdentity, KeyValueStore, LastEndpointStore};

use crate::candidates::{CandidateSource, build_candidates};
use crate::config::ProvisioningConfig;
use crate::context::ProvisioningContext;
use crate::fetcher::ConfigFetcher;
use crate::resolver::EndpointResolver;
use crate::types::{Cycle, ProvisionEvent, Provisioned, ProvisioningState};
use crate::waiting::WaitingIndicator;
use crate::{FAILURE_MESSAGE, ProvisionError, RETRY_MESSAGE, SUCCESS_MESSAGE};

/// Result of one pass over a candidate list.
enum ScanOutcome {
    Succeeded(Provisioned),
    Exhausted { timed_out: Vec<CandidateSource> },
}

/// Drives provisioning across the candidate list.
pub struct Orchestrator {
    config: ProvisioningConfig,
    resolver: EndpointResolver,
    fetcher: ConfigFetcher,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<ProvisioningState>,
    events_tx: mpsc::Sender<ProvisionEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<ProvisionEvent>>>,
}

/// Holds the single-flight slot; returns the orchestrator to `Idle` on drop.
struct FlightGuard<'a> {
    orchestrator: &'a Orchestrator,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.set_state(ProvisioningState::Idle);
    }
}

impl Orchestrator {
    pub fn new(config: ProvisioningConfig, ctx: ProvisioningContext) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (state, _) = watch::channel(ProvisioningState::Idle);

        Self {
            resolver: ctx.resolver(),
            fetcher: ctx.fetcher(),
            store: ctx.store,
            notifier: ctx.notifier,
            config,
            state,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ProvisionEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Current orchestration state.
    pub fn state(&self) -> ProvisioningState {
        *self.state.borrow()
    }

    /// Watches orchestration state changes.
    pub fn subscribe(&self) -> watch::Receiver<ProvisioningState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &ProvisioningConfig {
        &self.config
    }

    /// Runs one provisioning orchestration.
    ///
    /// Returns [`ProvisionError::AlreadyRunning`] without side effects if
    /// another run is active. Otherwise always ends in success or
    /// [`ProvisionError::NoCandidatesSucceeded`] (or a store failure), with
    /// exactly one success or failure notice posted.
    pub async fn run(&self) -> Result<Provisioned, ProvisionError> {
        let Some(_flight) = self.try_begin() else {
            info!("provisioning already in progress, skipping");
            return Err(ProvisionError::AlreadyRunning);
        };
        let _waiting = WaitingIndicator::show(&*self.notifier);

        let result = self.provision().await;
        match &result {
            Ok(provisioned) => {
                self.notifier.notify(SUCCESS_MESSAGE);
                self.emit(ProvisionEvent::Succeeded(provisioned.clone()));
            }
            Err(e) => {
                error!(error = %e, "provisioning failed after all cycles");
                self.notifier.notify_error(FAILURE_MESSAGE);
                self.emit(ProvisionEvent::Failed);
            }
        }
        result
    }

    /// Claims the single-flight slot if the orchestrator is idle.
    fn try_begin(&self) -> Option<FlightGuard<'_>> {
        let acquired = self.state.send_if_modified(|state| {
            if state.is_running() {
                false
            } else {
                *state = ProvisioningState::Cycle1Scanning;
                true
            }
        });
        if !acquired {
            return None;
        }
        self.emit(ProvisionEvent::StateChanged(ProvisioningState::Cycle1Scanning));
        Some(FlightGuard { orchestrator: self })
    }

    async fn provision(&self) -> Result<Provisioned, ProvisionError> {
        let device_id = DeviceIdentity::new(&*self.store).get_or_create()?;
        let last_working = LastEndpointStore::new(&*self.store).load();
        if let Some(url) = &last_working {
            info!(url = %url, "will try last working url first");
        }
        let candidates = build_candidates(last_working.as_deref(), &self.config);

        info!(
            candidates = candidates.len(),
            timeout_ms = self.config.quick_timeout_ms,
            "starting cycle 1 quick scan"
        );
        let timed_out = match self.scan(Cycle::Quick, &candidates, &device_id).await {
            ScanOutcome::Succeeded(provisioned) => return Ok(provisioned),
            ScanOutcome::Exhausted { timed_out } => timed_out,
        };

        let attempted = candidates.len();
        if timed_out.is_empty() {
            return Err(ProvisionError::NoCandidatesSucceeded { attempted });
        }

        self.set_state(ProvisioningState::Cycle2Retrying);
        self.emit(ProvisionEvent::RetryScheduled {
            count: timed_out.len(),
        });
        self.notifier.notify(RETRY_MESSAGE);
        info!(
            candidates = timed_out.len(),
            timeout_ms = self.config.patient_timeout_ms,
            "starting cycle 2 patient retry"
        );

        match self.scan(Cycle::Patient, &timed_out, &device_id).await {
            ScanOutcome::Succeeded(provisioned) => Ok(provisioned),
            ScanOutcome::Exhausted { .. } => Err(ProvisionError::NoCandidatesSucceeded { attempted }),
        }
    }

    /// Tries `candidates` in order until one succeeds.
    async fn scan(
        &self,
        cycle: Cycle,
        candidates: &[CandidateSource],
        device_id: &str,
    ) -> ScanOutcome {
        let timeout = self.config.timeout_for(cycle);
        let mut timed_out = Vec::new();

        for candidate in candidates {
            info!(
                cycle = cycle.number(),
                url = %candidate.url,
                direct = candidate.is_direct,
                "attempting provisioning"
            );

            match self.attempt(candidate, device_id, timeout).await {
                Ok(Some(provision_url)) => {
                    if let Err(e) = LastEndpointStore::new(&*self.store).save(&provision_url) {
                        warn!(url = %provision_url, error = %e, "failed to save last working url");
                    }
                    info!(
                        cycle = cycle.number(),
                        url = %candidate.url,
                        provision_url = %provision_url,
                        "provisioning succeeded"
                    );
                    return ScanOutcome::Succeeded(Provisioned {
                        provision_url,
                        source: candidate.clone(),
                        cycle,
                    });
                }
                Ok(None) => {
                    self.candidate_failed(candidate, cycle, "rejected".into(), false);
                }
                Err(e) => {
                    let retry = cycle == Cycle::Quick && e.is_timeout();
                    if retry {
                        timed_out.push(candidate.clone());
                    }
                    self.candidate_failed(candidate, cycle, e.to_string(), retry);
                }
            }
        }

        ScanOutcome::Exhausted { timed_out }
    }

    /// Resolves (for relays) and fetches one candidate.
    ///
    /// `Ok(Some(url))` carries the provisioning URL that delivered the
    /// configuration; `Ok(None)` means the candidate answered but declined.
    async fn attempt(
        &self,
        candidate: &CandidateSource,
        device_id: &str,
        timeout: std::time::Duration,
    ) -> Result<Option<String>, ProvisionError> {
        let provision_url = if candidate.is_direct {
            candidate.url.clone()
        } else {
            match self.resolver.resolve(&candidate.url, timeout).await? {
                Some(url) => url,
                None => return Ok(None),
            }
        };

        let imported = self
            .fetcher
            .fetch_and_import(&provision_url, device_id, timeout)
            .await?;
        Ok(imported.then_some(provision_url))
    }

    fn candidate_failed(&self, candidate: &CandidateSource, cycle: Cycle, reason: String, retry: bool) {
        if retry {
            warn!(cycle = cycle.number(), url = %candidate.url, "timed out, will retry in cycle 2");
        } else {
            warn!(cycle = cycle.number(), url = %candidate.url, reason = %reason, "candidate failed");
        }
        self.emit(ProvisionEvent::CandidateFailed {
            url: candidate.url.clone(),
            cycle,
            reason,
            retry,
        });
    }

    fn set_state(&self, new_state: ProvisioningState) {
        self.state.send_replace(new_state);
        self.emit(ProvisionEvent::StateChanged(new_state));
    }

    fn emit(&self, event: ProvisionEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            trace!("provision event dropped: {e}");
        }
    }
}
