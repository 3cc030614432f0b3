//! Wires the provisioning components to the host's collaborators.

use std::sync::Arc;

use anyhow::bail;
use autoprov_notice::{NoticeBoard, NoticeKind};
use autoprov_provisioning::{
    DeepLinkHandler, DeepLinkOutcome, Orchestrator, ProvisionError, ProvisionEvent, Provisioned,
    ProvisioningContext, ReqwestHttp,
};
use autoprov_store::JsonFileStore;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Args;
use crate::config::Config;
use crate::servers::ServerListFile;

/// Handles an activation link if one was given, then auto-provisions when
/// no server is configured yet.
pub async fn run(config: Config, args: &Args) -> anyhow::Result<()> {
    let store = Arc::new(JsonFileStore::open(config.state_file.clone())?);
    let servers = Arc::new(ServerListFile::new(config.servers_file.clone()));
    let board = Arc::new(NoticeBoard::new());
    let ctx = ProvisioningContext::new(
        Arc::new(ReqwestHttp::new()),
        servers.clone(),
        store,
        board.clone(),
    );

    let mut failed = false;

    if let Some(link) = &args.deep_link {
        let handler = DeepLinkHandler::new(&config.provisioning, ctx.clone());
        match handler.handle(link).await {
            Ok(DeepLinkOutcome::Imported { provision_url }) => {
                info!(url = %provision_url, "provisioned from activation link");
            }
            Ok(DeepLinkOutcome::Rejected { provision_url }) => {
                warn!(url = %provision_url, "activation link endpoint refused the request");
                failed = true;
            }
            Ok(DeepLinkOutcome::Ignored) => {
                warn!(link = %link, "not an activation link, ignoring");
            }
            Err(e) => {
                warn!(error = %e, "activation link failed");
                failed = true;
            }
        }
    }

    if args.force || servers.is_empty()? {
        info!("no servers configured, attempting auto-provisioning");
        let orchestrator = Orchestrator::new(config.provisioning.clone(), ctx);
        let (result, _) = run_orchestrator(orchestrator).await;
        match result {
            Ok(provisioned) => info!(
                url = %provisioned.provision_url,
                cycle = provisioned.cycle.number(),
                "auto-provisioning complete"
            ),
            Err(e) => {
                warn!(error = %e, "auto-provisioning failed");
                failed = true;
            }
        }
    } else {
        info!(
            servers = servers.entries()?.len(),
            "servers already configured, skipping auto-provisioning"
        );
    }

    render_notices(&board);

    if failed {
        bail!("provisioning failed");
    }
    Ok(())
}

/// Runs one orchestration and returns its result along with the number of
/// events logged. Consumes the orchestrator so the event channel closes and
/// every trailing event is logged before returning.
async fn run_orchestrator(
    orchestrator: Orchestrator,
) -> (Result<Provisioned, ProvisionError>, usize) {
    let logger = orchestrator
        .take_events()
        .await
        .map(|events| tokio::spawn(log_events(events)));

    let result = orchestrator.run().await;
    drop(orchestrator);

    let logged = match logger {
        Some(task) => task.await.unwrap_or_else(|e| {
            warn!(error = %e, "event logger stopped");
            0
        }),
        None => 0,
    };
    (result, logged)
}

async fn log_events(mut events: mpsc::Receiver<ProvisionEvent>) -> usize {
    let mut logged = 0;
    while let Some(event) = events.recv().await {
        logged += 1;
        match event {
            ProvisionEvent::StateChanged(state) => debug!(?state, "provisioning state changed"),
            ProvisionEvent::CandidateFailed {
                url,
                cycle,
                reason,
                retry,
            } => debug!(url = %url, cycle = cycle.number(), reason = %reason, retry, "candidate failed"),
            ProvisionEvent::RetryScheduled { count } => {
                debug!(count, "retrying timed-out candidates")
            }
            ProvisionEvent::Succeeded(provisioned) => {
                debug!(url = %provisioned.provision_url, "provisioning succeeded")
            }
            ProvisionEvent::Failed => debug!("provisioning failed"),
        }
    }
    logged
}

fn render_notices(board: &NoticeBoard) {
    for notice in board.drain() {
        match notice.kind {
            NoticeKind::Info => println!("{}", notice.message),
            NoticeKind::Error => eprintln!("error: {}", notice.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(tmp: &tempfile::TempDir) -> Config {
        Config {
            state_file: tmp.path().join("state.json"),
            servers_file: tmp.path().join("servers.txt"),
            ..Config::default()
        }
    }

    fn args(deep_link: Option<&str>) -> Args {
        Args {
            config: None,
            deep_link: deep_link.map(str::to_string),
            force: false,
        }
    }

    #[tokio::test]
    async fn skips_when_servers_configured() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(&tmp);
        std::fs::write(&config.servers_file, "vless://existing\n").unwrap();

        run(config.clone(), &args(None)).await.unwrap();

        assert_eq!(
            ServerListFile::new(config.servers_file).entries().unwrap(),
            vec!["vless://existing"]
        );
        // Nothing provisioned, so no device id was needed.
        assert!(!config.state_file.exists());
    }

    #[tokio::test]
    async fn foreign_link_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(&tmp);
        std::fs::write(&config.servers_file, "vless://existing\n").unwrap();

        run(config, &args(Some("https://example.com/import?url=x")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn malformed_link_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(&tmp);
        std::fs::write(&config.servers_file, "vless://existing\n").unwrap();

        assert!(run(config, &args(Some("vsemoionline://import"))).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_server_list_does_not_trigger_provisioning() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(&tmp);
        std::fs::create_dir(&config.servers_file).unwrap();

        assert!(run(config.clone(), &args(None)).await.is_err());
        assert!(!config.state_file.exists());
    }

    #[tokio::test]
    async fn events_are_all_logged_before_returning() {
        let tmp = tempfile::tempdir().unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = test_config(&tmp);
        config.provisioning.primary_url = format!("http://127.0.0.1:{port}/provision");
        config.provisioning.fallback_relay_urls = Vec::new();

        let store = Arc::new(JsonFileStore::open(config.state_file.clone()).unwrap());
        let ctx = ProvisioningContext::new(
            Arc::new(ReqwestHttp::new()),
            Arc::new(ServerListFile::new(config.servers_file.clone())),
            store,
            Arc::new(NoticeBoard::new()),
        );
        let orchestrator = Orchestrator::new(config.provisioning.clone(), ctx);

        let (result, logged) = run_orchestrator(orchestrator).await;

        assert!(matches!(
            result,
            Err(ProvisionError::NoCandidatesSucceeded { attempted: 1 })
        ));
        // Cycle 1 entered, candidate failed, run failed, back to idle.
        assert_eq!(logged, 4);
    }
}
