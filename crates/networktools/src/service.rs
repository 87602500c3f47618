//! The long-running service loop: a startup cleanup sweep, then a
//! reconciliation tick on a fixed interval until signaled to stop.

use std::time::Duration;

use netctl_container::ContainerRuntime;
use netctl_controller::ControllerClient;
use netctl_link::LinkBackend;
use netctl_ping::PingSource;
use netctl_relay::{RelayManager, Supervisor};
use netctl_store::NodeStore;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::error::NetworktoolsError;
use crate::{cleanup, ensure, reconcile};

/// Interval between reconciliation ticks.
const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Delay between the startup cleanup sweep and the first tick, giving
/// whatever the sweep tore down a moment to settle (interface removal,
/// chain flushes) before the first tick tries to rebuild it.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Runs the cleanup-then-tick service loop until a shutdown signal
/// arrives, then sweeps the namespace clean again before returning.
///
/// Every tick-level error is logged and the loop continues; only the
/// absence of node settings at startup is fatal.
///
/// # Errors
///
/// Returns [`NetworktoolsError::MissingNodeSettings`] if this node has not
/// completed the init flow.
pub async fn run<L, C, P, S, Ctrl>(
    link: &L,
    container: &C,
    ping_source: &P,
    relay: &RelayManager<S>,
    controller: &Ctrl,
    store: &NodeStore,
) -> Result<(), NetworktoolsError>
where
    L: LinkBackend,
    C: ContainerRuntime,
    P: PingSource,
    S: Supervisor,
    Ctrl: ControllerClient,
{
    let settings = store.get_node_settings().map_err(NetworktoolsError::MissingNodeSettings)?;
    let ns = settings.namespace;
    let temp_dir = ensure::temp_dir(&ns);

    cleanup::cleanup_namespace(link, container, &ns, &temp_dir).await?;
    tokio::time::sleep(SETTLE_DELAY).await;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    let mut ticker = interval(TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = reconcile::run_once(link, container, ping_source, relay, controller, store).await {
                    warn!(%error, "reconciliation tick failed, will retry next interval");
                }
            }
            _ = shutdown_rx.recv() => {
                info!("shutdown signal received, stopping service loop");
                break;
            }
        }
    }

    if let Err(error) = cleanup::cleanup_namespace(link, container, &ns, &temp_dir).await {
        error!(%error, "cleanup on shutdown failed");
        return Err(error);
    }
    Ok(())
}
