//! Idempotent bootstrap of everything the reconciliation tick assumes
//! already exists: the network namespace, this agent's iptables chains and
//! jump rules, IPv4 forwarding, and the temp directories backing the router
//! container's bind mount.
//!
//! Every step here tolerates "already exists" as success, matching the
//! tick's idempotence contract: a partially-bootstrapped namespace from a
//! crashed previous run must converge the same as a pristine one.

use netctl_iptables::IptablesManager;
use netctl_proc::{run, run_in_ns, AllowedProgram, ProcError};
use tracing::debug;

use crate::error::NetworktoolsError;

/// `(table, builtin chain)` pairs this agent jumps into from its own
/// `{ns}-{chain}` chain. `POSTROUTING` and `PREROUTING` each appear twice
/// because they exist independently in two tables.
const CHAIN_TARGETS: &[(&str, &str)] = &[
    ("nat", "POSTROUTING"),
    ("nat", "PREROUTING"),
    ("raw", "PREROUTING"),
    ("mangle", "OUTPUT"),
    ("mangle", "POSTROUTING"),
    ("filter", "FORWARD"),
    ("filter", "INPUT"),
];

/// Every `{ns}-*` owned chain this agent creates lives in the root
/// namespace, alongside the host uplink and the host side of the local
/// veth pair those chains actually match traffic on.
fn root_manager() -> IptablesManager {
    IptablesManager::new("")
}

async fn ensure_netns(ns: &str) -> Result<(), NetworktoolsError> {
    let output = run(AllowedProgram::Ip, &["netns", "add", ns]).await?;
    if output.success() || output.stderr_lossy().contains("File exists") {
        return Ok(());
    }
    Err(ProcError::NonZeroExit {
        program: AllowedProgram::Ip.as_str(),
        args: vec!["netns".to_string(), "add".to_string(), ns.to_string()],
        exit_code: output.exit_code,
        stderr: output.stderr_lossy(),
    }
    .into())
}

async fn ensure_chains_and_jumps(ns: &str) -> Result<(), NetworktoolsError> {
    let root = root_manager();
    for (table, builtin) in CHAIN_TARGETS {
        let owned = format!("{ns}-{builtin}");
        root.create_chain(table, &owned).await?;
        root.insert_if_missing(table, builtin, &["-j", &owned]).await?;
    }
    Ok(())
}

async fn ensure_forwarding(ns: &str) -> Result<(), NetworktoolsError> {
    run(AllowedProgram::Sysctl, &["-w", "net.ipv4.ip_forward=1"]).await?;
    run_in_ns(ns, AllowedProgram::Sysctl, &["-w", "net.ipv4.ip_forward=1"]).await?;
    Ok(())
}

async fn ensure_temp_dirs(ns: &str) -> Result<(), NetworktoolsError> {
    tokio::fs::create_dir_all(router_dir(ns)).await?;
    Ok(())
}

async fn ensure_tcpmss_clamp(ns: &str) -> Result<(), NetworktoolsError> {
    let in_ns = IptablesManager::new(ns);
    in_ns
        .append_if_missing(
            "filter",
            "FORWARD",
            &["-p", "tcp", "--tcp-flags", "SYN,RST", "SYN", "-j", "TCPMSS", "--clamp-mss-to-pmtu"],
        )
        .await?;
    Ok(())
}

/// The temp directory this agent owns for `ns`, whose `router`
/// subdirectory is bind-mounted read-only into the routing-daemon
/// container.
#[must_use]
pub fn temp_dir(ns: &str) -> String {
    format!("/tmp/networktools-{ns}")
}

/// `{temp_dir(ns)}/router`, where the rendered BIRD configuration lands.
#[must_use]
pub fn router_dir(ns: &str) -> String {
    format!("{}/router", temp_dir(ns))
}

/// Runs every bootstrap step for `ns`. Safe to call on every tick: each
/// step tolerates "already exists"/"already set".
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if any non-idempotent failure occurs.
pub async fn ensure_prerequisites(ns: &str) -> Result<(), NetworktoolsError> {
    ensure_netns(ns).await?;
    ensure_chains_and_jumps(ns).await?;
    ensure_forwarding(ns).await?;
    ensure_temp_dirs(ns).await?;
    ensure_tcpmss_clamp(ns).await?;
    debug!(ns, "prerequisites ensured");
    Ok(())
}
