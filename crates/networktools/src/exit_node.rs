//! Step 5: the node-wide exit-node `MASQUERADE` rule.
//!
//! The owned `{ns}-POSTROUTING` chain lives in the root namespace alongside
//! the host uplink interface it masquerades onto (see [`crate::ensure`]),
//! not inside the network namespace this agent otherwise manages.

use netctl_iptables::IptablesManager;
use tracing::info;

use crate::diff::{exit_node_diff, ExitNodeAction};
use crate::error::NetworktoolsError;

/// Reconciles `nat/{ns}-POSTROUTING -o {eth} -j MASQUERADE` against whether
/// `desired` exit-node masquerading is wanted.
///
/// # Errors
///
/// Returns [`NetworktoolsError`] if the rule check or mutation fails.
pub async fn sync_exit_node(ns: &str, eth_name: &str, desired: bool) -> Result<(), NetworktoolsError> {
    let root = IptablesManager::new("");
    let chain = format!("{ns}-POSTROUTING");
    let rule_args = ["-o", eth_name, "-j", "MASQUERADE"];
    let present = root.rule_exists("nat", &chain, &rule_args).await?;

    match exit_node_diff(present, desired) {
        ExitNodeAction::Noop => {}
        ExitNodeAction::Add => {
            info!(ns, eth_name, "enabling exit-node masquerading");
            root.append_if_missing("nat", &chain, &rule_args).await?;
        }
        ExitNodeAction::Remove => {
            info!(ns, eth_name, "disabling exit-node masquerading");
            root.delete_if_present("nat", &chain, &rule_args).await?;
        }
    }
    Ok(())
}
