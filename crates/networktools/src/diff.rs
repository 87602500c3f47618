//! Pure decision functions behind the reconciliation controller's diffs.
//!
//! Everything here is a plain function over already-observed/desired state;
//! no process invocation, persistence, or network I/O. The sequencing that
//! gathers the inputs and applies the resulting actions lives in
//! [`crate::reconcile`].

use netctl_types::{LocalUnderlayState, PeerUnderlayExtra, UnderlayProvider};

/// What to do about the exit-node `MASQUERADE` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitNodeAction {
    /// Rule already matches desired state.
    Noop,
    /// Desired but not present: append it.
    Add,
    /// Present but not desired: delete it.
    Remove,
}

/// Diffs the observed exit-node `MASQUERADE` rule against the desired flag.
#[must_use]
pub fn exit_node_diff(rule_present: bool, desired: bool) -> ExitNodeAction {
    match (rule_present, desired) {
        (true, false) => ExitNodeAction::Remove,
        (false, true) => ExitNodeAction::Add,
        _ => ExitNodeAction::Noop,
    }
}

/// What to do about the local veth pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VethAction {
    /// Veth presence already matches desired state.
    Noop,
    /// Desired but not present: create it and install its rules.
    Create,
    /// Present but not desired: destroy it and purge its rules.
    Destroy,
}

/// Diffs the observed veth pair against whether one is desired.
#[must_use]
pub fn veth_diff(observed_present: bool, desired_present: bool) -> VethAction {
    match (observed_present, desired_present) {
        (true, false) => VethAction::Destroy,
        (false, true) => VethAction::Create,
        _ => VethAction::Noop,
    }
}

/// What to do about a peer's underlay relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderlayAction {
    /// Local state already matches the desired underlay (or neither exists).
    Noop,
    /// No local state, but one is desired: start it.
    Create,
    /// Local state exists but parameters changed: tear down, then start.
    Recreate,
    /// Local state exists but none is desired any more: tear down.
    Stop,
}

/// Diffs a peer's locally persisted underlay state against the remote's
/// desired underlay configuration, implementing the four-state machine
/// `(local, remote) ∈ {(∅,∅), (∅,set), (set,∅), (set,set)}`.
#[must_use]
pub fn underlay_diff(local: Option<&LocalUnderlayState>, remote: Option<&PeerUnderlayExtra>) -> UnderlayAction {
    match (local, remote) {
        (None, None) => UnderlayAction::Noop,
        (None, Some(_)) => UnderlayAction::Create,
        (Some(_), None) => UnderlayAction::Stop,
        (Some(local), Some(remote)) => {
            if mode_changed(local, remote) || ports_changed(local, remote) || server_addr_changed(local, remote) {
                UnderlayAction::Recreate
            } else {
                UnderlayAction::Noop
            }
        }
    }
}

fn mode_changed(local: &LocalUnderlayState, remote: &PeerUnderlayExtra) -> bool {
    matches!(
        (local, remote.provider),
        (LocalUnderlayState::Client { .. }, UnderlayProvider::GostRelayServer)
            | (LocalUnderlayState::Server { .. }, UnderlayProvider::GostRelayClient)
    )
}

fn ports_changed(local: &LocalUnderlayState, remote: &PeerUnderlayExtra) -> bool {
    match local {
        LocalUnderlayState::Client { listen_port, server_port, .. } => {
            *listen_port != remote.listen_port || remote.server_port.is_some_and(|port| port != *server_port)
        }
        LocalUnderlayState::Server { listen_port, .. } => *listen_port != remote.listen_port,
    }
}

/// Only relevant in client mode: a non-empty `server_addr` that differs
/// from the address the client last resolved/dialed forces a recreate.
fn server_addr_changed(local: &LocalUnderlayState, remote: &PeerUnderlayExtra) -> bool {
    match local {
        LocalUnderlayState::Client { server_ip, .. } => {
            netctl_types::non_empty(&remote.server_addr).is_some_and(|addr| addr != server_ip)
        }
        LocalUnderlayState::Server { .. } => false,
    }
}

/// Computes the OSPF link cost per invariant 7: `clamp(1, floor(base +
/// offset), 65535)`, where `base` is the measured ping in milliseconds when
/// `prefer_ping` is set and a measurement exists, else the peer's
/// configured cost, else `1000`.
#[must_use]
pub fn ospf_cost(prefer_ping: bool, measured_ping_ms: Option<f64>, configured_cost: Option<u32>, offset: i32) -> u32 {
    let base = if prefer_ping { measured_ping_ms } else { None }
        .unwrap_or_else(|| f64::from(configured_cost.unwrap_or(1000)));
    let combined = (base + f64::from(offset)).floor();
    combined.clamp(1.0, 65535.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_node_noop_cases() {
        assert_eq!(exit_node_diff(true, true), ExitNodeAction::Noop);
        assert_eq!(exit_node_diff(false, false), ExitNodeAction::Noop);
    }

    #[test]
    fn exit_node_add_and_remove() {
        assert_eq!(exit_node_diff(false, true), ExitNodeAction::Add);
        assert_eq!(exit_node_diff(true, false), ExitNodeAction::Remove);
    }

    #[test]
    fn veth_create_and_destroy() {
        assert_eq!(veth_diff(false, true), VethAction::Create);
        assert_eq!(veth_diff(true, false), VethAction::Destroy);
        assert_eq!(veth_diff(true, true), VethAction::Noop);
        assert_eq!(veth_diff(false, false), VethAction::Noop);
    }

    fn client_state() -> LocalUnderlayState {
        LocalUnderlayState::Client {
            unit_name: "networktools-netA-worker-1".to_string(),
            listen_port: 51001,
            server_ip: "198.51.100.9".to_string(),
            server_port: 8443,
        }
    }

    fn client_extra() -> PeerUnderlayExtra {
        PeerUnderlayExtra {
            provider: UnderlayProvider::GostRelayClient,
            listen_port: 51001,
            server_addr: Some("198.51.100.9".to_string()),
            server_port: Some(8443),
        }
    }

    #[test]
    fn underlay_absent_both_sides_is_noop() {
        assert_eq!(underlay_diff(None, None), UnderlayAction::Noop);
    }

    #[test]
    fn underlay_desired_but_absent_locally_creates() {
        let remote = client_extra();
        assert_eq!(underlay_diff(None, Some(&remote)), UnderlayAction::Create);
    }

    #[test]
    fn underlay_present_but_no_longer_desired_stops() {
        let local = client_state();
        assert_eq!(underlay_diff(Some(&local), None), UnderlayAction::Stop);
    }

    #[test]
    fn underlay_unchanged_params_are_noop() {
        let local = client_state();
        let remote = client_extra();
        assert_eq!(underlay_diff(Some(&local), Some(&remote)), UnderlayAction::Noop);
    }

    #[test]
    fn underlay_mode_change_forces_recreate() {
        let local = client_state();
        let mut remote = client_extra();
        remote.provider = UnderlayProvider::GostRelayServer;
        assert_eq!(underlay_diff(Some(&local), Some(&remote)), UnderlayAction::Recreate);
    }

    #[test]
    fn underlay_server_addr_change_in_client_mode_forces_recreate() {
        let local = client_state();
        let mut remote = client_extra();
        remote.server_addr = Some("203.0.113.5".to_string());
        assert_eq!(underlay_diff(Some(&local), Some(&remote)), UnderlayAction::Recreate);
    }

    #[test]
    fn underlay_empty_server_addr_does_not_force_recreate() {
        let local = client_state();
        let mut remote = client_extra();
        remote.server_addr = Some(String::new());
        assert_eq!(underlay_diff(Some(&local), Some(&remote)), UnderlayAction::Noop);
    }

    #[test]
    fn ospf_cost_prefers_ping_when_enabled_and_available() {
        assert_eq!(ospf_cost(true, Some(12.6), Some(500), 0), 12);
    }

    #[test]
    fn ospf_cost_falls_back_to_configured_cost() {
        assert_eq!(ospf_cost(true, None, Some(500), 0), 500);
    }

    #[test]
    fn ospf_cost_falls_back_to_default_1000() {
        assert_eq!(ospf_cost(true, None, None, 0), 1000);
    }

    #[test]
    fn ospf_cost_ignores_ping_when_not_preferred() {
        assert_eq!(ospf_cost(false, Some(5.0), Some(200), 0), 200);
    }

    #[test]
    fn ospf_cost_applies_offset_then_clamps_low() {
        assert_eq!(ospf_cost(true, Some(1.0), None, -50), 1);
    }

    #[test]
    fn ospf_cost_clamps_high() {
        assert_eq!(ospf_cost(true, None, Some(70_000), 0), 65535);
    }
}
