use uuid::Uuid;

use crate::supervisor::Supervisor;
use crate::RelayError;

/// Starts and stops `gost` relay-worker units through a [`Supervisor`].
///
/// Holds no state of its own beyond the path to the `gost` binary; the
/// record of which units are running belongs to the caller's persistent
/// store, keyed by the unit name this returns.
#[derive(Debug)]
pub struct RelayManager<S> {
    supervisor: S,
    gost_path: String,
}

impl<S: Supervisor> RelayManager<S> {
    /// Creates a manager that launches `{install_dir}/bin/gost` units
    /// through `supervisor`.
    pub fn new(supervisor: S, install_dir: impl AsRef<str>) -> Self {
        Self { supervisor, gost_path: format!("{}/bin/gost", install_dir.as_ref()) }
    }

    /// Starts a client-mode relay worker: listens on `listen_port` for the
    /// local WireGuard endpoint and forwards to `dst_host:dst_port` over
    /// `relay+tls`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] if the supervisor could not create the unit.
    pub async fn start_client(
        &self,
        ns: &str,
        listen_port: u16,
        dst_host: &str,
        dst_port: u16,
    ) -> Result<String, RelayError> {
        let unit_name = format!("networktools-{ns}-worker-{}", Uuid::new_v4());
        let args = vec![
            format!("-L=udp://:{listen_port}?keepAlive=true&ttl=120"),
            format!("-F=relay+tls://{dst_host}:{dst_port}"),
        ];
        self.supervisor.start_unit(&unit_name, &self.gost_path, &args).await?;
        Ok(unit_name)
    }

    /// Starts a server-mode relay worker: accepts `relay+tls` connections
    /// on `listen_port` and forwards to the local WireGuard listener on
    /// `wg_listen_port`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] if the supervisor could not create the unit.
    pub async fn start_server(&self, ns: &str, listen_port: u16, wg_listen_port: u16) -> Result<String, RelayError> {
        let unit_name = format!("networktools-{ns}-worker-{}", Uuid::new_v4());
        let args = vec![format!("-L=relay+tls://:{listen_port}/127.0.0.1:{wg_listen_port}")];
        self.supervisor.start_unit(&unit_name, &self.gost_path, &args).await?;
        Ok(unit_name)
    }

    /// Stops `unit_name`. Best-effort: the caller deletes its store record
    /// regardless of whether this succeeds.
    pub async fn stop(&self, unit_name: &str) {
        self.supervisor.stop_unit(unit_name).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeSupervisor;

    fn manager() -> RelayManager<FakeSupervisor> {
        RelayManager::new(FakeSupervisor::new(), "/opt/networktools")
    }

    #[tokio::test]
    async fn client_unit_carries_keepalive_and_forward_target() {
        let mgr = manager();
        let unit = mgr.start_client("netA", 51001, "relay.example.com", 8443).await.expect("start");
        assert!(unit.starts_with("networktools-netA-worker-"));

        let started = mgr.supervisor.get(&unit).expect("recorded");
        assert_eq!(started.program, "/opt/networktools/bin/gost");
        assert_eq!(started.args[0], "-L=udp://:51001?keepAlive=true&ttl=120");
        assert_eq!(started.args[1], "-F=relay+tls://relay.example.com:8443");
    }

    #[tokio::test]
    async fn server_unit_forwards_to_local_wireguard_port() {
        let mgr = manager();
        let unit = mgr.start_server("netB", 8443, 51820).await.expect("start");

        let started = mgr.supervisor.get(&unit).expect("recorded");
        assert_eq!(started.args[0], "-L=relay+tls://:8443/127.0.0.1:51820");
    }

    #[tokio::test]
    async fn each_start_gets_a_unique_unit_name() {
        let mgr = manager();
        let first = mgr.start_client("netA", 1, "h", 2).await.expect("start");
        let second = mgr.start_client("netA", 1, "h", 2).await.expect("start");
        assert_ne!(first, second);
        assert_eq!(mgr.supervisor.running_count(), 2);
    }

    #[tokio::test]
    async fn stop_removes_the_unit_from_the_supervisor() {
        let mgr = manager();
        let unit = mgr.start_client("netA", 1, "h", 2).await.expect("start");
        mgr.stop(&unit).await;
        assert!(mgr.supervisor.get(&unit).is_none());
    }

    #[tokio::test]
    async fn stopping_an_already_gone_unit_is_not_an_error() {
        let mgr = manager();
        mgr.stop("networktools-netA-worker-does-not-exist").await;
    }
}
