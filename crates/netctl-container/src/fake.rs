use std::collections::HashMap;
use std::sync::Mutex;

use crate::{ContainerError, ContainerInfo, ContainerRuntime};

#[derive(Debug, Clone)]
struct FakeContainer {
    info: ContainerInfo,
    reload_count: u32,
}

/// In-memory [`ContainerRuntime`] for tests. `start` always succeeds and
/// marks the container running immediately; `shutdown` removes it.
#[derive(Debug, Default)]
pub struct FakeContainerRuntime {
    containers: Mutex<HashMap<String, FakeContainer>>,
    next_id: Mutex<u64>,
    ospf_state: Mutex<String>,
}

impl FakeContainerRuntime {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `reload` has been called for `ns`'s container.
    #[must_use]
    pub fn reload_count(&self, ns: &str) -> u32 {
        self.containers.lock().expect("fake container lock poisoned").get(ns).map_or(0, |c| c.reload_count)
    }

    /// Sets the raw text `ospf_state` returns on every subsequent call.
    pub fn set_ospf_state(&self, text: impl Into<String>) {
        *self.ospf_state.lock().expect("fake container lock poisoned") = text.into();
    }
}

impl ContainerRuntime for FakeContainerRuntime {
    async fn inspect(&self, ns: &str) -> Result<Option<ContainerInfo>, ContainerError> {
        Ok(self.containers.lock().expect("fake container lock poisoned").get(ns).map(|c| c.info.clone()))
    }

    async fn start(&self, ns: &str, router_bind_dir: &str) -> Result<String, ContainerError> {
        let mut next_id = self.next_id.lock().expect("fake container lock poisoned");
        *next_id += 1;
        let id = format!("fake-container-{next_id}");

        let info =
            ContainerInfo { id: id.clone(), status: "running".to_string(), binds: vec![format!("{router_bind_dir}:/data:ro")] };
        self.containers
            .lock()
            .expect("fake container lock poisoned")
            .insert(ns.to_string(), FakeContainer { info, reload_count: 0 });
        Ok(id)
    }

    async fn shutdown(&self, ns: &str, _clear_temp_dir: Option<&str>) -> Result<(), ContainerError> {
        self.containers.lock().expect("fake container lock poisoned").remove(ns);
        Ok(())
    }

    async fn reload(&self, container_id: &str) -> Result<(), ContainerError> {
        let mut containers = self.containers.lock().expect("fake container lock poisoned");
        if let Some(container) = containers.values_mut().find(|c| c.info.id == container_id) {
            container.reload_count += 1;
        }
        Ok(())
    }

    async fn ospf_state(&self, _container_id: &str) -> Result<String, ContainerError> {
        Ok(self.ospf_state.lock().expect("fake container lock poisoned").clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_then_inspect_reports_running() {
        let runtime = FakeContainerRuntime::new();
        let id = runtime.start("netA", "/tmp/networktools-netA/router").await.expect("start");
        let info = runtime.inspect("netA").await.expect("inspect").expect("present");
        assert_eq!(info.id, id);
        assert!(info.is_running());
    }

    #[tokio::test]
    async fn inspect_of_unknown_namespace_is_none() {
        let runtime = FakeContainerRuntime::new();
        assert!(runtime.inspect("netZ").await.expect("inspect").is_none());
    }

    #[tokio::test]
    async fn shutdown_removes_the_container() {
        let runtime = FakeContainerRuntime::new();
        runtime.start("netA", "/tmp/x").await.expect("start");
        runtime.shutdown("netA", None).await.expect("shutdown");
        assert!(runtime.inspect("netA").await.expect("inspect").is_none());
    }

    #[tokio::test]
    async fn reload_increments_the_counter() {
        let runtime = FakeContainerRuntime::new();
        let id = runtime.start("netA", "/tmp/x").await.expect("start");
        runtime.reload(&id).await.expect("reload");
        runtime.reload(&id).await.expect("reload");
        assert_eq!(runtime.reload_count("netA"), 2);
    }

    #[tokio::test]
    async fn ospf_state_returns_the_programmed_fixture() {
        let runtime = FakeContainerRuntime::new();
        runtime.set_ospf_state("area 0.0.0.0\n\trouter 1.1.1.1\n");
        let text = runtime.ospf_state("fake-container-1").await.expect("ospf_state");
        assert!(text.starts_with("area 0.0.0.0"));
    }
}
