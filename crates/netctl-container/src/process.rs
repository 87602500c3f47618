use tracing::warn;

use netctl_proc::{run, run_checked, AllowedProgram};

use crate::inspect::parse_inspect;
use crate::{ContainerError, ContainerInfo, ContainerRuntime};

const CAPS: &str = "NET_ADMIN,CAP_NET_BIND_SERVICE,NET_RAW,NET_BROADCAST";

fn router_name(ns: &str) -> String {
    format!("{ns}-router")
}

fn unit_name(ns: &str) -> String {
    format!("networktools-{ns}-router")
}

/// Production [`ContainerRuntime`] shelling to rootless `podman`.
///
/// Shells out rather than going through a bollard/Docker-socket client
/// because the target here is rootless podman bound into a network
/// namespace, not a dockerd endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessContainerRuntime;

impl ContainerRuntime for ProcessContainerRuntime {
    async fn inspect(&self, ns: &str) -> Result<Option<ContainerInfo>, ContainerError> {
        let name = router_name(ns);
        let output = run(AllowedProgram::Podman, &["inspect", &name]).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(parse_inspect(&output.stdout_lossy())?))
    }

    async fn start(&self, ns: &str, router_bind_dir: &str) -> Result<String, ContainerError> {
        let name = router_name(ns);
        let network = format!("ns:/var/run/netns/{ns}");
        let bind = format!("{router_bind_dir}:/data:ro");

        let stdout = run_checked(
            AllowedProgram::Podman,
            &[
                "create",
                "--network",
                &network,
                "--cap-add",
                CAPS,
                "-v",
                &bind,
                "--name",
                &name,
                "bird-router",
            ],
        )
        .await?;
        let container_id = stdout.trim().to_string();

        run_checked(
            AllowedProgram::SystemdRun,
            &[
                &format!("--unit={}", unit_name(ns)),
                "--collect",
                "--property=Type=forking",
                "--property=KillMode=none",
                "podman",
                "start",
                &container_id,
            ],
        )
        .await?;

        Ok(container_id)
    }

    async fn shutdown(&self, ns: &str, clear_temp_dir: Option<&str>) -> Result<(), ContainerError> {
        let unit = format!("{}.service", unit_name(ns));
        match run(AllowedProgram::Systemctl, &["stop", &unit]).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(ns, stderr = %output.stderr_lossy(), "systemctl stop reported failure"),
            Err(error) => warn!(ns, %error, "failed to invoke systemctl stop"),
        }

        run_checked(AllowedProgram::Podman, &["rm", "-f", &router_name(ns)]).await?;

        if let Some(path) = clear_temp_dir {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|source| ContainerError::TempDirRemoval { path: path.to_string(), source })?;
        }

        Ok(())
    }

    async fn reload(&self, container_id: &str) -> Result<(), ContainerError> {
        run_checked(AllowedProgram::Podman, &["exec", container_id, "birdc", "configure"]).await?;
        Ok(())
    }

    async fn ospf_state(&self, container_id: &str) -> Result<String, ContainerError> {
        let stdout =
            run_checked(AllowedProgram::Podman, &["exec", container_id, "birdc", "show", "ospf", "state", "all"])
                .await?;
        Ok(stdout)
    }
}
