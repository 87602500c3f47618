use serde::Deserialize;

use crate::ContainerError;

/// The fields this agent reads off a `podman inspect` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Full container ID.
    pub id: String,
    /// `State.Status`, e.g. `"running"`, `"exited"`, `"created"`.
    pub status: String,
    /// `HostConfig.Binds`, as `host:container[:opts]` strings.
    pub binds: Vec<String>,
}

impl ContainerInfo {
    /// Whether `State.Status` is `"running"`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

#[derive(Debug, Deserialize)]
struct RawInspect {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "State")]
    state: RawState,
    #[serde(rename = "HostConfig")]
    host_config: RawHostConfig,
}

#[derive(Debug, Deserialize)]
struct RawState {
    #[serde(rename = "Status")]
    status: String,
}

#[derive(Debug, Deserialize)]
struct RawHostConfig {
    #[serde(rename = "Binds", default)]
    binds: Vec<String>,
}

/// Parses the output of `podman inspect {name}`, which is always a JSON
/// array even for a single container.
///
/// # Errors
///
/// Returns [`ContainerError::Parse`] if `stdout` isn't a well-formed
/// inspect array, or is empty.
pub fn parse_inspect(stdout: &str) -> Result<ContainerInfo, ContainerError> {
    let records: Vec<RawInspect> = serde_json::from_str(stdout)
        .map_err(|source| ContainerError::Parse { detail: source.to_string() })?;
    let record = records
        .into_iter()
        .next()
        .ok_or_else(|| ContainerError::Parse { detail: "empty inspect array".to_string() })?;

    Ok(ContainerInfo { id: record.id, status: record.state.status, binds: record.host_config.binds })
}
