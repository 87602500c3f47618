use std::collections::HashMap;
use std::io::Write as _;

use ipnet::Ipv4Net;
use netctl_proc::{run_in_ns, run_in_ns_checked, AllowedProgram};
use netctl_types::{veth_host_ns, ObservedInterfaceState, ObservedWireGuardState};
use tracing::{debug, warn};

use crate::backend::{AssignWireguardParams, LinkBackend};
use crate::wg_dump;
use crate::LinkError;

/// A [`LinkBackend`] that shells out to `ip` and `wg` via [`netctl_proc`].
///
/// This is the only implementation of the trait that touches the kernel;
/// everywhere else in this crate and its callers, `LinkBackend` is an
/// associated type parameter so reconciliation logic can run against
/// [`crate::fake::FakeLinkBackend`] instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLinkBackend;

/// Writes `private_key` to a private, auto-deleted temp file and returns its
/// path as a string, for one-shot use with `wg set ... private-key <path>`.
///
/// The file is deleted as soon as the returned guard drops, including on
/// every early-return/panic unwind path, since a WireGuard private key must
/// never outlive the single command that consumes it.
fn write_private_key_tempfile(private: &str) -> Result<tempfile::NamedTempFile, LinkError> {
    let mut file = tempfile::NamedTempFile::new().map_err(LinkError::TempFile)?;
    file.write_all(private.as_bytes()).map_err(LinkError::TempFile)?;
    file.flush().map_err(LinkError::TempFile)?;
    Ok(file)
}

/// Resolves `endpoint` (`host:port`) to a dialable `ip:port` string,
/// preferring an IPv4 result and falling back to the first IPv6 result
/// wrapped in brackets, as `wg set ... endpoint` expects.
async fn resolve_endpoint(endpoint: &str) -> Result<String, LinkError> {
    let addrs: Vec<std::net::SocketAddr> = tokio::net::lookup_host(endpoint)
        .await
        .map_err(|source| LinkError::EndpointResolution {
            endpoint: endpoint.to_string(),
            source,
        })?
        .collect();

    let chosen = addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .ok_or_else(|| LinkError::EndpointResolution {
            endpoint: endpoint.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses returned"),
        })?;

    Ok(match chosen {
        std::net::SocketAddr::V4(v4) => v4.to_string(),
        std::net::SocketAddr::V6(v6) => format!("[{}]:{}", v6.ip(), v6.port()),
    })
}

#[derive(serde::Deserialize)]
struct IpAddrInfo {
    family: String,
    local: String,
    prefixlen: u8,
}

#[derive(serde::Deserialize)]
struct IpLinkShow {
    ifname: String,
    mtu: u32,
    #[serde(default)]
    addr_info: Vec<IpAddrInfo>,
}

impl LinkBackend for ProcessLinkBackend {
    async fn create_wireguard(&self, ns: &str, name: &str, addr_cidr: Ipv4Net, mtu: u16) -> Result<(), LinkError> {
        run_in_ns_checked("", AllowedProgram::Ip, &["link", "add", name, "type", "wireguard"]).await?;
        if !ns.is_empty() {
            run_in_ns_checked("", AllowedProgram::Ip, &["link", "set", name, "netns", ns]).await?;
        }
        run_in_ns_checked(
            ns,
            AllowedProgram::Ip,
            &["addr", "add", &addr_cidr.to_string(), "dev", name],
        )
        .await?;
        run_in_ns_checked(ns, AllowedProgram::Ip, &["link", "set", name, "mtu", &mtu.to_string()]).await?;
        debug!(ns, name, %addr_cidr, mtu, "created wireguard device");
        Ok(())
    }

    async fn assign_wireguard(&self, ns: &str, name: &str, params: AssignWireguardParams<'_>) -> Result<(), LinkError> {
        let key_file = write_private_key_tempfile(params.private)?;
        let key_path = key_file.path().to_string_lossy().into_owned();

        let mut args: Vec<String> = vec!["set".to_string(), name.to_string(), "private-key".to_string(), key_path];
        if let Some(port) = params.listen_port {
            args.push("listen-port".to_string());
            args.push(port.to_string());
        }
        if let Some(peer) = params.peer_public {
            args.push("peer".to_string());
            args.push(peer.to_string());
            if let Some(endpoint) = params.endpoint {
                let resolved = resolve_endpoint(endpoint).await?;
                args.push("endpoint".to_string());
                args.push(resolved);
            }
            if let Some(keepalive) = params.keepalive {
                args.push("persistent-keepalive".to_string());
                args.push(keepalive.to_string());
            }
            if let Some(allowed) = params.allowed_ips {
                args.push("allowed-ips".to_string());
                args.push(if allowed.is_empty() { "0.0.0.0/0".to_string() } else { allowed.join(",") });
            }
        }

        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = run_in_ns_checked(ns, AllowedProgram::Wg, &borrowed).await;

        // The key file is dropped (and deleted) here regardless of outcome.
        drop(key_file);
        result.map(|_| ()).map_err(LinkError::from)
    }

    async fn up(&self, ns: &str, name: &str) -> Result<(), LinkError> {
        run_in_ns_checked(ns, AllowedProgram::Ip, &["link", "set", name, "up"]).await?;
        Ok(())
    }

    async fn create_veth(&self, ns: &str, base_name: &str, cidr: Ipv4Net) -> Result<(), LinkError> {
        let host_name = format!("{base_name}0");
        let ns_name = format!("{base_name}1");
        let (host_addr, ns_addr) = veth_host_ns(cidr)?;
        let prefix = cidr.prefix_len();

        run_in_ns_checked(
            "",
            AllowedProgram::Ip,
            &["link", "add", &host_name, "type", "veth", "peer", "name", &ns_name],
        )
        .await?;

        if !ns.is_empty() {
            run_in_ns_checked("", AllowedProgram::Ip, &["link", "set", &ns_name, "netns", ns]).await?;
        }

        run_in_ns_checked(
            "",
            AllowedProgram::Ip,
            &["addr", "add", &format!("{host_addr}/{prefix}"), "dev", &host_name],
        )
        .await?;
        run_in_ns_checked("", AllowedProgram::Ip, &["link", "set", &host_name, "up"]).await?;

        run_in_ns_checked(
            ns,
            AllowedProgram::Ip,
            &["addr", "add", &format!("{ns_addr}/{prefix}"), "dev", &ns_name],
        )
        .await?;
        run_in_ns_checked(ns, AllowedProgram::Ip, &["link", "set", &ns_name, "up"]).await?;

        debug!(ns, base_name, %cidr, "created veth pair");
        Ok(())
    }

    async fn try_destroy(&self, ns: &str, name: &str) -> Result<(), LinkError> {
        let probe = run_in_ns(ns, AllowedProgram::Ip, &["link", "show", name]).await?;
        if !probe.success() {
            return Ok(());
        }
        let outcome = run_in_ns(ns, AllowedProgram::Ip, &["link", "delete", name]).await?;
        if !outcome.success() {
            warn!(ns, name, stderr = %outcome.stderr_lossy(), "failed to delete interface");
        }
        Ok(())
    }

    async fn dump_all_wireguard(&self, ns: &str) -> Result<HashMap<String, ObservedWireGuardState>, LinkError> {
        let output = run_in_ns(ns, AllowedProgram::Wg, &["show", "all", "dump"]).await?;
        if !output.success() {
            return Ok(HashMap::new());
        }
        wg_dump::parse_dump_all(&output.stdout_lossy())
    }

    async fn dump_wireguard(&self, ns: &str, name: &str) -> Result<Option<ObservedWireGuardState>, LinkError> {
        let output = run_in_ns(ns, AllowedProgram::Wg, &["show", name, "dump"]).await?;
        if !output.success() {
            return Ok(None);
        }
        wg_dump::parse_single(&output.stdout_lossy())
    }

    async fn get_interface_state(&self, ns: &str, name: &str) -> Result<Option<ObservedInterfaceState>, LinkError> {
        let output = run_in_ns(ns, AllowedProgram::Ip, &["-j", "addr", "show", name]).await?;
        if !output.success() {
            return Ok(None);
        }
        let text = output.stdout_lossy();
        let parsed = match serde_json::from_str::<Vec<IpLinkShow>>(&text) {
            Ok(parsed) => parsed,
            Err(first_error) => {
                warn!(ns, name, error = %first_error, "ip -j addr show did not parse, retrying once");
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                let retry = run_in_ns(ns, AllowedProgram::Ip, &["-j", "addr", "show", name]).await?;
                if !retry.success() {
                    return Ok(None);
                }
                serde_json::from_str(&retry.stdout_lossy()).map_err(|source| LinkError::Parse {
                    command: "ip -j addr show",
                    reason: source.to_string(),
                })?
            }
        };
        let Some(entry) = parsed.into_iter().next() else {
            return Ok(None);
        };

        let address = entry
            .addr_info
            .iter()
            .find(|a| a.family == "inet")
            .and_then(|a| format!("{}/{}", a.local, a.prefixlen).parse().ok());

        Ok(Some(ObservedInterfaceState {
            name: entry.ifname,
            mtu: entry.mtu,
            address,
        }))
    }
}
