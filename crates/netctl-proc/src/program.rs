/// The binaries this agent is allowed to invoke, matching the runtime
/// dependency list: `ip`, `iptables`, `iptables-save`, `sysctl`, `wg`,
/// `ping`, `podman`, `systemctl`, `systemd-run`, `birdc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AllowedProgram {
    /// `ip` — link/address/namespace management.
    Ip,
    /// `iptables` — single rule/chain operations.
    Iptables,
    /// `iptables-save` — full table dump.
    IptablesSave,
    /// `sysctl` — kernel forwarding toggles.
    Sysctl,
    /// `wg` — WireGuard configuration and state dump.
    Wg,
    /// `ping` — ICMP liveness probing.
    Ping,
    /// `podman` — routing-daemon container lifecycle.
    Podman,
    /// `systemctl` — supervisor unit stop/status.
    Systemctl,
    /// `systemd-run` — supervisor unit creation.
    SystemdRun,
    /// `birdc` — routing daemon control socket, invoked inside the container.
    Birdc,
    /// `sudo` — privilege escalation wrapper.
    Sudo,
}

impl AllowedProgram {
    /// The program name as looked up on `PATH`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Iptables => "iptables",
            Self::IptablesSave => "iptables-save",
            Self::Sysctl => "sysctl",
            Self::Wg => "wg",
            Self::Ping => "ping",
            Self::Podman => "podman",
            Self::Systemctl => "systemctl",
            Self::SystemdRun => "systemd-run",
            Self::Birdc => "birdc",
            Self::Sudo => "sudo",
        }
    }
}

impl std::fmt::Display for AllowedProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
