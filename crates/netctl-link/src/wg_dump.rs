use std::collections::HashMap;

use netctl_types::{ObservedPeerState, ObservedWireGuardState};

use crate::LinkError;

fn absent_token(field: &str) -> Option<&str> {
    match field {
        "(none)" | "off" => None,
        other => Some(other),
    }
}

fn parse_fwmark(field: &str) -> u32 {
    if field == "off" {
        0
    } else {
        field.parse().unwrap_or(0)
    }
}

fn parse_peer_fields(fields: &[&str]) -> ObservedPeerState {
    ObservedPeerState {
        endpoint: absent_token(fields[2]).map(str::to_string),
        allowed_ips: fields[3].split(',').map(str::to_string).filter(|s| !s.is_empty()).collect(),
        latest_handshake: fields[4].parse().unwrap_or(0),
        rx_bytes: fields[5].parse().unwrap_or(0),
        tx_bytes: fields[6].parse().unwrap_or(0),
        persistent_keepalive: absent_token(fields[7]).and_then(|s| s.parse().ok()),
    }
}

/// Parses `wg show all dump` output: a header line per interface
/// (`iface private_key public_key listen_port fwmark`, 5 fields) followed
/// by one line per peer (`iface public_key preshared_key endpoint
/// allowed_ips latest_handshake rx tx keepalive`, 9 fields).
///
/// # Errors
///
/// Returns [`LinkError::Parse`] if a line has the wrong field count.
pub fn parse_dump_all(text: &str) -> Result<HashMap<String, ObservedWireGuardState>, LinkError> {
    let mut interfaces: HashMap<String, ObservedWireGuardState> = HashMap::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        let ifname = fields[0].to_string();

        match fields.len() {
            5 => {
                let state = ObservedWireGuardState {
                    private_key: absent_token(fields[1]).map(str::to_string),
                    public_key: absent_token(fields[2]).map(str::to_string),
                    listen_port: fields[3].parse().unwrap_or(0),
                    fwmark: parse_fwmark(fields[4]),
                    peers: HashMap::new(),
                };
                interfaces.insert(ifname, state);
            }
            9 => {
                let public_key = fields[1].to_string();
                let peer = parse_peer_fields(&fields[1..]);
                interfaces.entry(ifname).or_default().peers.insert(public_key, peer);
            }
            other => {
                return Err(LinkError::Parse {
                    command: "wg show all dump",
                    reason: format!("expected 5 or 9 tab-separated fields, got {other}: {line}"),
                });
            }
        }
    }

    Ok(interfaces)
}

/// Parses `wg show <name> dump` output: a header line (4 fields:
/// `private_key public_key listen_port fwmark`) followed by one line per
/// peer (8 fields: `public_key preshared_key endpoint allowed_ips
/// latest_handshake rx tx keepalive`).
///
/// # Errors
///
/// Returns [`LinkError::Parse`] if a line has the wrong field count.
pub fn parse_single(text: &str) -> Result<Option<ObservedWireGuardState>, LinkError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let Some(header) = lines.next() else {
        return Ok(None);
    };

    let header_fields: Vec<&str> = header.split('\t').collect();
    if header_fields.len() != 4 {
        return Err(LinkError::Parse {
            command: "wg show <name> dump",
            reason: format!("expected 4 header fields, got {}: {header}", header_fields.len()),
        });
    }

    let mut state = ObservedWireGuardState {
        private_key: absent_token(header_fields[0]).map(str::to_string),
        public_key: absent_token(header_fields[1]).map(str::to_string),
        listen_port: header_fields[2].parse().unwrap_or(0),
        fwmark: parse_fwmark(header_fields[3]),
        peers: HashMap::new(),
    };

    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 8 {
            return Err(LinkError::Parse {
                command: "wg show <name> dump",
                reason: format!("expected 8 peer fields, got {}: {line}", fields.len()),
            });
        }
        let public_key = fields[0].to_string();
        let peer = parse_peer_fields(&fields);
        state.peers.insert(public_key, peer);
    }

    Ok(Some(state))
}
