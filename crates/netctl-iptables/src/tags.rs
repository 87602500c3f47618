//! Comment tags used to mark agent-authored rules for later identification.

/// Tag applied to the five rules installed when a local veth pair is
/// created.
pub const LOCAL_VETH: &str = "#local_veth#";

/// Tag applied to the INPUT ACCEPT rule opened for a peer's WireGuard
/// listen port, parameterized by the interface name.
#[must_use]
pub fn peer_tag(ifname: &str) -> String {
    format!("#peer_{ifname}#")
}

/// `--comment` match args for `LOCAL_VETH`, ready to append to a rule spec.
#[must_use]
pub fn local_veth_comment_args() -> Vec<String> {
    vec!["-m".to_string(), "comment".to_string(), "--comment".to_string(), LOCAL_VETH.to_string()]
}

/// `--comment` match args for a peer tag, ready to append to a rule spec.
#[must_use]
pub fn peer_comment_args(ifname: &str) -> Vec<String> {
    vec!["-m".to_string(), "comment".to_string(), "--comment".to_string(), peer_tag(ifname)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_tag_is_parameterized() {
        assert_eq!(peer_tag("netA-7"), "#peer_netA-7#");
    }
}
