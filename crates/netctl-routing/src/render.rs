use std::collections::BTreeMap;

/// Per-interface OSPF participation within one area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfInterfaceConfig {
    /// Static link cost; omitted from the emitted block if `None`.
    pub cost: Option<u32>,
    /// Interface type, e.g. `"ptp"`.
    pub iface_type: Option<String>,
    /// Cryptographic authentication key, if set. Rendered as HMAC-SHA-512.
    pub auth: Option<String>,
}

/// Per-interface BFD timers. Any field left `None` falls back to the
/// routing daemon's own default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BfdInterfaceConfig {
    /// Minimum receive interval, in milliseconds.
    pub interval_ms: Option<u32>,
    /// Minimum transmit interval, in milliseconds.
    pub tx_ms: Option<u32>,
    /// Minimum receive interval override, in milliseconds.
    pub rx_ms: Option<u32>,
    /// Idle-session transmit interval, in milliseconds.
    pub idle_ms: Option<u32>,
    /// Detection multiplier.
    pub multiplier: Option<u32>,
}

/// Full input to the routing-daemon configuration renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingConfig {
    /// `router id` statement; omitted if `None`.
    pub router_id: Option<String>,
    /// Interfaces advertised via a `protocol direct` block.
    pub direct_interface_names: Vec<String>,
    /// CIDRs rejected by the OSPF import filter. Empty means "import all".
    pub ospf_import_exclude_cidrs: Vec<String>,
    /// CIDRs rejected by the OSPF export filter. Empty means "export all".
    pub ospf_export_exclude_cidrs: Vec<String>,
    /// Area id -> interface name -> that interface's OSPF participation.
    pub ospf_area_config: BTreeMap<String, BTreeMap<String, OspfInterfaceConfig>>,
    /// Interface name -> BFD timers, for interfaces running BFD.
    pub bfd_config: BTreeMap<String, BfdInterfaceConfig>,
    /// Emits `debug protocols all;` when true.
    pub debug_protocols: bool,
    /// Suppresses the `log syslog all;` statement when true.
    pub disable_logging: bool,
    /// Embedded as a header comment, if present.
    pub git_version: Option<String>,
    /// Embedded as a header comment timestamp. Tests should pass a fixed
    /// value (or `None`) to keep rendering deterministic.
    pub generated_at: Option<String>,
}

/// Renders `config` to BIRD-style OSPFv2 + BFD configuration text.
///
/// Deterministic given identical input (the only non-deterministic input
/// is `generated_at`, which callers control directly).
#[must_use]
pub fn render(config: &RoutingConfig) -> String {
    reformat(&render_raw(config))
}

fn render_raw(config: &RoutingConfig) -> String {
    let mut lines: Vec<String> = Vec::new();

    if config.git_version.is_some() || config.generated_at.is_some() {
        lines.push(format!(
            "# generated {} {}",
            config.generated_at.as_deref().unwrap_or(""),
            config.git_version.as_deref().map_or(String::new(), |v| format!("({v})")),
        ));
    }

    if config.disable_logging {
        lines.push("log \"/dev/null\" all;".to_string());
    } else {
        lines.push("log syslog all;".to_string());
    }

    if config.debug_protocols {
        lines.push("debug protocols all;".to_string());
    }

    if let Some(router_id) = &config.router_id {
        lines.push(format!("router id {router_id};"));
    }

    if !config.direct_interface_names.is_empty() {
        lines.push("protocol direct {".to_string());
        let quoted: Vec<String> = config.direct_interface_names.iter().map(|n| format!("\"{n}\"")).collect();
        lines.push(format!("interface {};", quoted.join(", ")));
        lines.push("}".to_string());
    }

    let (import_preamble, import_clause) = render_filter("import", &config.ospf_import_exclude_cidrs);
    let (export_preamble, export_clause) = render_filter("export", &config.ospf_export_exclude_cidrs);
    lines.extend(import_preamble);
    lines.extend(export_preamble);

    lines.push("protocol ospf v2 {".to_string());
    lines.push(format!("{import_clause};"));
    lines.push(format!("{export_clause};"));
    for (area_id, interfaces) in &config.ospf_area_config {
        lines.push(format!("area {area_id} {{"));
        for (ifname, iface) in interfaces {
            lines.push(format!("interface \"{ifname}\" {{"));
            if config.bfd_config.contains_key(ifname) {
                lines.push("bfd yes;".to_string());
            }
            if let Some(cost) = iface.cost {
                lines.push(format!("cost {cost};"));
            }
            if let Some(iface_type) = &iface.iface_type {
                lines.push(format!("type {iface_type};"));
            }
            if let Some(auth) = &iface.auth {
                lines.push("authentication cryptographic;".to_string());
                lines.push(format!("password \"{auth}\" {{ algorithm hmac sha512; }};"));
            }
            lines.push("};".to_string());
        }
        lines.push("};".to_string());
    }
    lines.push("}".to_string());

    if !config.bfd_config.is_empty() {
        lines.push("protocol bfd {".to_string());
        for (ifname, bfd) in &config.bfd_config {
            lines.push(format!("interface \"{ifname}\" {{"));
            if let Some(ms) = bfd.rx_ms {
                lines.push(format!("min rx interval {ms}ms;"));
            }
            if let Some(ms) = bfd.tx_ms {
                lines.push(format!("min tx interval {ms}ms;"));
            }
            if let Some(ms) = bfd.interval_ms {
                lines.push(format!("interval {ms}ms;"));
            }
            if let Some(ms) = bfd.idle_ms {
                lines.push(format!("idle tx interval {ms}ms;"));
            }
            if let Some(multiplier) = bfd.multiplier {
                lines.push(format!("multiplier {multiplier};"));
            }
            lines.push("};".to_string());
        }
        lines.push("}".to_string());
    }

    lines.join("\n")
}

/// Builds the top-level `define`/`filter` preamble for one direction, plus
/// the `import`/`export` clause body (without a trailing semicolon) to
/// embed in the `protocol ospf` block.
fn render_filter(direction: &str, exclude_cidrs: &[String]) -> (Vec<String>, String) {
    if exclude_cidrs.is_empty() {
        return (Vec::new(), format!("{direction} all"));
    }

    let set_name = format!("OSPF_{}_EXCLUDE", direction.to_uppercase());
    let filter_name = format!("ospf_{direction}_filter");
    let mut preamble = vec![format!("define {set_name} = [ {} ];", exclude_cidrs.join(", "))];
    preamble.push(format!("filter {filter_name} {{"));
    preamble.push(format!("if net !~ {set_name} then accept;"));
    preamble.push("reject;".to_string());
    preamble.push("}".to_string());

    (preamble, format!("{direction} filter {filter_name}"))
}

/// Reformats unindented, one-statement-per-line text with 2-space
/// indentation by tracking brace depth: a line that opens a `{` increases
/// the depth of everything after it; a line starting with `}` is
/// dedented before being printed.
fn reformat(raw: &str) -> String {
    let mut depth: usize = 0;
    let mut out = String::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push('\n');
            continue;
        }

        let closes_first = trimmed.starts_with('}');
        let this_depth = if closes_first { depth.saturating_sub(1) } else { depth };
        out.push_str(&"  ".repeat(this_depth));
        out.push_str(trimmed);
        out.push('\n');

        let opens = trimmed.matches('{').count();
        let closes = trimmed.matches('}').count();
        depth = depth.saturating_add(opens).saturating_sub(closes);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_config() -> RoutingConfig {
        let mut area = BTreeMap::new();
        area.insert("netA-7".to_string(), OspfInterfaceConfig { cost: Some(1000), iface_type: Some("ptp".to_string()), auth: None });
        let mut areas = BTreeMap::new();
        areas.insert("0".to_string(), area);
        let mut bfd = BTreeMap::new();
        bfd.insert("netA-7".to_string(), BfdInterfaceConfig { idle_ms: Some(5000), interval_ms: Some(1000), multiplier: Some(5), ..Default::default() });

        RoutingConfig { ospf_area_config: areas, bfd_config: bfd, ..Default::default() }
    }

    #[test]
    fn renders_bfd_and_cost_for_one_peer() {
        let text = render(&minimal_config());
        assert!(text.contains("interface \"netA-7\" {\n      bfd yes;\n      cost 1000;\n      type ptp;"));
        assert!(text.contains("protocol bfd {"));
    }

    #[test]
    fn empty_exclude_list_renders_import_all() {
        let config = RoutingConfig::default();
        let text = render(&config);
        assert!(text.contains("import all;"));
        assert!(text.contains("export all;"));
        assert!(!text.contains("define OSPF_IMPORT_EXCLUDE"));
    }

    #[test]
    fn non_empty_exclude_list_defines_a_named_set() {
        let config = RoutingConfig {
            ospf_import_exclude_cidrs: vec!["10.0.0.0/30".to_string()],
            ..Default::default()
        };
        let text = render(&config);
        assert!(text.contains("define OSPF_IMPORT_EXCLUDE = [ 10.0.0.0/30 ];"));
        assert!(text.contains("import filter ospf_import_filter;"));
    }

    #[test]
    fn authentication_emits_hmac_sha512() {
        let mut area = BTreeMap::new();
        area.insert("netA-7".to_string(), OspfInterfaceConfig { cost: Some(10), iface_type: Some("ptp".to_string()), auth: Some("secret".to_string()) });
        let mut areas = BTreeMap::new();
        areas.insert("0".to_string(), area);
        let config = RoutingConfig { ospf_area_config: areas, ..Default::default() };
        let text = render(&config);
        assert!(text.contains("password \"secret\" { algorithm hmac sha512; };"));
    }

    #[test]
    fn rendering_is_deterministic_for_identical_input() {
        let config = minimal_config();
        assert_eq!(render(&config), render(&config));
    }

    #[test]
    fn indentation_tracks_brace_depth() {
        let text = render(&minimal_config());
        for line in text.lines() {
            assert!(!line.starts_with('\t'), "should use spaces, not tabs: {line:?}");
        }
    }
}
