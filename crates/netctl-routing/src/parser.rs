use std::collections::HashMap;
use std::iter::Peekable;

use netctl_types::{ExternalEntry, RouterInfo, StubnetEntry, VlinkEntry};

use crate::OspfParseError;

/// The full parsed OSPF LSDB: per-area router tables plus the
/// area-independent "other ASBRs" list `birdc` reports separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfState {
    /// Routers within each named area.
    pub area_routers: HashMap<String, Vec<RouterInfo>>,
    /// ASBRs reachable but not tied to a specific area.
    pub other_asbrs: Vec<RouterInfo>,
}

type Lines<'a> = Peekable<std::vec::IntoIter<(usize, &'a str)>>;

/// Parses `birdc show ospf state all` output.
///
/// The format is tab-indented recursive structure (area/ASBR block at
/// indent 0, `router <id>` headers at indent 1, typed entry lines at
/// indent 2). Parsing is a strict recursive descent over a peekable line
/// stream: blank lines are skipped at any depth, and encountering a line
/// whose indent is less than the current frame's expected indent ends
/// that frame without consuming the line.
///
/// # Errors
///
/// Returns [`OspfParseError`] if the structure or any typed entry doesn't
/// match the expected shape.
pub fn parse_ospf_state(text: &str) -> Result<OspfState, OspfParseError> {
    let entries: Vec<(usize, &str)> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let indent = line.chars().take_while(|c| *c == '\t').count();
            (indent, line.trim())
        })
        .collect();
    let mut lines: Lines<'_> = entries.into_iter().peekable();

    let mut state = OspfState::default();

    while let Some(&(indent, content)) = lines.peek() {
        if indent != 0 {
            return Err(OspfParseError::UnexpectedTopLevel { line: content.to_string() });
        }
        lines.next();

        if content == "other ASBRs" {
            state.other_asbrs = parse_routers(&mut lines, 1)?;
        } else if let Some(area_id) = content.strip_prefix("area ") {
            let routers = parse_routers(&mut lines, 1)?;
            state.area_routers.insert(area_id.trim().to_string(), routers);
        } else {
            return Err(OspfParseError::UnexpectedTopLevel { line: content.to_string() });
        }
    }

    Ok(state)
}

fn parse_routers(lines: &mut Lines<'_>, expected_indent: usize) -> Result<Vec<RouterInfo>, OspfParseError> {
    let mut routers = Vec::new();

    while let Some(&(indent, content)) = lines.peek() {
        if indent < expected_indent {
            return Ok(routers);
        }
        let Some(router_id) = content.strip_prefix("router ") else {
            return Err(OspfParseError::ExpectedRouterHeader { line: content.to_string() });
        };
        lines.next();

        let mut router = RouterInfo { router_id: router_id.trim().to_string(), ..RouterInfo::default() };
        parse_router_body(lines, expected_indent + 1, &mut router)?;
        routers.push(router);
    }

    Ok(routers)
}

fn parse_router_body(
    lines: &mut Lines<'_>,
    expected_indent: usize,
    router: &mut RouterInfo,
) -> Result<(), OspfParseError> {
    while let Some(&(indent, content)) = lines.peek() {
        if indent < expected_indent {
            return Ok(());
        }
        lines.next();

        let mut tokens = content.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();

        match keyword {
            "distance" => {
                let value = rest.first().ok_or(OspfParseError::MalformedEntry {
                    keyword: "distance",
                    line: content.to_string(),
                })?;
                router.distance = Some(parse_u32("distance", value)?);
            }
            "vlink" => router.vlinks.push(parse_adjacency("vlink", &rest, content)?),
            "router" => router.routers.push(parse_adjacency("router", &rest, content)?),
            "stubnet" => router.stubnets.push(parse_network_metric("stubnet", &rest, content)?),
            "xnetwork" => router.xnetworks.push(parse_network_metric("xnetwork", &rest, content)?),
            "xrouter" => router.xrouters.push(parse_network_metric("xrouter", &rest, content)?),
            "external" => router.externals.push(parse_external("external", &rest, content)?),
            "nssa-ext" => router.nssa_externals.push(parse_external("nssa-ext", &rest, content)?),
            _ => {
                return Err(OspfParseError::MalformedEntry { keyword: "entry", line: content.to_string() });
            }
        }
    }

    Ok(())
}

fn parse_u32(context: &'static str, value: &str) -> Result<u32, OspfParseError> {
    value
        .parse()
        .map_err(|_| OspfParseError::InvalidNumber { context, value: value.to_string() })
}

/// Parses `<id> metric <m>` for `vlink`/`router` adjacency lines.
fn parse_adjacency(keyword: &'static str, rest: &[&str], line: &str) -> Result<VlinkEntry, OspfParseError> {
    let (id, metric, _) = parse_metric_prefix(keyword, rest, line)?;
    Ok(VlinkEntry { id, metric })
}

/// Parses `<network> metric <m>` for `stubnet`/`xnetwork`/`xrouter` lines.
fn parse_network_metric(keyword: &'static str, rest: &[&str], line: &str) -> Result<StubnetEntry, OspfParseError> {
    let (network, metric, _) = parse_metric_prefix(keyword, rest, line)?;
    Ok(StubnetEntry { network, metric })
}

/// Parses `<network> metric <m> [metric2] [via <addr>] [tag <t>]` for
/// `external`/`nssa-ext` lines.
fn parse_external(keyword: &'static str, rest: &[&str], line: &str) -> Result<ExternalEntry, OspfParseError> {
    let (network, metric, extras) = parse_metric_prefix(keyword, rest, line)?;
    let metric_type = if extras.contains(&"metric2") { 2 } else { 1 };
    let via = find_following(&extras, "via").map(str::to_string);
    let tag = find_following(&extras, "tag").map(str::to_string);
    Ok(ExternalEntry { network, metric, metric_type, via, tag })
}

fn find_following<'a>(tokens: &[&'a str], keyword: &str) -> Option<&'a str> {
    tokens.iter().position(|t| *t == keyword).and_then(|i| tokens.get(i + 1).copied())
}

/// Shared shape for `<value> metric <m> ...`: returns `(value, metric, remaining tokens)`.
fn parse_metric_prefix<'a>(
    keyword: &'static str,
    rest: &[&'a str],
    line: &str,
) -> Result<(String, u32, Vec<&'a str>), OspfParseError> {
    let malformed = || OspfParseError::MalformedEntry { keyword, line: line.to_string() };
    let value = rest.first().ok_or_else(malformed)?;
    if rest.get(1) != Some(&"metric") {
        return Err(malformed());
    }
    let metric_str = rest.get(2).ok_or_else(malformed)?;
    let metric = parse_u32(keyword, metric_str)?;
    Ok(((*value).to_string(), metric, rest[3..].to_vec()))
}
