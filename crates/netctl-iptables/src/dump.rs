use crate::IptablesError;

/// One parsed `-A` rule line from an `iptables-save` table dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedRule {
    /// Chain the rule is appended to.
    pub chain: String,
    /// Rule arguments, with the leading `-A {chain}` tokens already stripped
    /// so they can be replayed directly after `-D {chain}`.
    pub args: Vec<String>,
}

/// A parsed `iptables-save` dump, one rule list per table.
#[derive(Debug, Clone, Default)]
pub struct IptablesDump {
    tables: std::collections::HashMap<String, Vec<DumpedRule>>,
}

impl IptablesDump {
    /// Rules recorded for `table`, empty if the table wasn't present.
    #[must_use]
    pub fn rules(&self, table: &str) -> &[DumpedRule] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }
}

/// Parses the full output of `iptables-save`.
///
/// `*`-lines (table headers) are consumed to track the current table;
/// `:`-lines (chain policy/defaults), comment lines (`#`), and `COMMIT`
/// lines are ignored. Every other non-blank line is expected to begin with
/// `-A <chain>`.
///
/// # Errors
///
/// Returns [`IptablesError::DumpParse`] if a rule line doesn't start with
/// `-A` or its quoting is unbalanced.
pub fn parse_dump(text: &str) -> Result<IptablesDump, IptablesError> {
    let mut dump = IptablesDump::default();
    let mut current_table: Option<String> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(':') {
            continue;
        }
        if let Some(table) = line.strip_prefix('*') {
            current_table = Some(table.trim().to_string());
            continue;
        }
        if line == "COMMIT" {
            current_table = None;
            continue;
        }

        let table = current_table.as_ref().ok_or_else(|| IptablesError::DumpParse {
            reason: format!("rule line before any table header: {line}"),
        })?;

        let tokens = tokenize(line)?;
        let mut iter = tokens.into_iter();
        let first = iter.next();
        if first.as_deref() != Some("-A") {
            return Err(IptablesError::DumpParse {
                reason: format!("expected rule line to start with -A: {line}"),
            });
        }
        let chain = iter.next().ok_or_else(|| IptablesError::DumpParse {
            reason: format!("rule line missing chain name: {line}"),
        })?;
        let args: Vec<String> = iter.collect();

        dump.tables
            .entry(table.clone())
            .or_default()
            .push(DumpedRule { chain, args });
    }

    Ok(dump)
}

/// Splits a rule line on whitespace, respecting double-quoted segments
/// (`iptables-save` quotes comment match strings).
fn tokenize(line: &str) -> Result<Vec<String>, IptablesError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(IptablesError::DumpParse {
            reason: format!("unbalanced quotes in rule line: {line}"),
        });
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_dump() {
        let input = "*nat\n:PREROUTING ACCEPT [0:0]\n:POSTROUTING ACCEPT [0:0]\n-A POSTROUTING -o eth0 -j MASQUERADE\nCOMMIT\n";
        let dump = parse_dump(input).expect("parse");
        let rules = dump.rules("nat");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].chain, "POSTROUTING");
        assert_eq!(rules[0].args, vec!["-o", "eth0", "-j", "MASQUERADE"]);
    }

    #[test]
    fn ignores_comment_and_commit_lines() {
        let input = "*filter\n# Generated\n:INPUT ACCEPT [0:0]\n-A INPUT -m comment --comment \"peer_netA-7\" -j ACCEPT\nCOMMIT\n";
        let dump = parse_dump(input).expect("parse");
        let rules = dump.rules("filter");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].args, vec!["-m", "comment", "--comment", "peer_netA-7", "-j", "ACCEPT"]);
    }

    #[test]
    fn multiple_tables_are_kept_separate() {
        let input = "*nat\n-A POSTROUTING -j MASQUERADE\nCOMMIT\n*filter\n-A INPUT -j ACCEPT\nCOMMIT\n";
        let dump = parse_dump(input).expect("parse");
        assert_eq!(dump.rules("nat").len(), 1);
        assert_eq!(dump.rules("filter").len(), 1);
    }

    #[test]
    fn rejects_rule_line_without_table() {
        let input = "-A INPUT -j ACCEPT\n";
        assert!(parse_dump(input).is_err());
    }
}
