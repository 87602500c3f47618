/// Extracts the round-trip time in milliseconds from one line of
/// `ping -D -n -i 1 -r` output, e.g.:
///
/// ```text
/// [1700000000.123456] 64 bytes from 10.0.0.2: icmp_seq=1 ttl=64 time=27.3 ms
/// ```
///
/// Requires the `[<unix>.<frac>]` timestamp prefix (from `-D`) before
/// looking for `time=`; lines without it (DNS/ICMP error chatter) are
/// ignored rather than mis-parsed.
#[must_use]
pub fn parse_ping_line(line: &str) -> Option<f64> {
    let line = line.trim();
    if !line.starts_with('[') {
        return None;
    }
    let after_timestamp = &line[line.find(']')? + 1..];
    let after_time_kw = &after_timestamp[after_timestamp.find("time=")? + "time=".len()..];
    let value = after_time_kw.split_whitespace().next()?;
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::parse_ping_line;

    #[test]
    fn parses_ordinary_reply_line() {
        let line = "[1700000000.123456] 64 bytes from 10.0.0.2: icmp_seq=1 ttl=64 time=27.3 ms";
        assert_eq!(parse_ping_line(line), Some(27.3));
    }

    #[test]
    fn ignores_lines_without_timestamp_prefix() {
        let line = "PING 10.0.0.2 (10.0.0.2) 56(84) bytes of data.";
        assert_eq!(parse_ping_line(line), None);
    }

    #[test]
    fn ignores_timed_out_lines_without_time_field() {
        let line = "[1700000000.999999] From 10.0.0.1 icmp_seq=3 Destination Host Unreachable";
        assert_eq!(parse_ping_line(line), None);
    }

    #[test]
    fn tolerates_integral_rtt() {
        let line = "[1700000000.000000] 64 bytes from 10.0.0.2: icmp_seq=2 ttl=64 time=5 ms";
        assert_eq!(parse_ping_line(line), Some(5.0));
    }
}
