/// Treats an empty string the same as `None`.
///
/// The wire format has historically mixed `undefined` and `""` to mean
/// "absent" for optional strings (`vethCIDR`, underlay `server_addr`, ...);
/// every call site in this workspace goes through this single predicate
/// instead of re-deriving the check.
#[must_use]
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    match value {
        Some(s) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::non_empty;

    #[test]
    fn none_is_absent() {
        assert_eq!(non_empty(&None), None);
    }

    #[test]
    fn empty_string_is_absent() {
        assert_eq!(non_empty(&Some(String::new())), None);
    }

    #[test]
    fn non_empty_string_is_present() {
        assert_eq!(non_empty(&Some("x".to_string())), Some("x"));
    }
}
