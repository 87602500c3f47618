use crate::AllowedProgram;

/// Prepends `sudo` to the given invocation iff the effective UID is not 0.
///
/// Returns the program to exec and its full argv (excluding program name).
#[must_use]
pub fn sudo_wrap(program: AllowedProgram, args: &[&str]) -> (AllowedProgram, Vec<String>) {
    if nix::unistd::geteuid().is_root() {
        return (program, args.iter().map(|s| (*s).to_string()).collect());
    }

    let mut wrapped = Vec::with_capacity(args.len() + 1);
    wrapped.push(program.as_str().to_string());
    wrapped.extend(args.iter().map(|s| (*s).to_string()));
    (AllowedProgram::Sudo, wrapped)
}

/// Prepends `ip netns exec <ns>` iff `ns` is non-empty.
#[must_use]
pub fn ns_wrap(ns: &str, program: AllowedProgram, args: &[&str]) -> (AllowedProgram, Vec<String>) {
    if ns.is_empty() {
        return (program, args.iter().map(|s| (*s).to_string()).collect());
    }

    let mut wrapped = Vec::with_capacity(args.len() + 4);
    wrapped.push("netns".to_string());
    wrapped.push("exec".to_string());
    wrapped.push(ns.to_string());
    wrapped.push(program.as_str().to_string());
    wrapped.extend(args.iter().map(|s| (*s).to_string()));
    (AllowedProgram::Ip, wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_wrap_passthrough_on_empty_ns() {
        let (program, args) = ns_wrap("", AllowedProgram::Wg, &["show", "all"]);
        assert_eq!(program, AllowedProgram::Wg);
        assert_eq!(args, vec!["show", "all"]);
    }

    #[test]
    fn ns_wrap_prepends_ip_netns_exec() {
        let (program, args) = ns_wrap("netA", AllowedProgram::Wg, &["show", "all"]);
        assert_eq!(program, AllowedProgram::Ip);
        assert_eq!(args, vec!["netns", "exec", "netA", "wg", "show", "all"]);
    }
}
