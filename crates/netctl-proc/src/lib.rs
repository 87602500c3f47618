//! Safe external-process invocation.
//!
//! Everything this agent does to the kernel and the host supervisor goes
//! through here: a non-shell [`Command`](tokio::process::Command) builder over
//! an allowlist of known binaries, with argument validation rejecting shell
//! metacharacters before exec, mirroring the `SafeCommand` pattern used
//! elsewhere in this codebase for process invocation.

mod error;
mod program;
mod wrap;

pub use error::ProcError;
pub use program::AllowedProgram;
pub use wrap::{ns_wrap, sudo_wrap};

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Characters never allowed in an argument, regardless of program.
const FORBIDDEN_CHARS: &[char] = &['\0', '\n', '\r'];

/// Output of a process run, regardless of exit status.
#[derive(Debug, Clone)]
pub struct ProcOutput {
    /// Process exit code, or `-1` if terminated by a signal.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: Vec<u8>,
    /// Captured stderr.
    pub stderr: Vec<u8>,
}

impl ProcOutput {
    /// Whether the process exited with status `0`.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Validates a single argument against the forbidden-character set.
///
/// # Errors
///
/// Returns [`ProcError::InvalidArgument`] if a forbidden character is found.
pub fn validate_argument(arg: &str) -> Result<(), ProcError> {
    if let Some(c) = arg.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(ProcError::InvalidArgument {
            argument: arg.to_string(),
            character: c,
        });
    }
    Ok(())
}

/// Runs an allowlisted program with the given argv, never throwing on a
/// non-zero exit — the caller inspects [`ProcOutput::success`] itself.
///
/// # Errors
///
/// Returns an error if an argument fails validation or the process could
/// not be spawned at all (binary missing, permission denied, ...).
pub async fn run(program: AllowedProgram, args: &[&str]) -> Result<ProcOutput, ProcError> {
    run_with_stdin(program, args, None).await
}

/// Like [`run`] but feeds `stdin` to the child before reading output.
///
/// Used only to feed key material to `wg pubkey`.
///
/// # Errors
///
/// See [`run`].
pub async fn run_with_stdin(
    program: AllowedProgram,
    args: &[&str],
    stdin: Option<&[u8]>,
) -> Result<ProcOutput, ProcError> {
    for arg in args {
        validate_argument(arg)?;
    }

    let mut cmd = Command::new(program.as_str());
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    debug!(program = program.as_str(), args = ?args, "spawning process");

    let mut child = cmd.spawn().map_err(|source| ProcError::Spawn {
        program: program.as_str(),
        source,
    })?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input)
                .await
                .map_err(|source| ProcError::Spawn {
                    program: program.as_str(),
                    source,
                })?;
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| ProcError::Spawn {
            program: program.as_str(),
            source,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    debug!(program = program.as_str(), exit_code, "process exited");

    Ok(ProcOutput {
        exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Runs a `(program, argv)` pair as produced by [`sudo_wrap`]/[`ns_wrap`].
///
/// # Errors
///
/// See [`run`].
pub async fn run_owned(program: AllowedProgram, args: Vec<String>) -> Result<ProcOutput, ProcError> {
    let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
    run(program, &borrowed).await
}

/// Runs an allowlisted program and fails on non-zero exit.
///
/// # Errors
///
/// Returns [`ProcError::NonZeroExit`] if the process exits with a non-zero
/// status, or any error [`run`] would return.
pub async fn run_checked(program: AllowedProgram, args: &[&str]) -> Result<String, ProcError> {
    let output = run(program, args).await?;
    if !output.success() {
        return Err(ProcError::NonZeroExit {
            program: program.as_str(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            exit_code: output.exit_code,
            stderr: output.stderr_lossy(),
        });
    }
    Ok(output.stdout_lossy())
}

/// Runs a program inside namespace `ns` (if non-empty), escalated via `sudo`
/// (if not already root), never throwing on non-zero exit.
///
/// This is the composition every kernel-facing component uses: `ns_wrap`
/// first so the namespace-entry prefix is closest to the real program, then
/// `sudo_wrap` around the whole thing.
///
/// # Errors
///
/// See [`run`].
pub async fn run_in_ns(ns: &str, program: AllowedProgram, args: &[&str]) -> Result<ProcOutput, ProcError> {
    let (program, args) = wrap::ns_wrap(ns, program, args);
    let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
    let (program, args) = wrap::sudo_wrap(program, &borrowed);
    run_owned(program, args).await
}

/// Like [`run_in_ns`] but fails on non-zero exit.
///
/// # Errors
///
/// See [`run_checked`].
pub async fn run_in_ns_checked(ns: &str, program: AllowedProgram, args: &[&str]) -> Result<String, ProcError> {
    let output = run_in_ns(ns, program, args).await?;
    if !output.success() {
        return Err(ProcError::NonZeroExit {
            program: program.as_str(),
            args: args.iter().map(|s| (*s).to_string()).collect(),
            exit_code: output.exit_code,
            stderr: output.stderr_lossy(),
        });
    }
    Ok(output.stdout_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_null_byte() {
        assert!(validate_argument("foo\0bar").is_err());
    }

    #[test]
    fn rejects_newline() {
        assert!(validate_argument("foo\nbar").is_err());
    }

    #[test]
    fn allows_ordinary_flags() {
        assert!(validate_argument("--cap-add=NET_ADMIN").is_ok());
        assert!(validate_argument("10.0.0.1/30").is_ok());
    }

    #[tokio::test]
    async fn run_does_not_throw_on_failure() {
        // `false` isn't allowlisted; exercise via `Ip` with a bad subcommand
        // instead, which still spawns but exits non-zero.
        let result = run(AllowedProgram::Ip, &["this-is-not-a-real-subcommand"]).await;
        let output = result.expect("spawn should succeed even though the command fails");
        assert!(!output.success());
    }
}
