use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use netctl_proc::{ns_wrap, sudo_wrap, AllowedProgram};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::parse::parse_ping_line;
use crate::source::PingSource;

/// A [`PingSource`] that spawns the real `ping` binary.
///
/// Unlike [`netctl_proc::run`], this doesn't wait for the child to exit —
/// `ping -r` runs forever — so it drives `tokio::process::Command`
/// directly, reusing only [`netctl_proc`]'s namespace/privilege wrapping
/// and allowlisted program name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessPingSource;

impl PingSource for ProcessPingSource {
    async fn collect(&self, ns: &str, target: Ipv4Addr, window: Duration) -> Vec<f64> {
        let target = target.to_string();
        let base_args = ["-D", "-n", "-i", "1", "-r", target.as_str()];
        let (program, args) = ns_wrap(ns, AllowedProgram::Ping, &base_args);
        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        let (program, args) = sudo_wrap(program, &borrowed);

        let mut command = Command::new(program.as_str());
        command.args(&args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::null());
        command.stdin(Stdio::null());
        command.kill_on_drop(true);

        debug!(ns, target, "spawning ping prober");
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                warn!(ns, target, %error, "failed to spawn ping prober, target maps to absent");
                return Vec::new();
            }
        };

        let Some(stdout) = child.stdout.take() else {
            warn!(ns, target, "ping prober had no stdout pipe");
            let _ = child.start_kill();
            return Vec::new();
        };

        let mut lines = BufReader::new(stdout).lines();
        let mut samples = Vec::new();
        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                () = &mut deadline => break,
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if let Some(sample) = parse_ping_line(&line) {
                                samples.push(sample);
                            }
                        }
                        Ok(None) => break,
                        Err(error) => {
                            warn!(ns, target, %error, "error reading ping prober output");
                            break;
                        }
                    }
                }
            }
        }

        // Mandatory cancellation: the prober is killed on every exit path
        // from this function, not just the happy one.
        let _ = child.start_kill();
        let _ = child.wait().await;

        debug!(ns, target, samples = samples.len(), "ping prober window elapsed");
        samples
    }
}
