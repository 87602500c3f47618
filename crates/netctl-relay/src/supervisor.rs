use tracing::warn;

use netctl_proc::{run, run_checked, AllowedProgram};

use crate::RelayError;

/// Abstracts the host init system that keeps a relay-worker process alive
/// across restarts. Production runs against `systemd-run`/`systemctl`;
/// tests run against an in-memory fake.
pub trait Supervisor {
    /// Starts `program args...` as a new unit named `unit_name`, restarted
    /// by the supervisor on exit.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] if the unit could not be created.
    async fn start_unit(&self, unit_name: &str, program: &str, args: &[String]) -> Result<(), RelayError>;

    /// Stops `unit_name`. Best-effort: a unit that is already gone is not
    /// an error.
    async fn stop_unit(&self, unit_name: &str);
}

/// Production [`Supervisor`] backed by `systemd-run` and `systemctl`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdSupervisor;

impl Supervisor for SystemdSupervisor {
    async fn start_unit(&self, unit_name: &str, program: &str, args: &[String]) -> Result<(), RelayError> {
        let mut full_args: Vec<String> = vec![
            format!("--unit={unit_name}"),
            "--collect".to_string(),
            "--property=Restart=always".to_string(),
            "--property=RestartSec=5s".to_string(),
            program.to_string(),
        ];
        full_args.extend(args.iter().cloned());
        let borrowed: Vec<&str> = full_args.iter().map(String::as_str).collect();

        run_checked(AllowedProgram::SystemdRun, &borrowed)
            .await
            .map_err(|source| RelayError::Start { unit: unit_name.to_string(), source })?;
        Ok(())
    }

    async fn stop_unit(&self, unit_name: &str) {
        let unit = format!("{unit_name}.service");
        match run(AllowedProgram::Systemctl, &["stop", &unit]).await {
            Ok(output) if output.success() => {}
            Ok(output) => warn!(unit = unit_name, stderr = %output.stderr_lossy(), "systemctl stop reported failure"),
            Err(error) => warn!(unit = unit_name, %error, "failed to invoke systemctl stop"),
        }
    }
}
