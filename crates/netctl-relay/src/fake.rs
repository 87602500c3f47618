use std::collections::HashMap;
use std::sync::Mutex;

use crate::supervisor::Supervisor;
use crate::RelayError;

/// A unit the fake supervisor recorded as started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedUnit {
    /// The program that was exec'd.
    pub program: String,
    /// Its argv.
    pub args: Vec<String>,
}

/// In-memory [`Supervisor`] for tests. Records every started unit and
/// forgets it when stopped; never fails to start.
#[derive(Debug, Default)]
pub struct FakeSupervisor {
    units: Mutex<HashMap<String, StartedUnit>>,
}

impl FakeSupervisor {
    /// Creates an empty fake.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded invocation for `unit_name`, if it is still
    /// running.
    #[must_use]
    pub fn get(&self, unit_name: &str) -> Option<StartedUnit> {
        self.units.lock().expect("fake supervisor lock poisoned").get(unit_name).cloned()
    }

    /// Number of units currently tracked as running.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.units.lock().expect("fake supervisor lock poisoned").len()
    }
}

impl Supervisor for FakeSupervisor {
    async fn start_unit(&self, unit_name: &str, program: &str, args: &[String]) -> Result<(), RelayError> {
        self.units.lock().expect("fake supervisor lock poisoned").insert(
            unit_name.to_string(),
            StartedUnit { program: program.to_string(), args: args.to_vec() },
        );
        Ok(())
    }

    async fn stop_unit(&self, unit_name: &str) {
        self.units.lock().expect("fake supervisor lock poisoned").remove(unit_name);
    }
}
