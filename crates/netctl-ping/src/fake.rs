use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::source::PingSource;

/// An in-memory [`PingSource`] returning pre-programmed sample batches,
/// keyed by `(ns, target)`. Missing keys behave like a failed spawn: an
/// empty batch.
#[derive(Debug, Default)]
pub struct FakePingSource {
    fixtures: Mutex<HashMap<(String, Ipv4Addr), Vec<f64>>>,
}

impl FakePingSource {
    /// Builds an empty fake; every target collects an empty batch until
    /// programmed with [`Self::set`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs the batch returned for `(ns, target)`.
    pub async fn set(&self, ns: &str, target: Ipv4Addr, samples: Vec<f64>) {
        self.fixtures.lock().await.insert((ns.to_string(), target), samples);
    }
}

impl PingSource for FakePingSource {
    async fn collect(&self, ns: &str, target: Ipv4Addr, _window: Duration) -> Vec<f64> {
        self.fixtures.lock().await.get(&(ns.to_string(), target)).cloned().unwrap_or_default()
    }
}
