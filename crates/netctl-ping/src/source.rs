use std::net::Ipv4Addr;
use std::time::Duration;

/// Abstracts "collect RTT samples against `target` inside `ns` for
/// `window`" so the aggregator can run against a real `ping` child process
/// in production and canned sample batches in tests, mirroring the
/// trait-plus-fake split used throughout this workspace for anything that
/// shells out.
///
/// Spawn/parse failures are not propagated as errors: per the aggregator's
/// contract, a prober that never produces a sample degrades to an empty
/// batch, which [`crate::trimmed_mean::trimmed_mean`] turns into `None`.
#[allow(async_fn_in_trait)]
pub trait PingSource {
    /// Collects whatever RTT samples arrive in `window`, killing the
    /// prober unconditionally once it elapses.
    async fn collect(&self, ns: &str, target: Ipv4Addr, window: Duration) -> Vec<f64>;
}
