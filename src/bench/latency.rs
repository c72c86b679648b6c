use super::ExecutionResult;
use serde::Serialize;

/// Nearest-rank latency percentiles in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    pub p50: u64,
    pub p95: u64,
}

/// P50/P95 over cases without an error. No interpolation: the element at
/// `floor(n * p)` of the sorted latencies.
pub fn calc_latency(cases: &[ExecutionResult]) -> LatencyStats {
    let mut xs: Vec<u64> = cases
        .iter()
        .filter(|c| c.error.is_none())
        .map(|c| c.latency_ms)
        .collect();
    if xs.is_empty() {
        return LatencyStats::default();
    }
    xs.sort_unstable();
    let n = xs.len();
    LatencyStats {
        p50: xs[n * 50 / 100],
        p95: xs[n * 95 / 100],
    }
}
