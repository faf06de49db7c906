// Per-stage latency accounting for simulation runs

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

// Bounded so long-running processes report recent behaviour, not lifetime
const MAX_SAMPLES: usize = 1000;

/// Summary statistics for one measured stage, in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Collects wall-clock samples per named stage and reports percentiles
/// over a bounded rolling window.
#[derive(Debug, Default)]
pub struct LatencyTracker {
    samples: Mutex<HashMap<&'static str, VecDeque<f64>>>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, stage: &'static str, millis: f64) {
        if !millis.is_finite() || millis < 0.0 {
            return;
        }
        let mut samples = self.samples.lock().expect("latency lock poisoned");
        let window = samples.entry(stage).or_default();
        window.push_back(millis);
        if window.len() > MAX_SAMPLES {
            window.pop_front();
        }
    }

    pub fn stats(&self, stage: &str) -> LatencyStats {
        let samples = self.samples.lock().expect("latency lock poisoned");
        samples.get(stage).map(summarize).unwrap_or_default()
    }

    /// Statistics for every stage observed so far, keyed by stage name
    pub fn all_stats(&self) -> BTreeMap<String, LatencyStats> {
        let samples = self.samples.lock().expect("latency lock poisoned");
        samples
            .iter()
            .map(|(stage, window)| (stage.to_string(), summarize(window)))
            .collect()
    }
}

fn summarize(window: &VecDeque<f64>) -> LatencyStats {
    if window.is_empty() {
        return LatencyStats::default();
    }

    let mut sorted: Vec<f64> = window.iter().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let avg = sorted.iter().sum::<f64>() / count as f64;

    LatencyStats {
        count,
        avg_ms: avg,
        p50_ms: percentile(&sorted, 0.50),
        p95_ms: percentile(&sorted, 0.95),
        p99_ms: percentile(&sorted, 0.99),
        max_ms: sorted[count - 1],
    }
}

/// Nearest-rank percentile over a sorted slice
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = ((sorted.len() as f64) * p).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
