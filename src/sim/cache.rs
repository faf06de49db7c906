// LRU cache of completed simulation results
//
// Keys are fingerprints of the request and the market state it was priced
// against, so a hit is only possible when the book has not changed.

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::SimulatorConfig;
use crate::types::{SimulationRequest, SimulationResult};

/// Cache fingerprint: request parameters (with quantity and volatility
/// coarsened into buckets) plus the book sequence the result priced.
pub fn fingerprint(
    request: &SimulationRequest,
    volatility: f64,
    book_sequence: u64,
    config: &SimulatorConfig,
) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.symbol.hash(&mut hasher);
    request.order_type.hash(&mut hasher);
    request.side.hash(&mut hasher);
    request.fee_tier.hash(&mut hasher);
    bucket(request.quantity, config.quantity_bucket).hash(&mut hasher);
    bucket(request.aggressiveness, 0.01).hash(&mut hasher);
    bucket(request.quantile, 0.01).hash(&mut hasher);
    bucket(
        request.volatility_override.unwrap_or(volatility),
        config.volatility_bucket,
    )
    .hash(&mut hasher);
    request.depth_override.map(|d| bucket(d, 1.0)).hash(&mut hasher);
    book_sequence.hash(&mut hasher);
    hasher.finish()
}

fn bucket(value: f64, width: f64) -> u64 {
    (value / width).round() as u64
}

#[derive(Debug)]
struct Entry {
    result: Arc<SimulationResult>,
    last_used: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio: f64,
}

/// Bounded result cache with least-recently-used eviction
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<u64, Entry>>,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(capacity)),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: u64) -> Option<Arc<SimulationResult>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.last_used = self.clock.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: u64, result: Arc<SimulationResult>) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(&evict) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k)
            {
                entries.remove(&evict);
            }
        }
        entries.insert(
            key,
            Entry {
                result,
                last_used: self.clock.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().expect("cache lock poisoned").len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            entries,
            capacity: self.capacity,
            hits,
            misses,
            hit_ratio: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }
}
