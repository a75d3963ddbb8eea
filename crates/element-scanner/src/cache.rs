use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::model::{CacheState, ScannedElement};

/// Scan results keyed by the options fingerprint, each valid for one TTL.
///
/// Every [`ScanCache::clear`] bumps a generation counter. A scan records the generation
/// it started under and its result is only stored if no clear happened in between.
pub struct ScanCache {
    entries: DashMap<String, (Vec<ScannedElement>, Instant)>,
    ttl: Duration,
    generation: AtomicU64,
}

impl ScanCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Stores `elements` unless the cache was cleared after `generation` was read.
    pub fn put(&self, key: String, elements: Vec<ScannedElement>, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.entries.insert(key, (elements, Instant::now()));
        true
    }

    pub fn get(&self, key: &str) -> Option<Vec<ScannedElement>> {
        let ttl = self.ttl;
        if let Some(entry) = self.entries.get(key) {
            if entry.1.elapsed() < ttl {
                return Some(entry.0.clone());
            }
        }
        self.entries.remove(key);
        None
    }

    /// Drops every entry. Returns the new generation.
    pub fn clear(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.clear();
        generation
    }

    pub fn state(&self) -> CacheState {
        let ttl = self.ttl;
        self.entries.retain(|_, (_, stored)| stored.elapsed() < ttl);
        if self.entries.is_empty() {
            CacheState::Cold
        } else {
            CacheState::Warm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ScanCache::new(Duration::from_millis(20));
        assert!(cache.put("k".into(), Vec::new(), cache.generation()));
        assert_eq!(cache.state(), CacheState::Warm);
        assert!(cache.get("k").is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.state(), CacheState::Cold);
    }

    #[test]
    fn clear_rejects_stale_writers() {
        let cache = ScanCache::new(Duration::from_secs(60));
        let started = cache.generation();
        cache.clear();
        assert!(!cache.put("k".into(), Vec::new(), started));
        assert!(cache.get("k").is_none());
        assert!(cache.put("k".into(), Vec::new(), cache.generation()));
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = ScanCache::new(Duration::ZERO);
        cache.put("k".into(), Vec::new(), 0);
        assert!(cache.get("k").is_none());
    }
}
