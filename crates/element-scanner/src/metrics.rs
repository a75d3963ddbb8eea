//! Scan telemetry.
//!
//! Process-wide counters and latency aggregates, read back as a [`MetricSnapshot`] by the
//! CLI. They never influence scan results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

static SCAN_TOTAL: AtomicU64 = AtomicU64::new(0);
static SCAN_CACHE_HIT: AtomicU64 = AtomicU64::new(0);
static SCAN_CACHE_MISS: AtomicU64 = AtomicU64::new(0);
static SCAN_LAT_NS: AtomicU64 = AtomicU64::new(0);
static SCAN_LAT_SAMPLES: AtomicU64 = AtomicU64::new(0);

static ELEMENTS_RETURNED: AtomicU64 = AtomicU64::new(0);
static ELEMENTS_SKIPPED: AtomicU64 = AtomicU64::new(0);
static INVALIDATIONS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricCounter {
    pub total: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheMetric {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSnapshot {
    pub scan: MetricCounter,
    pub scan_cache: CacheMetric,
    pub elements_returned: u64,
    pub elements_skipped: u64,
    pub invalidations: u64,
}

pub fn record_scan(cache_hit: bool, returned: usize, duration: Duration) {
    SCAN_TOTAL.fetch_add(1, Ordering::Relaxed);
    if cache_hit {
        SCAN_CACHE_HIT.fetch_add(1, Ordering::Relaxed);
    } else {
        SCAN_CACHE_MISS.fetch_add(1, Ordering::Relaxed);
    }
    ELEMENTS_RETURNED.fetch_add(returned as u64, Ordering::Relaxed);
    record_latency(&SCAN_LAT_NS, &SCAN_LAT_SAMPLES, duration);
}

pub fn record_skipped(count: usize) {
    ELEMENTS_SKIPPED.fetch_add(count as u64, Ordering::Relaxed);
}

pub fn record_invalidation() {
    INVALIDATIONS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricSnapshot {
    MetricSnapshot {
        scan: make_counter(
            SCAN_TOTAL.load(Ordering::Relaxed),
            SCAN_LAT_NS.load(Ordering::Relaxed),
            SCAN_LAT_SAMPLES.load(Ordering::Relaxed),
        ),
        scan_cache: make_cache_metric(
            SCAN_CACHE_HIT.load(Ordering::Relaxed),
            SCAN_CACHE_MISS.load(Ordering::Relaxed),
        ),
        elements_returned: ELEMENTS_RETURNED.load(Ordering::Relaxed),
        elements_skipped: ELEMENTS_SKIPPED.load(Ordering::Relaxed),
        invalidations: INVALIDATIONS.load(Ordering::Relaxed),
    }
}

fn make_counter(total: u64, nanos: u64, samples: u64) -> MetricCounter {
    let avg_ms = if samples == 0 {
        0.0
    } else {
        (nanos as f64 / samples as f64) / 1_000_000.0
    };
    MetricCounter { total, avg_ms }
}

fn make_cache_metric(hits: u64, misses: u64) -> CacheMetric {
    let total = hits + misses;
    let hit_rate = if total == 0 {
        0.0
    } else {
        hits as f64 * 100.0 / total as f64
    };
    CacheMetric {
        hits,
        misses,
        hit_rate,
    }
}

fn record_latency(total_ns: &AtomicU64, samples: &AtomicU64, duration: Duration) {
    let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    total_ns.fetch_add(nanos, Ordering::Relaxed);
    samples.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let before = snapshot();
        record_scan(true, 3, Duration::from_millis(2));
        record_scan(false, 5, Duration::from_millis(4));
        record_skipped(1);
        let after = snapshot();
        assert!(after.scan.total >= before.scan.total + 2);
        assert!(after.scan_cache.hits > before.scan_cache.hits);
        assert!(after.elements_returned >= before.elements_returned + 8);
        assert!(after.elements_skipped > before.elements_skipped);
    }
}
