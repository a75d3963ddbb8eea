use std::time::Duration;

use elementscan_core_types::{NodeId, ScanId};
use tracing::debug;

use crate::errors::ScanError;
use crate::metrics;

pub fn emit_scan(
    scan: &ScanId,
    cache_hit: bool,
    candidates: usize,
    returned: usize,
    duration: Duration,
) {
    metrics::record_scan(cache_hit, returned, duration);
    debug!(
        target: "elementscan.events",
        %scan,
        cache_hit,
        candidates,
        returned,
        elapsed_ms = duration.as_millis() as u64,
        "scan.completed"
    );
}

pub fn emit_element_skipped(scan: &ScanId, node: NodeId, err: &ScanError) {
    metrics::record_skipped(1);
    debug!(
        target: "elementscan.events",
        %scan,
        %node,
        %err,
        "scan.element.skipped"
    );
}

pub fn emit_invalidation(reason: &str, generation: u64) {
    metrics::record_invalidation();
    debug!(
        target: "elementscan.events",
        reason,
        generation,
        "scan.cache.invalidated"
    );
}
