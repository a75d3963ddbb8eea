//! Mutation observer integration for automatic cache invalidation.
//!
//! The watcher listens to the document's mutation stream and clears the scan cache when
//! elements of an interactive tag are inserted or removed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dom_adapter::{MutationRecord, MutationStream};
use parking_lot::Mutex;
use tokio::select;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::ScanCache;
use crate::collect::INTERACTIVE_TAGS;
use crate::events;

pub struct MutationWatcher {
    cache: Arc<ScanCache>,
    task: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
    /// Second receiver on the same stream, drained synchronously by [`Self::catch_up`].
    pending: Mutex<Option<Cursor>>,
    /// Records accounted for by either receiver.
    applied: Arc<AtomicU64>,
}

/// A receiver plus the number of records it has seen.
struct Cursor {
    stream: MutationStream,
    seen: u64,
}

#[derive(Clone, Copy)]
enum Delivery<'a> {
    Record(&'a MutationRecord),
    Lagged(u64),
}

impl MutationWatcher {
    pub fn new(cache: Arc<ScanCache>) -> Self {
        Self {
            cache,
            task: None,
            shutdown: CancellationToken::new(),
            pending: Mutex::new(None),
            applied: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Start consuming `stream`. Must be called inside a tokio runtime.
    ///
    /// Invalidation policy:
    /// - child list changes touching an interactive tag: clear
    /// - attribute and character data changes: ignored
    /// - lagged stream (records were dropped): clear
    pub fn start(&mut self, mut stream: MutationStream) {
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
        self.applied.store(0, Ordering::Release);
        *self.pending.lock() = Some(Cursor {
            stream: stream.resubscribe(),
            seen: 0,
        });

        let cache = Arc::clone(&self.cache);
        let applied = Arc::clone(&self.applied);
        let shutdown = self.shutdown.clone();
        let mut seen = 0;

        self.task = Some(tokio::spawn(async move {
            debug!(target: "elementscan.watcher", "mutation watcher started");
            loop {
                select! {
                    _ = shutdown.cancelled() => {
                        debug!(target: "elementscan.watcher", "mutation watcher shutting down");
                        break;
                    }
                    record = stream.recv() => {
                        match record {
                            Ok(record) => {
                                advance(&mut seen, &cache, &applied, Delivery::Record(&record));
                            }
                            Err(RecvError::Lagged(skipped)) => {
                                advance(&mut seen, &cache, &applied, Delivery::Lagged(skipped));
                            }
                            Err(RecvError::Closed) => {
                                debug!(target: "elementscan.watcher", "mutation stream closed");
                                break;
                            }
                        }
                    }
                }
            }
            debug!(target: "elementscan.watcher", "mutation watcher exited");
        }));
    }

    /// Applies every record already published but not yet handled by the watcher task.
    ///
    /// The task alone makes invalidation eventual: on a multi-threaded runtime a scan may
    /// reach the cache before the task has run. Calling this first closes that window.
    pub fn catch_up(&self) {
        let mut pending = self.pending.lock();
        let Some(cursor) = pending.as_mut() else {
            return;
        };
        loop {
            let delivered = cursor.stream.try_recv();
            let seen = &mut cursor.seen;
            match delivered {
                Ok(record) => advance(seen, &self.cache, &self.applied, Delivery::Record(&record)),
                Err(TryRecvError::Lagged(skipped)) => {
                    advance(seen, &self.cache, &self.applied, Delivery::Lagged(skipped))
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        self.pending.lock().take();
        if let Some(handle) = self.task.take() {
            let _ = handle.await;
        }
    }

    /// The invalidation reason for `record`, if it should clear the cache.
    fn handle_record(record: &MutationRecord) -> Option<&'static str> {
        if !record.is_structural() {
            return None;
        }
        let touches_interactive = record
            .touched_tags()
            .any(|tag| INTERACTIVE_TAGS.contains(&tag));
        touches_interactive.then_some("interactive_child_list")
    }
}

/// Both receivers see the same sequence, so a record's position identifies it. Only the
/// first receiver to reach a position acts on it.
fn advance(seen: &mut u64, cache: &ScanCache, applied: &AtomicU64, delivery: Delivery<'_>) {
    *seen += match delivery {
        Delivery::Record(_) => 1,
        Delivery::Lagged(skipped) => skipped,
    };
    if applied.fetch_max(*seen, Ordering::AcqRel) >= *seen {
        return;
    }
    let reason = match delivery {
        Delivery::Record(record) => MutationWatcher::handle_record(record),
        Delivery::Lagged(skipped) => {
            warn!(target: "elementscan.watcher", skipped, "mutation stream lagged, clearing cache");
            Some("lagged")
        }
    };
    if let Some(reason) = reason {
        let generation = cache.clear();
        events::emit_invalidation(reason, generation);
    }
}

impl Drop for MutationWatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dom_adapter::{mutation_bus, MutatedNode};
    use elementscan_core_types::NodeId;
    use tokio::time::sleep;

    use super::*;

    fn warm_cache() -> Arc<ScanCache> {
        let cache = Arc::new(ScanCache::new(Duration::from_secs(60)));
        cache.put("scan".into(), Vec::new(), cache.generation());
        cache
    }

    fn added(tag: &str) -> MutationRecord {
        MutationRecord::ChildList {
            target: NodeId(1),
            added: vec![MutatedNode {
                node: NodeId(2),
                tag: tag.into(),
            }],
            removed: Vec::new(),
        }
    }

    #[tokio::test]
    async fn watcher_clears_on_interactive_insert() {
        let (bus, _rx) = mutation_bus(8);
        let cache = warm_cache();
        let mut watcher = MutationWatcher::new(Arc::clone(&cache));
        watcher.start(bus.subscribe());

        let _ = bus.send(added("button"));
        sleep(Duration::from_millis(50)).await;

        assert!(cache.get("scan").is_none());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn watcher_ignores_plain_content() {
        let (bus, _rx) = mutation_bus(8);
        let cache = warm_cache();
        let mut watcher = MutationWatcher::new(Arc::clone(&cache));
        watcher.start(bus.subscribe());

        let _ = bus.send(added("p"));
        let _ = bus.send(MutationRecord::Attributes {
            target: NodeId(2),
            name: "class".into(),
        });
        sleep(Duration::from_millis(50)).await;

        assert!(cache.get("scan").is_some());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn catch_up_applies_pending_records_once() {
        let (bus, _rx) = mutation_bus(8);
        let cache = warm_cache();
        let mut watcher = MutationWatcher::new(Arc::clone(&cache));
        watcher.start(bus.subscribe());
        let before = cache.generation();

        let _ = bus.send(added("button"));
        // no await since the send: the task has not run yet
        watcher.catch_up();
        assert!(cache.get("scan").is_none());
        assert_eq!(cache.generation(), before + 1);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.generation(), before + 1, "the task skips a handled record");
        watcher.stop().await;
    }

    #[tokio::test]
    async fn catch_up_skips_records_the_task_handled() {
        let (bus, _rx) = mutation_bus(8);
        let cache = warm_cache();
        let mut watcher = MutationWatcher::new(Arc::clone(&cache));
        watcher.start(bus.subscribe());

        let _ = bus.send(added("a"));
        sleep(Duration::from_millis(50)).await;
        let after_task = cache.generation();
        assert_eq!(after_task, 1);

        cache.put("scan".into(), Vec::new(), cache.generation());
        watcher.catch_up();
        assert_eq!(cache.generation(), after_task);
        assert!(cache.get("scan").is_some());
        watcher.stop().await;
    }

    #[tokio::test]
    async fn watcher_stops_cleanly() {
        let (bus, _rx) = mutation_bus(8);
        let mut watcher = MutationWatcher::new(warm_cache());
        watcher.start(bus.subscribe());
        assert!(watcher.is_running());
        watcher.stop().await;
        assert!(!watcher.is_running());
    }
}
