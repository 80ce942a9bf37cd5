/// Offline queue of submissions waiting to be retried

use crate::errors::StorageError;
use crate::storage::{self, Area, Storage};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::Cell;
use std::future::Future;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Local-area key holding the queue
pub const QUEUE_KEY: &str = "pendingQueue";

/// A submission that failed and waits for a retry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub payload: String,
    pub source: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl QueueEntry {
    pub fn new(payload: &str, source: &str) -> QueueEntry {
        QueueEntry {
            id: Uuid::new_v4(),
            payload: payload.to_string(),
            source: source.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Ordered queue contents, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingQueue {
    entries: Vec<QueueEntry>,
}

impl PendingQueue {
    pub fn new() -> Self {
        PendingQueue { entries: Vec::new() }
    }

    /// Stored queue; entries that no longer decode are dropped with a warning
    pub async fn load<S: Storage>(storage: &S) -> Result<PendingQueue, StorageError> {
        let items = match storage.get(Area::Local, QUEUE_KEY).await? {
            None | Some(Value::Null) => return Ok(PendingQueue::new()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!("Discarding unreadable offline queue: {}", other);
                return Ok(PendingQueue::new());
            }
        };

        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<QueueEntry>(item.clone()) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Dropping unreadable queue entry {}: {}", item, e),
            }
        }
        Ok(PendingQueue { entries })
    }

    /// Append, evicting the oldest entries beyond `cap`. Returns what was evicted.
    pub fn push(&mut self, entry: QueueEntry, cap: usize) -> Vec<QueueEntry> {
        self.entries.push(entry);
        let overflow = self.entries.len().saturating_sub(cap);
        self.entries.drain(..overflow).collect()
    }

    /// Drop the entries with these ids, keeping the rest in order
    pub fn remove_ids(&mut self, ids: &[Uuid]) -> usize {
        let original_len = self.entries.len();
        self.entries.retain(|entry| !ids.contains(&entry.id));
        original_len - self.entries.len()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one drain pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    pub delivered: usize,
    pub remaining: usize,
    /// Another drain was already running
    pub skipped: bool,
}

pub struct OfflineQueue {
    cap: usize,
    writer: Mutex<()>,
    draining: Cell<bool>,
}

struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl OfflineQueue {
    pub fn new(cap: usize) -> Self {
        OfflineQueue {
            cap,
            writer: Mutex::new(()),
            draining: Cell::new(false),
        }
    }

    pub async fn load<S: Storage>(&self, storage: &S) -> Result<PendingQueue, StorageError> {
        PendingQueue::load(storage).await
    }

    async fn save<S: Storage>(&self, storage: &S, queue: &PendingQueue) -> Result<(), StorageError> {
        storage::save(storage, Area::Local, QUEUE_KEY, queue).await
    }

    /// Queue a failed submission; returns the new queue length
    pub async fn enqueue<S: Storage>(&self, storage: &S, entry: QueueEntry) -> Result<usize, StorageError> {
        let _guard = self.writer.lock().await;
        let mut queue = self.load(storage).await?;
        let evicted = queue.push(entry, self.cap);
        if !evicted.is_empty() {
            warn!("Offline queue full; dropped {} oldest entries", evicted.len());
        }
        self.save(storage, &queue).await?;
        debug!("Queued submission; {} pending", queue.len());
        Ok(queue.len())
    }

    /// Try every queued entry in order through `deliver`.
    ///
    /// Delivered entries are removed; failures stay where they were. Entries
    /// queued while the drain runs are kept. A drain started while another is
    /// in flight returns immediately.
    pub async fn drain<S, F, Fut>(&self, storage: &S, mut deliver: F) -> Result<DrainReport, StorageError>
    where
        S: Storage,
        F: FnMut(QueueEntry) -> Fut,
        Fut: Future<Output = bool>,
    {
        if self.draining.replace(true) {
            debug!("Queue drain already in progress");
            return Ok(DrainReport {
                skipped: true,
                ..DrainReport::default()
            });
        }
        let _drain = DrainGuard(&self.draining);

        let snapshot = self.snapshot(storage).await?;
        if snapshot.is_empty() {
            return Ok(DrainReport::default());
        }

        let mut delivered = Vec::new();
        for entry in snapshot.entries().iter().cloned() {
            let id = entry.id;
            if deliver(entry).await {
                delivered.push(id);
            }
        }

        let _guard = self.writer.lock().await;
        let mut queue = self.load(storage).await?;
        queue.remove_ids(&delivered);
        self.save(storage, &queue).await?;

        if !delivered.is_empty() {
            info!("Replayed {} queued submissions; {} still pending", delivered.len(), queue.len());
        }
        Ok(DrainReport {
            delivered: delivered.len(),
            remaining: queue.len(),
            skipped: false,
        })
    }

    /// Current contents, persisted back so entries stored without an id keep the one they get now
    async fn snapshot<S: Storage>(&self, storage: &S) -> Result<PendingQueue, StorageError> {
        let _guard = self.writer.lock().await;
        let queue = self.load(storage).await?;
        if !queue.is_empty() {
            self.save(storage, &queue).await?;
        }
        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_push_evicts_oldest_beyond_cap() {
        let mut queue = PendingQueue::new();
        for i in 0..5 {
            queue.push(QueueEntry::new(&format!("p{}", i), "test"), 3);
        }

        let payloads: Vec<&str> = queue.entries().iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, vec!["p2", "p3", "p4"]);
    }

    #[test]
    fn test_push_reports_evictions() {
        let mut queue = PendingQueue::new();
        assert!(queue.push(QueueEntry::new("a", "s"), 1).is_empty());
        let evicted = queue.push(QueueEntry::new("b", "s"), 1);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].payload, "a");
    }

    #[test]
    fn test_remove_ids_keeps_order() {
        let mut queue = PendingQueue::new();
        let entries: Vec<QueueEntry> = ["a", "b", "c", "d"].iter().map(|p| QueueEntry::new(p, "s")).collect();
        for entry in &entries {
            queue.push(entry.clone(), 50);
        }

        let removed = queue.remove_ids(&[entries[0].id, entries[2].id]);

        assert_eq!(removed, 2);
        let payloads: Vec<&str> = queue.entries().iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(payloads, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_enqueue_is_bounded() {
        let storage = MemoryStorage::new();
        let queue = OfflineQueue::new(50);

        for i in 0..60 {
            queue.enqueue(&storage, QueueEntry::new(&i.to_string(), "s")).await.unwrap();
        }

        let pending = queue.load(&storage).await.unwrap();
        assert_eq!(pending.len(), 50);
        assert_eq!(pending.entries()[0].payload, "10");
        assert_eq!(pending.entries()[49].payload, "59");
    }

    #[tokio::test]
    async fn test_drain_keeps_failures_in_order() {
        let storage = MemoryStorage::new();
        let queue = OfflineQueue::new(50);
        for payload in ["a", "b", "c", "d", "e"] {
            queue.enqueue(&storage, QueueEntry::new(payload, "s")).await.unwrap();
        }
        let attempted = RefCell::new(Vec::new());

        let report = queue
            .drain(&storage, |entry| {
                attempted.borrow_mut().push(entry.payload.clone());
                let ok = entry.payload == "b" || entry.payload == "d";
                async move { ok }
            })
            .await
            .unwrap();

        assert_eq!(*attempted.borrow(), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.remaining, 3);
        let left: Vec<String> = queue
            .load(&storage)
            .await
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.payload.clone())
            .collect();
        assert_eq!(left, vec!["a", "c", "e"]);
    }

    #[tokio::test]
    async fn test_drain_keeps_entries_queued_meanwhile() {
        let storage = MemoryStorage::new();
        let queue = OfflineQueue::new(50);
        queue.enqueue(&storage, QueueEntry::new("old", "s")).await.unwrap();
        let (q, st) = (&queue, &storage);

        let report = queue
            .drain(&storage, move |_entry| async move {
                q.enqueue(st, QueueEntry::new("new", "s")).await.unwrap();
                true
            })
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        let pending = queue.load(&storage).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.entries()[0].payload, "new");
    }

    #[tokio::test]
    async fn test_reentrant_drain_is_skipped() {
        let storage = MemoryStorage::new();
        let queue = OfflineQueue::new(50);
        queue.enqueue(&storage, QueueEntry::new("a", "s")).await.unwrap();
        let inner = RefCell::new(None);
        let (q, st, slot) = (&queue, &storage, &inner);

        queue
            .drain(&storage, move |_entry| async move {
                let report = q.drain(st, |_| async { true }).await.unwrap();
                *slot.borrow_mut() = Some(report);
                false
            })
            .await
            .unwrap();

        assert!(inner.borrow().as_ref().unwrap().skipped);
        assert_eq!(queue.load(&storage).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_skips_malformed_entries() {
        let storage = MemoryStorage::new();
        storage
            .set(
                Area::Local,
                QUEUE_KEY,
                json!([
                    { "payload": 1 },
                    { "payload": "https://kept.dev", "source": "icon click" },
                    "junk"
                ]),
            )
            .await
            .unwrap();

        let pending = PendingQueue::load(&storage).await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending.entries()[0].payload, "https://kept.dev");
    }

    #[tokio::test]
    async fn test_enqueue_recovers_from_corrupt_queue() {
        let storage = MemoryStorage::new();
        storage.set(Area::Local, QUEUE_KEY, json!({ "not": "a list" })).await.unwrap();
        let queue = OfflineQueue::new(50);

        assert_eq!(queue.enqueue(&storage, QueueEntry::new("a", "s")).await.unwrap(), 1);

        let stored = storage.get(Area::Local, QUEUE_KEY).await.unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 1);
        assert_eq!(stored[0]["payload"], json!("a"));
    }

    #[tokio::test]
    async fn test_legacy_entries_without_ids_can_be_drained() {
        let storage = MemoryStorage::new();
        storage
            .set(
                Area::Local,
                QUEUE_KEY,
                json!([{ "payload": "https://a.dev", "source": "icon click", "timestamp": 1700000000000i64 }]),
            )
            .await
            .unwrap();
        let queue = OfflineQueue::new(50);

        let report = queue.drain(&storage, |_| async { true }).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert!(queue.load(&storage).await.unwrap().is_empty());
    }
}
