/// Per-day submission counter and the badge that mirrors it
///
/// Counts live in the local area under their date key. Increments go through
/// a single-writer lock so two triggers firing together cannot lose an update.

use crate::date_key;
use crate::errors::{SendError, StorageError};
use crate::host::{Badge, ExtensionHost};
use crate::storage::{self, Area, Storage};
use chrono::NaiveDate;
use log::{debug, info, warn};
use tokio::sync::Mutex;

/// Cached count for `key`, 0 when absent or unreadable
pub async fn cached_count<S: Storage>(storage: &S, key: &str) -> Result<u64, StorageError> {
    match storage::load::<S, u64>(storage, Area::Local, key).await {
        Ok(count) => Ok(count.unwrap_or(0)),
        Err(StorageError::Decode { message, .. }) => {
            warn!("Ignoring unreadable count for {}: {}", key, message);
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Default)]
pub struct DailyCounter {
    writer: Mutex<()>,
}

impl DailyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get<S: Storage>(&self, storage: &S, key: &str) -> Result<u64, StorageError> {
        cached_count(storage, key).await
    }

    /// Add one to `key`, persist it and show it on the badge
    pub async fn increment<S, H>(&self, storage: &S, host: &H, key: &str) -> Result<u64, StorageError>
    where
        S: Storage,
        H: ExtensionHost,
    {
        let _guard = self.writer.lock().await;
        let count = self.get(storage, key).await?.saturating_add(1);
        storage::save(storage, Area::Local, key, &count).await?;
        host.show_badge(&Badge::for_count(count));
        debug!("Count for {} is now {}", key, count);
        Ok(count)
    }

    /// Replace the cached count with an authoritative one, or fall back to the cache
    pub async fn reconcile<S, H>(
        &self,
        storage: &S,
        host: &H,
        key: &str,
        remote: Result<u64, SendError>,
    ) -> Result<u64, StorageError>
    where
        S: Storage,
        H: ExtensionHost,
    {
        let _guard = self.writer.lock().await;
        let count = match remote {
            Ok(count) => {
                storage::save(storage, Area::Local, key, &count).await?;
                count
            }
            Err(e) => {
                debug!("Remote count unavailable ({}); using cached value", e);
                self.get(storage, key).await?
            }
        };
        host.show_badge(&Badge::for_count(count));
        Ok(count)
    }

    /// Remove counters whose date is more than `retention_days` before `today`.
    /// Keys that are not dates are left alone. Returns the removed keys.
    pub async fn prune<S: Storage>(
        &self,
        storage: &S,
        today: NaiveDate,
        retention_days: i64,
    ) -> Result<Vec<String>, StorageError> {
        let _guard = self.writer.lock().await;
        let all = storage.get_all(Area::Local).await?;
        let stale: Vec<String> = all
            .keys()
            .filter(|key| {
                date_key::age_in_days(key, today).is_some_and(|age| age > retention_days)
            })
            .cloned()
            .collect();

        if !stale.is_empty() {
            storage.remove(Area::Local, &stale).await?;
            info!("Pruned {} old daily counters", stale.len());
        }
        Ok(stale)
    }
}
