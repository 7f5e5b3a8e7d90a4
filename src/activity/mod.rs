//! The activity log. [ActivityLog] is the handle the rest of the application works with: it owns
//! the storage backend and the clock, serializes appends and delegates the bookkeeping to
//! [duration] and [query].

pub mod duration;
pub mod query;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use duration::CurrentStatus;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    storage::{
        entities::{Entry, EntryId, NewEntry},
        EntryStorage, StorageError,
    },
    utils::clock::Clock,
};

pub struct ActivityLog<S: EntryStorage> {
    storage: S,
    clock: Box<dyn Clock>,
    /// Appends are a read-then-write sequence over the latest entry, so writers hold this
    /// exclusively for the whole sequence. Readers share it to never observe a half-done append.
    guard: RwLock<()>,
}

impl<S: EntryStorage> ActivityLog<S> {
    pub fn new(storage: S, clock: Box<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            guard: RwLock::new(()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.time()
    }

    /// Records that `activity` starts now, closing out whatever was going on before.
    pub async fn log_activity(
        &self,
        activity: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Entry, StorageError> {
        let _write = self.guard.write().await;
        let entries = self.storage.scan_all().await?;
        let latest = entries.last();
        let timestamp = duration::next_timestamp(latest, self.now().trunc_subsecs(0));
        let close_previous = duration::close_out(duration::latest_open(&entries), timestamp);

        let entry = self
            .storage
            .append_atomic(close_previous, NewEntry::new(activity, category, timestamp))
            .await?;
        if let Some(closed) = close_previous {
            debug!("Closed entry {} after {}", closed.id, closed.duration);
        }
        info!(
            "Logged entry {} '{}' ({}) at {}",
            entry.id, entry.activity, entry.category, entry.timestamp
        );
        Ok(entry)
    }

    pub async fn current_status(&self) -> Result<CurrentStatus, StorageError> {
        let entries = self.all_entries().await?;
        Ok(duration::current_status(&entries, self.now()))
    }

    /// Up to `limit` entries, most recent first.
    pub async fn recent_activities(&self, limit: usize) -> Result<Vec<Entry>, StorageError> {
        let entries = self.all_entries().await?;
        Ok(entries.into_iter().rev().take(limit).collect())
    }

    pub async fn category_totals(&self) -> Result<BTreeMap<String, Duration>, StorageError> {
        let entries = self.all_entries().await?;
        Ok(query::category_totals(&entries, self.now()))
    }

    pub async fn category_counts(&self) -> Result<BTreeMap<String, usize>, StorageError> {
        let entries = self.all_entries().await?;
        Ok(query::category_counts(&entries))
    }

    pub async fn search_nearest(
        &self,
        target: DateTime<Utc>,
    ) -> Result<Option<Entry>, StorageError> {
        let entries = self.all_entries().await?;
        Ok(query::nearest(&entries, target).cloned())
    }

    /// Removes an entry. Durations around the removed entry are left as they are, so the entry
    /// before it keeps pointing at the removed entry's timestamp.
    pub async fn delete_entry(&self, id: EntryId) -> Result<bool, StorageError> {
        let _write = self.guard.write().await;
        let existed = self.storage.delete_by_id(id).await?;
        if existed {
            info!("Deleted entry {id}");
            debug!("Durations around entry {id} are not recomputed");
        } else {
            debug!("Entry {id} doesn't exist, nothing to delete");
        }
        Ok(existed)
    }

    /// Every entry in chronological order.
    pub async fn all_entries(&self) -> Result<Vec<Entry>, StorageError> {
        let _read = self.guard.read().await;
        self.storage.scan_all().await
    }

    /// Releases the storage backend.
    pub async fn close(self) -> Result<(), StorageError> {
        let _write = self.guard.write().await;
        self.storage.close().await
    }
}
