use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fs::operations::{read_optional, replace_file, sibling_with_suffix, LockFile};

use super::{
    entities::{ClosePrevious, Entry, EntryId, NewEntry},
    EntryStorage, StorageError,
};

/// Shape of the document on disk.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct LogDocument {
    /// Ids are never reused, even after the entry holding the highest one is deleted.
    next_id: EntryId,
    entries: Vec<Entry>,
}

impl Default for LogDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

/// Flat-file realization of [EntryStorage]. The whole log lives in one JSON document which is
/// rewritten on every mutation. Only suitable for small logs: every operation reads the full file.
pub struct JsonFileStorage {
    path: PathBuf,
    lock_path: PathBuf,
    closed: AtomicBool,
}

impl JsonFileStorage {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_path = sibling_with_suffix(&path, "lock");
        Ok(Self {
            path,
            lock_path,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    async fn load(&self) -> Result<LogDocument, StorageError> {
        debug!("Loading {:?}", self.path);
        let Some(data) = read_optional(&self.path).await? else {
            return Ok(LogDocument::default());
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(LogDocument::default());
        }
        let mut document: LogDocument = serde_json::from_slice(&data)?;
        if let Some(max_id) = document.entries.iter().map(|e| e.id).max() {
            if document.next_id <= max_id {
                warn!(
                    "Stored next id {} is not above the largest id {max_id}, repairing",
                    document.next_id
                );
                document.next_id = max_id + 1;
            }
        }
        Ok(document)
    }

    async fn save(&self, document: &LogDocument) -> Result<(), StorageError> {
        let data = serde_json::to_vec_pretty(document)?;
        replace_file(&self.path, &data).await?;
        Ok(())
    }

    /// Runs a read-modify-write cycle while holding the exclusive lock. Nothing is written unless
    /// `modify` succeeds.
    async fn modify<T>(
        &self,
        modify: impl FnOnce(&mut LogDocument) -> Result<Option<T>, StorageError>,
    ) -> Result<Option<T>, StorageError> {
        self.ensure_open()?;
        let lock = LockFile::exclusive(&self.lock_path).await?;
        let result = async {
            let mut document = self.load().await?;
            let value = modify(&mut document)?;
            if value.is_some() {
                self.save(&document).await?;
            }
            Ok(value)
        }
        .await;
        lock.release().await?;
        result
    }
}

fn apply_append(
    document: &mut LogDocument,
    close_previous: Option<ClosePrevious>,
    new_entry: NewEntry,
) -> Result<Entry, StorageError> {
    if let Some(ClosePrevious { id, duration }) = close_previous {
        match document.entries.iter_mut().find(|e| e.id == id) {
            Some(previous) if previous.duration.is_some() => {
                return Err(StorageError::Corrupted(format!(
                    "entry {id} has already been closed"
                )));
            }
            Some(previous) => previous.duration = Some(duration),
            None => warn!("Entry {id} disappeared before it could be closed"),
        }
    }

    let entry = new_entry.into_entry(document.next_id);
    document.next_id += 1;
    document.entries.push(entry.clone());
    Ok(entry)
}

impl EntryStorage for JsonFileStorage {
    async fn append_atomic(
        &self,
        close_previous: Option<ClosePrevious>,
        new_entry: NewEntry,
    ) -> Result<Entry, StorageError> {
        let entry = self
            .modify(|document| apply_append(document, close_previous, new_entry).map(Some))
            .await?;
        entry.ok_or_else(|| StorageError::Corrupted("append produced no entry".into()))
    }

    async fn delete_by_id(&self, id: EntryId) -> Result<bool, StorageError> {
        let removed = self
            .modify(|document| {
                let before = document.entries.len();
                document.entries.retain(|e| e.id != id);
                Ok((document.entries.len() != before).then_some(()))
            })
            .await?;
        Ok(removed.is_some())
    }

    async fn scan_all(&self) -> Result<Vec<Entry>, StorageError> {
        self.ensure_open()?;
        let lock = LockFile::shared(&self.lock_path).await?;
        let result = self.load().await;
        lock.release().await?;
        Ok(result?.entries)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        debug!("Closed {:?}", self.path);
        Ok(())
    }
}
