//! Persistence of the activity log is organized through [EntryStorage].
//! The basic idea is:
//!   - A backend only knows how to append, delete and scan entries. Duration accounting is done
//!     by [ActivityLog](crate::activity::ActivityLog), backends just apply it atomically.
//!   - Two interchangeable backends exist: [json_storage::JsonFileStorage], a single document
//!     rewritten on every mutation, and [sqlite_storage::SqliteStorage], a transactional store.
//!   - The backend is picked at startup through [BackendKind] and [open_storage].

pub mod entities;
pub mod json_storage;
pub mod sqlite_storage;

use std::{fmt::Display, future::Future, ops::Deref, path::Path};

use clap::ValueEnum;
use entities::{ClosePrevious, Entry, EntryId, NewEntry};
use json_storage::JsonFileStorage;
use sqlite_storage::SqliteStorage;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored data is corrupted: {0}")]
    Corrupted(String),

    #[error("Storage has already been closed")]
    Closed,

    #[error("Background storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Interface every persistence backend of the activity log implements.
pub trait EntryStorage {
    /// Closes out the previous entry (if any) and inserts `new_entry`. Either both changes persist
    /// or neither does.
    fn append_atomic(
        &self,
        close_previous: Option<ClosePrevious>,
        new_entry: NewEntry,
    ) -> impl Future<Output = Result<Entry, StorageError>>;

    /// Returns whether an entry with this id existed.
    fn delete_by_id(&self, id: EntryId) -> impl Future<Output = Result<bool, StorageError>>;

    /// All entries in insertion order.
    fn scan_all(&self) -> impl Future<Output = Result<Vec<Entry>, StorageError>>;

    /// Releases the underlying handle. Any later call fails with [StorageError::Closed].
    fn close(&self) -> impl Future<Output = Result<(), StorageError>>;
}

impl<T: Deref> EntryStorage for T
where
    T::Target: EntryStorage,
{
    fn append_atomic(
        &self,
        close_previous: Option<ClosePrevious>,
        new_entry: NewEntry,
    ) -> impl Future<Output = Result<Entry, StorageError>> {
        self.deref().append_atomic(close_previous, new_entry)
    }

    fn delete_by_id(&self, id: EntryId) -> impl Future<Output = Result<bool, StorageError>> {
        self.deref().delete_by_id(id)
    }

    fn scan_all(&self) -> impl Future<Output = Result<Vec<Entry>, StorageError>> {
        self.deref().scan_all()
    }

    fn close(&self) -> impl Future<Output = Result<(), StorageError>> {
        self.deref().close()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Json,
    Sqlite,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Json => write!(f, "json"),
            BackendKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

pub const JSON_FILE_NAME: &str = "activities.json";
pub const SQLITE_FILE_NAME: &str = "activities.sqlite3";

/// Backend chosen at startup.
pub enum AnyStorage {
    Json(JsonFileStorage),
    Sqlite(SqliteStorage),
}

/// Opens the backend of the given kind inside `dir`, creating files as needed.
pub async fn open_storage(kind: BackendKind, dir: &Path) -> Result<AnyStorage, StorageError> {
    std::fs::create_dir_all(dir)?;
    info!("Opening {kind} storage in {dir:?}");
    let storage = match kind {
        BackendKind::Json => AnyStorage::Json(JsonFileStorage::new(dir.join(JSON_FILE_NAME))?),
        BackendKind::Sqlite => {
            AnyStorage::Sqlite(SqliteStorage::open(dir.join(SQLITE_FILE_NAME)).await?)
        }
    };
    Ok(storage)
}

impl EntryStorage for AnyStorage {
    async fn append_atomic(
        &self,
        close_previous: Option<ClosePrevious>,
        new_entry: NewEntry,
    ) -> Result<Entry, StorageError> {
        match self {
            AnyStorage::Json(s) => s.append_atomic(close_previous, new_entry).await,
            AnyStorage::Sqlite(s) => s.append_atomic(close_previous, new_entry).await,
        }
    }

    async fn delete_by_id(&self, id: EntryId) -> Result<bool, StorageError> {
        match self {
            AnyStorage::Json(s) => s.delete_by_id(id).await,
            AnyStorage::Sqlite(s) => s.delete_by_id(id).await,
        }
    }

    async fn scan_all(&self) -> Result<Vec<Entry>, StorageError> {
        match self {
            AnyStorage::Json(s) => s.scan_all().await,
            AnyStorage::Sqlite(s) => s.scan_all().await,
        }
    }

    async fn close(&self) -> Result<(), StorageError> {
        match self {
            AnyStorage::Json(s) => s.close().await,
            AnyStorage::Sqlite(s) => s.close().await,
        }
    }
}
