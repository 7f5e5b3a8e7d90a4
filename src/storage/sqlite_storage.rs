use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use super::{
    entities::{ClosePrevious, Entry, EntryId, NewEntry},
    EntryStorage, StorageError,
};

/// Creates the schema if it doesn't exist yet.
fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS activities (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            activity      TEXT    NOT NULL,
            category      TEXT    NOT NULL,
            timestamp     INTEGER NOT NULL,
            duration_secs INTEGER
        );
        ",
    )?;
    Ok(())
}

/// Transactional realization of [EntryStorage] on top of SQLite. rusqlite is blocking, so every
/// call is moved onto the blocking thread pool.
pub struct SqliteStorage {
    path: PathBuf,
    connection: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStorage {
    pub async fn open(path: PathBuf) -> Result<Self, StorageError> {
        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || open_connection(&open_path)).await??;
        debug!("Opened sqlite database {path:?}");
        Ok(Self {
            path,
            connection: Arc::new(Mutex::new(Some(conn))),
        })
    }

    async fn with_connection<T: Send + 'static>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    ) -> Result<T, StorageError> {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| StorageError::Corrupted("connection lock was poisoned".into()))?;
            let conn = guard.as_mut().ok_or(StorageError::Closed)?;
            f(conn)
        })
        .await?
    }
}

fn open_connection(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn append_in_transaction(
    conn: &mut Connection,
    close_previous: Option<ClosePrevious>,
    new_entry: NewEntry,
) -> Result<Entry, StorageError> {
    // Dropping the transaction without committing rolls it back.
    let tx = conn.transaction()?;

    if let Some(ClosePrevious { id, duration }) = close_previous {
        let existing: Option<Option<i64>> = tx
            .query_row(
                "SELECT duration_secs FROM activities WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(Some(_)) => {
                return Err(StorageError::Corrupted(format!(
                    "entry {id} has already been closed"
                )));
            }
            Some(None) => {
                tx.execute(
                    "UPDATE activities SET duration_secs = ?1 WHERE id = ?2",
                    params![duration.num_seconds(), id],
                )?;
            }
            None => warn!("Entry {id} disappeared before it could be closed"),
        }
    }

    tx.execute(
        "INSERT INTO activities (activity, category, timestamp) VALUES (?1, ?2, ?3)",
        params![
            new_entry.activity,
            new_entry.category,
            new_entry.timestamp.timestamp()
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(new_entry.into_entry(id))
}

type EntryRow = (EntryId, String, String, i64, Option<i64>);

fn scan_rows(conn: &Connection) -> Result<Vec<Entry>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT id, activity, category, timestamp, duration_secs FROM activities ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| -> rusqlite::Result<EntryRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    })?;
    let mut entries = Vec::new();
    for row in rows {
        let entry =
            row_to_entry(row?).inspect_err(|e| warn!("Unparsable row in activities: {e}"))?;
        entries.push(entry);
    }
    Ok(entries)
}

fn row_to_entry(
    (id, activity, category, timestamp, duration_secs): EntryRow,
) -> Result<Entry, StorageError> {
    let timestamp = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        StorageError::Corrupted(format!("entry {id} has invalid timestamp {timestamp}"))
    })?;
    let duration = duration_secs
        .map(|secs| {
            Duration::try_seconds(secs).ok_or_else(|| {
                StorageError::Corrupted(format!("entry {id} has invalid duration {secs}"))
            })
        })
        .transpose()?;
    Ok(Entry {
        id,
        activity,
        category,
        timestamp,
        duration,
    })
}

impl EntryStorage for SqliteStorage {
    async fn append_atomic(
        &self,
        close_previous: Option<ClosePrevious>,
        new_entry: NewEntry,
    ) -> Result<Entry, StorageError> {
        self.with_connection(move |conn| append_in_transaction(conn, close_previous, new_entry))
            .await
    }

    async fn delete_by_id(&self, id: EntryId) -> Result<bool, StorageError> {
        self.with_connection(move |conn| {
            let changed = conn.execute("DELETE FROM activities WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
        .await
    }

    async fn scan_all(&self) -> Result<Vec<Entry>, StorageError> {
        self.with_connection(|conn| scan_rows(conn)).await
    }

    async fn close(&self) -> Result<(), StorageError> {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| StorageError::Corrupted("connection lock was poisoned".into()))?;
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| StorageError::Sqlite(e)),
                None => Ok(()),
            }
        })
        .await??;
        debug!("Closed sqlite database {:?}", self.path);
        Ok(())
    }
}
