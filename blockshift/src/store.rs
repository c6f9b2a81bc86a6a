//! Snapshot persistence
//!
//! A store keeps two things per document: the live content field that readers
//! see, and the snapshot pair written by conversions. The live field belongs to
//! whoever imported the document; the engine only replaces it after a
//! successful conversion and the restore operator after reading a snapshot.
//!
//! Stores take `&self` everywhere so one store can serve several conversion
//! threads at once. Callers must not run two conversions of the same document
//! concurrently.

use crate::document::{Document, DocumentId, Snapshot};
use crate::error::StorageError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub trait SnapshotStore: Send + Sync {
    /// Current live content, `UnknownDocument` if the document does not exist
    fn live_content(&self, id: DocumentId) -> Result<String, StorageError>;

    /// Replace the live content, creating the document if needed
    fn set_live_content(&self, id: DocumentId, content: &str) -> Result<(), StorageError>;

    fn snapshot(&self, id: DocumentId) -> Result<Option<Snapshot>, StorageError>;

    /// Write the pre-conversion column unless a snapshot already exists.
    ///
    /// Returns whether this call created the snapshot.
    fn capture_original(&self, id: DocumentId, content: &str) -> Result<bool, StorageError>;

    /// Overwrite the post-conversion column of an existing snapshot
    fn record_converted(&self, id: DocumentId, blocks: &str) -> Result<(), StorageError>;

    /// Ids of every document with a snapshot, ascending
    fn snapshot_ids(&self) -> Result<Vec<DocumentId>, StorageError>;

    /// Ids of every stored document, ascending
    fn document_ids(&self) -> Result<Vec<DocumentId>, StorageError>;

    fn document(&self, id: DocumentId) -> Result<Document, StorageError> {
        let live = self.live_content(id)?;
        Ok(Document::from_parts(id, live, self.snapshot(id)?))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MemoryTables {
    live: BTreeMap<DocumentId, String>,
    snapshots: BTreeMap<DocumentId, Snapshot>,
}

/// In-process store, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding `documents` as live content, without snapshots
    pub fn with_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (DocumentId, S)>,
        S: Into<String>,
    {
        let live = documents
            .into_iter()
            .map(|(id, content)| (id, content.into()))
            .collect();
        Self {
            tables: Mutex::new(MemoryTables {
                live,
                snapshots: BTreeMap::new(),
            }),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn live_content(&self, id: DocumentId) -> Result<String, StorageError> {
        lock(&self.tables)
            .live
            .get(&id)
            .cloned()
            .ok_or(StorageError::UnknownDocument(id))
    }

    fn set_live_content(&self, id: DocumentId, content: &str) -> Result<(), StorageError> {
        lock(&self.tables).live.insert(id, content.to_string());
        Ok(())
    }

    fn snapshot(&self, id: DocumentId) -> Result<Option<Snapshot>, StorageError> {
        Ok(lock(&self.tables).snapshots.get(&id).cloned())
    }

    fn capture_original(&self, id: DocumentId, content: &str) -> Result<bool, StorageError> {
        let mut tables = lock(&self.tables);
        if tables.snapshots.contains_key(&id) {
            return Ok(false);
        }
        tables.snapshots.insert(
            id,
            Snapshot {
                document_id: id,
                pre_conversion_content: content.to_string(),
                post_conversion_content: None,
            },
        );
        Ok(true)
    }

    fn record_converted(&self, id: DocumentId, blocks: &str) -> Result<(), StorageError> {
        let mut tables = lock(&self.tables);
        let snapshot = tables
            .snapshots
            .get_mut(&id)
            .ok_or(StorageError::UnknownDocument(id))?;
        snapshot.post_conversion_content = Some(blocks.to_string());
        Ok(())
    }

    fn snapshot_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        Ok(lock(&self.tables).snapshots.keys().copied().collect())
    }

    fn document_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        Ok(lock(&self.tables).live.keys().copied().collect())
    }
}

/// SQLite-backed store
///
/// Tables:
/// - `documents(id, live_content)`
/// - `snapshots(id, pre_conversion_content, post_conversion_content)`
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        install_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SnapshotStore for SqliteStore {
    fn live_content(&self, id: DocumentId) -> Result<String, StorageError> {
        let conn = lock(&self.conn);
        conn.query_row(
            "SELECT live_content FROM documents WHERE id=?1",
            params![to_sqlite_id(id)?],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .ok_or(StorageError::UnknownDocument(id))
    }

    fn set_live_content(&self, id: DocumentId, content: &str) -> Result<(), StorageError> {
        let conn = lock(&self.conn);
        conn.execute(
            "INSERT INTO documents(id, live_content) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET live_content=excluded.live_content",
            params![to_sqlite_id(id)?, content],
        )?;
        Ok(())
    }

    fn snapshot(&self, id: DocumentId) -> Result<Option<Snapshot>, StorageError> {
        let conn = lock(&self.conn);
        let row = conn
            .query_row(
                "SELECT pre_conversion_content, post_conversion_content FROM snapshots WHERE id=?1",
                params![to_sqlite_id(id)?],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;
        Ok(row.map(|(pre, post)| Snapshot {
            document_id: id,
            pre_conversion_content: pre,
            post_conversion_content: post,
        }))
    }

    fn capture_original(&self, id: DocumentId, content: &str) -> Result<bool, StorageError> {
        let conn = lock(&self.conn);
        let inserted = conn.execute(
            "INSERT INTO snapshots(id, pre_conversion_content) VALUES (?1, ?2) \
             ON CONFLICT(id) DO NOTHING",
            params![to_sqlite_id(id)?, content],
        )?;
        Ok(inserted == 1)
    }

    fn record_converted(&self, id: DocumentId, blocks: &str) -> Result<(), StorageError> {
        let conn = lock(&self.conn);
        let updated = conn.execute(
            "UPDATE snapshots SET post_conversion_content=?2 WHERE id=?1",
            params![to_sqlite_id(id)?, blocks],
        )?;
        if updated == 0 {
            return Err(StorageError::UnknownDocument(id));
        }
        Ok(())
    }

    fn snapshot_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        let conn = lock(&self.conn);
        collect_ids(&conn, "SELECT id FROM snapshots ORDER BY id ASC")
    }

    fn document_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        let conn = lock(&self.conn);
        collect_ids(&conn, "SELECT id FROM documents ORDER BY id ASC")
    }
}

fn install_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
          id INTEGER PRIMARY KEY,
          live_content TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS snapshots (
          id INTEGER PRIMARY KEY,
          pre_conversion_content TEXT NOT NULL,
          post_conversion_content TEXT
        );
        "#,
    )?;
    Ok(())
}

fn collect_ids(conn: &Connection, sql: &str) -> Result<Vec<DocumentId>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(from_sqlite_id(row.get::<_, i64>(0)?)?);
    }
    Ok(out)
}

fn to_sqlite_id(id: DocumentId) -> Result<i64, StorageError> {
    i64::try_from(id.get()).map_err(|_| StorageError::IdOutOfRange(id.get()))
}

fn from_sqlite_id(value: i64) -> Result<DocumentId, StorageError> {
    u64::try_from(value)
        .map(DocumentId)
        .map_err(|_| StorageError::IdOutOfRange(value as u64))
}
