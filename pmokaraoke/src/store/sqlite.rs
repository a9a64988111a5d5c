//! Persistance SQLite de la file karaoké

use super::{QueueStore, QueueTransaction};
use crate::entry::{EntryDraft, EntryId, EntryMetadata, QueueEntry};
use crate::priority::FairnessKey;
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS queue_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        position INTEGER NOT NULL DEFAULT 0,
        priority REAL NOT NULL,
        regression_count INTEGER NOT NULL DEFAULT 0,
        requester_name TEXT NOT NULL,
        requester_id TEXT NOT NULL,
        title TEXT NOT NULL,
        artist TEXT,
        media TEXT,
        duration_secs INTEGER,
        requested_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_queue_position ON queue_entries(position);
    CREATE INDEX IF NOT EXISTS idx_queue_requester_name ON queue_entries(requester_name);
    CREATE INDEX IF NOT EXISTS idx_queue_requester_id ON queue_entries(requester_id);
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

const ENTRY_COLUMNS: &str = "id, position, priority, regression_count, requester_name, \
     requester_id, title, artist, media, duration_secs, requested_at";

const CURRENT_KEY: &str = "current_entry";
const REGRESSION_KEY: &str = "regression_value";

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> Error {
    move |e| Error::PersistenceError(format!("{}: {}", context, e))
}

fn counter_key(name: &str) -> String {
    format!("counter.{}", name)
}

fn fairness_column(key: FairnessKey) -> &'static str {
    match key {
        FairnessKey::RequesterName => "requester_name",
        FairnessKey::RequesterId => "requester_id",
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: EntryId(row.get(0)?),
        position: row.get(1)?,
        priority: row.get(2)?,
        regression_count: row.get(3)?,
        requester_name: row.get(4)?,
        requester_id: row.get(5)?,
        metadata: EntryMetadata {
            title: row.get(6)?,
            artist: row.get(7)?,
            media: row.get(8)?,
            duration_secs: row.get(9)?,
        },
        requested_at: row.get(10)?,
    })
}

/// Base SQLite contenant la file et les réglages partagés
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Ouvre (ou crée) la base au chemin donné
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::PersistenceError(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(db_err("Failed to open database"))?;
        tracing::debug!(path = %db_path.display(), "Opened queue database");
        Self::init(conn)
    }

    /// Base éphémère, perdue à la fermeture
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err("Failed to open database"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(db_err("Failed to set busy timeout"))?;
        conn.execute_batch(SCHEMA)
            .map_err(db_err("Failed to create queue tables"))?;
        Ok(Self { conn })
    }
}

impl QueueStore for SqliteStore {
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>> {
        // IMMEDIATE : le verrou d'écriture est pris dès l'ouverture, même
        // face à un autre processus sur le même fichier
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err("Failed to begin transaction"))?;
        Ok(SqliteTransaction { tx })
    }
}

/// Transaction SQLite ; annulée si elle est abandonnée sans commit
pub struct SqliteTransaction<'a> {
    tx: Transaction<'a>,
}

impl SqliteTransaction<'_> {
    fn setting(&self, key: &str) -> Result<Option<String>> {
        self.tx
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err("Failed to read setting"))
    }

    fn put_setting(&self, key: &str, value: Option<String>) -> Result<()> {
        match value {
            Some(value) => self
                .tx
                .execute(
                    "INSERT INTO settings (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )
                .map_err(db_err("Failed to write setting"))?,
            None => self
                .tx
                .execute("DELETE FROM settings WHERE key = ?1", params![key])
                .map_err(db_err("Failed to clear setting"))?,
        };
        Ok(())
    }
}

impl QueueTransaction for SqliteTransaction<'_> {
    fn current_pointer(&self) -> Result<Option<EntryId>> {
        let Some(raw) = self.setting(CURRENT_KEY)? else {
            return Ok(None);
        };
        match raw.trim().parse::<i64>() {
            Ok(id) => Ok(Some(EntryId(id))),
            Err(_) => {
                tracing::warn!(value = %raw, "Ignoring unreadable current entry setting");
                Ok(None)
            }
        }
    }

    fn set_current_pointer(&mut self, id: Option<EntryId>) -> Result<()> {
        self.put_setting(CURRENT_KEY, id.map(|id| id.to_string()))
    }

    fn regression_value(&self) -> Result<Option<f64>> {
        let Some(raw) = self.setting(REGRESSION_KEY)? else {
            return Ok(None);
        };
        match raw.trim().parse::<f64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                tracing::warn!(value = %raw, "Ignoring unreadable regression setting");
                Ok(None)
            }
        }
    }

    fn set_regression_value(&mut self, value: f64) -> Result<()> {
        self.put_setting(REGRESSION_KEY, Some(value.to_string()))
    }

    fn entry(&self, id: EntryId) -> Result<Option<QueueEntry>> {
        let sql = format!("SELECT {} FROM queue_entries WHERE id = ?1", ENTRY_COLUMNS);
        self.tx
            .query_row(&sql, params![id.0], entry_from_row)
            .optional()
            .map_err(db_err("Failed to load entry"))
    }

    fn load_queue(&self) -> Result<Vec<QueueEntry>> {
        let sql = format!(
            "SELECT {} FROM queue_entries ORDER BY position ASC, id ASC",
            ENTRY_COLUMNS
        );
        let mut stmt = self
            .tx
            .prepare_cached(&sql)
            .map_err(db_err("Failed to prepare statement"))?;

        let entries = stmt
            .query_map([], entry_from_row)
            .map_err(db_err("Failed to query queue"))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Failed to read queue entry"))?;

        Ok(entries)
    }

    fn count_requests(&self, key: FairnessKey, value: &str) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM queue_entries WHERE {} = ?1",
            fairness_column(key)
        );
        let count: i64 = self
            .tx
            .query_row(&sql, params![value], |row| row.get(0))
            .map_err(db_err("Failed to count requests"))?;
        Ok(count as u64)
    }

    fn create_entry(&mut self, draft: &EntryDraft, priority: f64) -> Result<EntryId> {
        self.tx
            .execute(
                "INSERT INTO queue_entries (position, priority, regression_count, requester_name,
                     requester_id, title, artist, media, duration_secs, requested_at)
                 VALUES (0, ?1, 0, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    priority,
                    &draft.requester_name,
                    &draft.requester_id,
                    &draft.metadata.title,
                    &draft.metadata.artist,
                    &draft.metadata.media,
                    draft.metadata.duration_secs,
                    Utc::now(),
                ],
            )
            .map_err(db_err("Failed to insert entry"))?;

        Ok(EntryId(self.tx.last_insert_rowid()))
    }

    fn set_position(&mut self, id: EntryId, position: u32) -> Result<()> {
        let updated = self
            .tx
            .execute(
                "UPDATE queue_entries SET position = ?1 WHERE id = ?2",
                params![position, id.0],
            )
            .map_err(db_err("Failed to set position"))?;

        if updated == 0 {
            return Err(Error::EntryNotFound(id));
        }
        Ok(())
    }

    fn update_entries(&mut self, entries: &[QueueEntry]) -> Result<()> {
        let mut stmt = self
            .tx
            .prepare_cached(
                "UPDATE queue_entries SET position = ?1, priority = ?2, regression_count = ?3
                 WHERE id = ?4",
            )
            .map_err(db_err("Failed to prepare statement"))?;

        for entry in entries {
            let updated = stmt
                .execute(params![
                    entry.position,
                    entry.priority,
                    entry.regression_count,
                    entry.id.0
                ])
                .map_err(db_err("Failed to update entry"))?;

            if updated == 0 {
                return Err(Error::EntryNotFound(entry.id));
            }
        }
        Ok(())
    }

    fn remove_entry(&mut self, id: EntryId) -> Result<bool> {
        let removed = self
            .tx
            .execute("DELETE FROM queue_entries WHERE id = ?1", params![id.0])
            .map_err(db_err("Failed to remove entry"))?;
        Ok(removed > 0)
    }

    fn counter(&self, name: &str) -> Result<u64> {
        Ok(self
            .setting(&counter_key(name))?
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(0))
    }

    fn bump_counter(&mut self, name: &str) -> Result<u64> {
        let value = self.counter(name)? + 1;
        self.put_setting(&counter_key(name), Some(value.to_string()))?;
        Ok(value)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit().map_err(db_err("Failed to commit transaction"))
    }
}
