//! Analysis history: the durable store, the in-memory query layer and
//! JSON/CSV import-export.
//!
//! `HistoryStore` is the sole persistent owner of `HistoryEntry` records.
//! Every operation takes the store's single mutex, so mutations are
//! serialized and never observed half-applied by a concurrent reader.

pub mod export;
pub mod query;

pub use export::*;
pub use query::*;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::{HistoryEntry, HistoryUpdate, NewHistoryEntry};

pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (or create) the durable store at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    /// Volatile store for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Save a completed analysis. The store assigns id and timestamp.
    pub fn insert(&self, entry: NewHistoryEntry) -> Result<i64, DatabaseError> {
        self.insert_at(entry, chrono::Utc::now().timestamp_millis())
    }

    pub(crate) fn insert_at(&self, entry: NewHistoryEntry, timestamp: i64) -> Result<i64, DatabaseError> {
        let entry = entry.into_entry(timestamp);
        let conn = self.lock()?;
        let id = db::insert_history_entry(&conn, &entry)?;
        tracing::info!(id, coding_system = %entry.coding_system, "History entry saved");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<HistoryEntry>, DatabaseError> {
        let conn = self.lock()?;
        db::get_history_entry(&conn, id)
    }

    /// Partial update; `NotFound` when the id is absent.
    pub fn update(&self, id: i64, update: HistoryUpdate) -> Result<HistoryEntry, DatabaseError> {
        let mut conn = self.lock()?;
        let entry = db::update_history_entry(&mut conn, id, update)?;
        tracing::debug!(id, is_reviewed = entry.is_reviewed, "History entry updated");
        Ok(entry)
    }

    pub fn set_reviewed(&self, id: i64, is_reviewed: bool) -> Result<HistoryEntry, DatabaseError> {
        self.update(id, HistoryUpdate::reviewed(is_reviewed))
    }

    /// Remove one entry. Absent ids are a no-op.
    pub fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        if db::delete_history_entry(&conn, id)? {
            tracing::info!(id, "History entry deleted");
        } else {
            tracing::debug!(id, "Delete of absent history entry ignored");
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let removed = db::clear_history(&conn)?;
        tracing::info!(removed, "History cleared");
        Ok(())
    }

    /// Atomically replace the whole collection, keeping supplied ids.
    pub fn bulk_replace(&self, entries: &[HistoryEntry]) -> Result<(), DatabaseError> {
        let mut conn = self.lock()?;
        db::replace_history(&mut conn, entries)?;
        tracing::info!(count = entries.len(), "History replaced");
        Ok(())
    }

    /// Every entry, newest first.
    pub fn list_all(&self) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let conn = self.lock()?;
        db::list_history(&conn)
    }

    pub fn count(&self) -> Result<usize, DatabaseError> {
        let conn = self.lock()?;
        db::count_history(&conn)
    }
}
