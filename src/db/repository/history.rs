use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DatabaseError;
use crate::models::*;

const HISTORY_COLUMNS: &str = "id, timestamp, file_name, coding_system, is_reviewed, \
     extracted_text, summary, concepts, diagnoses, primary_diagnosis, selected_diagnoses";

/// Insert a new entry. Any id on `entry` is ignored; SQLite assigns one.
pub fn insert_history_entry(conn: &Connection, entry: &HistoryEntry) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO history (timestamp, file_name, coding_system, is_reviewed,
         extracted_text, summary, concepts, diagnoses, primary_diagnosis, selected_diagnoses)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            entry.timestamp,
            entry.file_name,
            entry.coding_system.as_str(),
            entry.is_reviewed,
            entry.extracted_text,
            entry.summary,
            to_json_column(&entry.concepts)?,
            to_json_column(&entry.diagnoses)?,
            entry.primary_diagnosis,
            to_json_column(&entry.selected_diagnoses)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert keeping the caller's id when present (import/restore path).
fn insert_history_entry_preserving_id(
    conn: &Connection,
    entry: &HistoryEntry,
) -> Result<i64, DatabaseError> {
    let Some(id) = entry.id else {
        return insert_history_entry(conn, entry);
    };
    conn.execute(
        "INSERT INTO history (id, timestamp, file_name, coding_system, is_reviewed,
         extracted_text, summary, concepts, diagnoses, primary_diagnosis, selected_diagnoses)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            id,
            entry.timestamp,
            entry.file_name,
            entry.coding_system.as_str(),
            entry.is_reviewed,
            entry.extracted_text,
            entry.summary,
            to_json_column(&entry.concepts)?,
            to_json_column(&entry.diagnoses)?,
            entry.primary_diagnosis,
            to_json_column(&entry.selected_diagnoses)?,
        ],
    )?;
    Ok(id)
}

pub fn get_history_entry(conn: &Connection, id: i64) -> Result<Option<HistoryEntry>, DatabaseError> {
    let sql = format!("SELECT {HISTORY_COLUMNS} FROM history WHERE id = ?1");
    let raw = conn.query_row(&sql, [id], RawHistoryRow::read).optional()?;
    raw.map(RawHistoryRow::into_entry).transpose()
}

/// All entries, newest first. Ties on timestamp fall back to id.
pub fn list_history(conn: &Connection) -> Result<Vec<HistoryEntry>, DatabaseError> {
    let sql = format!("SELECT {HISTORY_COLUMNS} FROM history ORDER BY timestamp DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], RawHistoryRow::read)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.into_entry()?);
    }
    Ok(entries)
}

pub fn count_history(conn: &Connection) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Apply a partial update inside one transaction. Fails with `NotFound`
/// when the id is absent.
pub fn update_history_entry(
    conn: &mut Connection,
    id: i64,
    update: HistoryUpdate,
) -> Result<HistoryEntry, DatabaseError> {
    let tx = conn.transaction()?;
    let mut entry = get_history_entry(&tx, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "HistoryEntry".into(),
        id: id.to_string(),
    })?;

    update.apply_to(&mut entry);

    tx.execute(
        "UPDATE history SET file_name = ?1, coding_system = ?2, is_reviewed = ?3,
         extracted_text = ?4, summary = ?5, concepts = ?6, diagnoses = ?7,
         primary_diagnosis = ?8, selected_diagnoses = ?9
         WHERE id = ?10",
        params![
            entry.file_name,
            entry.coding_system.as_str(),
            entry.is_reviewed,
            entry.extracted_text,
            entry.summary,
            to_json_column(&entry.concepts)?,
            to_json_column(&entry.diagnoses)?,
            entry.primary_diagnosis,
            to_json_column(&entry.selected_diagnoses)?,
            id,
        ],
    )?;
    tx.commit()?;
    Ok(entry)
}

/// Returns whether a row was removed. Absent ids are not an error.
pub fn delete_history_entry(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM history WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

pub fn clear_history(conn: &Connection) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM history", [])?)
}

/// Discard the whole collection and insert `entries` in one transaction.
/// Ids present on the entries are kept; the rest get fresh ids.
pub fn replace_history(conn: &mut Connection, entries: &[HistoryEntry]) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM history", [])?;
    // Explicit ids first so auto-assigned ones cannot collide with them.
    for entry in entries.iter().filter(|e| e.id.is_some()) {
        insert_history_entry_preserving_id(&tx, entry)?;
    }
    for entry in entries.iter().filter(|e| e.id.is_none()) {
        insert_history_entry(&tx, entry)?;
    }
    tx.commit()?;
    Ok(())
}

fn to_json_column<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>, DatabaseError> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(DatabaseError::from))
        .transpose()
}

fn from_json_column<T: serde::de::DeserializeOwned>(
    value: Option<String>,
) -> Result<Option<T>, DatabaseError> {
    value
        .map(|s| serde_json::from_str(&s).map_err(DatabaseError::from))
        .transpose()
}

/// Column values as SQLite returns them, before enum/JSON decoding.
struct RawHistoryRow {
    id: i64,
    timestamp: i64,
    file_name: String,
    coding_system: String,
    is_reviewed: bool,
    extracted_text: Option<String>,
    summary: Option<String>,
    concepts: Option<String>,
    diagnoses: Option<String>,
    primary_diagnosis: Option<String>,
    selected_diagnoses: Option<String>,
}

impl RawHistoryRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            file_name: row.get(2)?,
            coding_system: row.get(3)?,
            is_reviewed: row.get(4)?,
            extracted_text: row.get(5)?,
            summary: row.get(6)?,
            concepts: row.get(7)?,
            diagnoses: row.get(8)?,
            primary_diagnosis: row.get(9)?,
            selected_diagnoses: row.get(10)?,
        })
    }

    fn into_entry(self) -> Result<HistoryEntry, DatabaseError> {
        Ok(HistoryEntry {
            id: Some(self.id),
            timestamp: self.timestamp,
            file_name: self.file_name,
            coding_system: CodingSystem::from_str(&self.coding_system)?,
            is_reviewed: self.is_reviewed,
            extracted_text: self.extracted_text,
            summary: self.summary,
            concepts: from_json_column(self.concepts)?,
            diagnoses: from_json_column(self.diagnoses)?,
            primary_diagnosis: self.primary_diagnosis,
            selected_diagnoses: from_json_column(self.selected_diagnoses)?,
        })
    }
}
