//! History import/export.
//!
//! JSON export is the verbatim entry array and round-trips into
//! `HistoryStore::bulk_replace`. CSV is one quoted row per entry.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::models::HistoryEntry;

pub const JSON_EXPORT_FILE_NAME: &str = "dualmint_medic_history.json";
pub const CSV_EXPORT_FILE_NAME: &str = "dualmint_medic_history.csv";

pub const CSV_HEADER: &str = "ID,Timestamp,FileName,Reviewed,CodingSystem,PrimaryDiagnosis,\
SelectedDiagnoses,ExtractedText,Summary,Concepts,Diagnoses";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Import file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import file does not have the expected format: {0}")]
    Format(String),
}

/// Pretty-printed JSON array of `entries`.
pub fn export_json(entries: &[HistoryEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}

/// Parse an exported history file.
///
/// Minimal shape check first: the document must be an array and every
/// element must carry `timestamp` and `fileName`. Elements are then
/// decoded into entries; ids are kept as-is and must not repeat.
pub fn parse_import(text: &str) -> Result<Vec<HistoryEntry>, ImportError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let items = value
        .as_array()
        .ok_or_else(|| ImportError::Format("expected a JSON array of entries".into()))?;

    for (index, item) in items.iter().enumerate() {
        let has_required = item
            .as_object()
            .is_some_and(|obj| obj.contains_key("timestamp") && obj.contains_key("fileName"));
        if !has_required {
            return Err(ImportError::Format(format!(
                "entry {index} is missing `timestamp` or `fileName`"
            )));
        }
    }

    let entries = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<HistoryEntry>(item.clone())
                .map_err(|e| ImportError::Format(format!("entry {index}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        if let Some(id) = entry.id {
            if !seen.insert(id) {
                return Err(ImportError::Format(format!("entry {index} repeats id {id}")));
            }
        }
    }

    Ok(entries)
}

/// CSV document with [`CSV_HEADER`] and one row per entry.
///
/// Sub-lists are joined: selected diagnoses with `", "`, concepts and
/// `code:description` diagnosis pairs with `"; "`.
pub fn export_csv(entries: &[HistoryEntry]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + entries.len() * 128);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for entry in entries {
        let diagnoses = entry
            .diagnoses
            .iter()
            .flatten()
            .map(|d| format!("{}:{}", d.code, d.description))
            .collect::<Vec<_>>()
            .join("; ");

        let row = [
            csv_quote(&entry.id.map(|id| id.to_string()).unwrap_or_default()),
            csv_quote(&iso_timestamp(entry.timestamp)),
            csv_quote(&entry.file_name),
            entry.is_reviewed.to_string(),
            csv_quote(entry.coding_system.as_str()),
            csv_quote(entry.primary_diagnosis.as_deref().unwrap_or_default()),
            csv_quote(&entry.selected_diagnoses.as_deref().unwrap_or_default().join(", ")),
            csv_quote(entry.extracted_text.as_deref().unwrap_or_default()),
            csv_quote(entry.summary.as_deref().unwrap_or_default()),
            csv_quote(&entry.concepts.as_deref().unwrap_or_default().join("; ")),
            csv_quote(&diagnoses),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Wrap in double quotes, doubling embedded quotes.
fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// `2024-03-01T10:15:00.000Z`; out-of-range values fall back to the raw millis.
fn iso_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}
