use serde::{Deserialize, Serialize};

use super::diagnosis::Diagnosis;
use super::enums::CodingSystem;

/// Display label used when the analysed text was typed, not uploaded.
pub const MANUAL_ENTRY_LABEL: &str = "Entrada manual";

/// One persisted analysis session plus its review/curation state.
///
/// Serialized field names are the persisted (and exported) schema.
/// `primary_diagnosis` and `selected_diagnoses` are soft references to
/// `diagnoses[].code`; dangling codes are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Assigned by the store. `None` only on imported entries that carried no id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub file_name: String,
    #[serde(default)]
    pub coding_system: CodingSystem,
    #[serde(default)]
    pub is_reviewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concepts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnoses: Option<Vec<Diagnosis>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_diagnoses: Option<Vec<String>>,
}

impl HistoryEntry {
    /// Localized review label, part of the free-text search haystack.
    pub fn review_label(&self) -> &'static str {
        if self.is_reviewed {
            "revisado"
        } else {
            "pendiente"
        }
    }
}

/// Payload of a "save" action: everything but the store-owned id/timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryEntry {
    pub file_name: String,
    #[serde(default)]
    pub coding_system: CodingSystem,
    #[serde(default)]
    pub is_reviewed: bool,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub concepts: Option<Vec<String>>,
    #[serde(default)]
    pub diagnoses: Option<Vec<Diagnosis>>,
    #[serde(default)]
    pub primary_diagnosis: Option<String>,
    #[serde(default)]
    pub selected_diagnoses: Option<Vec<String>>,
}

impl NewHistoryEntry {
    /// Builds the stored record; the id stays unassigned until insert.
    pub fn into_entry(self, timestamp: i64) -> HistoryEntry {
        let file_name = if self.file_name.trim().is_empty() {
            MANUAL_ENTRY_LABEL.to_string()
        } else {
            self.file_name
        };
        HistoryEntry {
            id: None,
            timestamp,
            file_name,
            coding_system: self.coding_system,
            is_reviewed: self.is_reviewed,
            extracted_text: self.extracted_text,
            summary: self.summary,
            concepts: self.concepts,
            diagnoses: self.diagnoses,
            primary_diagnosis: self.primary_diagnosis,
            selected_diagnoses: self.selected_diagnoses,
        }
    }
}

/// Partial update. `None` leaves the stored field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryUpdate {
    pub file_name: Option<String>,
    pub coding_system: Option<CodingSystem>,
    pub is_reviewed: Option<bool>,
    pub extracted_text: Option<String>,
    pub summary: Option<String>,
    pub concepts: Option<Vec<String>>,
    pub diagnoses: Option<Vec<Diagnosis>>,
    pub primary_diagnosis: Option<String>,
    pub selected_diagnoses: Option<Vec<String>>,
}

impl HistoryUpdate {
    pub fn reviewed(is_reviewed: bool) -> Self {
        Self {
            is_reviewed: Some(is_reviewed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `entry`. Id and timestamp are never touched.
    pub fn apply_to(self, entry: &mut HistoryEntry) {
        if let Some(v) = self.file_name {
            entry.file_name = v;
        }
        if let Some(v) = self.coding_system {
            entry.coding_system = v;
        }
        if let Some(v) = self.is_reviewed {
            entry.is_reviewed = v;
        }
        if self.extracted_text.is_some() {
            entry.extracted_text = self.extracted_text;
        }
        if self.summary.is_some() {
            entry.summary = self.summary;
        }
        if self.concepts.is_some() {
            entry.concepts = self.concepts;
        }
        if self.diagnoses.is_some() {
            entry.diagnoses = self.diagnoses;
        }
        if self.primary_diagnosis.is_some() {
            entry.primary_diagnosis = self.primary_diagnosis;
        }
        if self.selected_diagnoses.is_some() {
            entry.selected_diagnoses = self.selected_diagnoses;
        }
    }
}
