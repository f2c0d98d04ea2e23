//! Review-status and free-text filtering over a materialized history list.
//!
//! Pure functions: no ranking, input order preserved, recomputed on
//! every call.

use crate::models::{HistoryEntry, ReviewStatus};

/// Keep entries matching both the review status and the search term.
///
/// The term is matched case-insensitively as a substring of the entry's
/// haystack (see [`search_haystack`]). The term is not trimmed; an empty
/// term matches everything.
pub fn filter_entries(
    entries: &[HistoryEntry],
    status: ReviewStatus,
    search_term: &str,
) -> Vec<HistoryEntry> {
    let needle = search_term.to_lowercase();
    entries
        .iter()
        .filter(|entry| matches_status(entry, status))
        .filter(|entry| needle.is_empty() || search_haystack(entry).contains(&needle))
        .cloned()
        .collect()
}

pub fn matches_status(entry: &HistoryEntry, status: ReviewStatus) -> bool {
    match status {
        ReviewStatus::All => true,
        ReviewStatus::Reviewed => entry.is_reviewed,
        ReviewStatus::Pending => !entry.is_reviewed,
    }
}

/// Lowercased, space-joined searchable text of one entry: file name,
/// coding system, extracted text, summary, review label, concepts and
/// `"code description"` of every diagnosis.
pub fn search_haystack(entry: &HistoryEntry) -> String {
    let mut parts: Vec<String> = vec![
        entry.file_name.clone(),
        entry.coding_system.as_str().to_string(),
        entry.extracted_text.clone().unwrap_or_default(),
        entry.summary.clone().unwrap_or_default(),
        entry.review_label().to_string(),
    ];
    parts.extend(entry.concepts.iter().flatten().cloned());
    parts.extend(entry.diagnoses.iter().flatten().map(|d| d.search_label()));
    parts.join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CodingSystem, Confidence, Diagnosis, NewHistoryEntry};

    fn entry(id: i64, name: &str, reviewed: bool, coding: CodingSystem) -> HistoryEntry {
        let mut e = NewHistoryEntry {
            file_name: name.into(),
            coding_system: coding,
            is_reviewed: reviewed,
            ..Default::default()
        }
        .into_entry(1_000 - id);
        e.id = Some(id);
        e
    }

    fn sample() -> Vec<HistoryEntry> {
        let mut with_dx = entry(1, "informe.pdf", false, CodingSystem::Cie11);
        with_dx.concepts = Some(vec!["Hipertensión arterial".into()]);
        with_dx.diagnoses = Some(vec![Diagnosis {
            code: "BA00".into(),
            description: "Hipertensión esencial".into(),
            confidence: Confidence::High,
        }]);
        vec![
            with_dx,
            entry(2, "receta.png", true, CodingSystem::CieO),
            entry(3, "notas.txt", false, CodingSystem::Cie10),
            entry(4, "alta.pdf", true, CodingSystem::Cie11),
        ]
    }

    fn ids(entries: &[HistoryEntry]) -> Vec<i64> {
        entries.iter().filter_map(|e| e.id).collect()
    }

    #[test]
    fn pending_keeps_unreviewed_in_order() {
        let out = filter_entries(&sample(), ReviewStatus::Pending, "");
        assert_eq!(ids(&out), vec![1, 3]);
    }

    #[test]
    fn reviewed_keeps_reviewed_in_order() {
        let out = filter_entries(&sample(), ReviewStatus::Reviewed, "");
        assert_eq!(ids(&out), vec![2, 4]);
    }

    #[test]
    fn coding_system_matches_case_insensitively() {
        let out = filter_entries(&sample(), ReviewStatus::All, "cie-10");
        assert_eq!(ids(&out), vec![3]);
    }

    #[test]
    fn search_covers_concepts_and_diagnosis_pairs() {
        assert_eq!(ids(&filter_entries(&sample(), ReviewStatus::All, "HIPERTENSIÓN")), vec![1]);
        assert_eq!(ids(&filter_entries(&sample(), ReviewStatus::All, "ba00 hiper")), vec![1]);
    }

    #[test]
    fn review_label_is_searchable() {
        let out = filter_entries(&sample(), ReviewStatus::All, "revisado");
        assert_eq!(ids(&out), vec![2, 4]);
    }

    #[test]
    fn filters_combine_conjunctively() {
        let out = filter_entries(&sample(), ReviewStatus::Reviewed, ".pdf");
        assert_eq!(ids(&out), vec![4]);
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_term() {
        assert_eq!(ids(&filter_entries(&sample(), ReviewStatus::All, "receta")), vec![2]);
        assert!(filter_entries(&sample(), ReviewStatus::All, "receta ").is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let once = filter_entries(&sample(), ReviewStatus::Pending, "pdf");
        let twice = filter_entries(&once, ReviewStatus::Pending, "pdf");
        assert_eq!(once, twice);
    }
}
