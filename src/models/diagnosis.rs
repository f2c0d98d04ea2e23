use serde::{Deserialize, Serialize};

use super::enums::Confidence;

/// A diagnosis suggested by `SuggestDiagnoses`.
///
/// Immutable once produced; the UI may reorder or annotate copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub code: String,
    pub description: String,
    pub confidence: Confidence,
}

impl Diagnosis {
    /// `"code description"`, the form searched by the history filter.
    pub fn search_label(&self) -> String {
        format!("{} {}", self.code, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_model_output() {
        let d: Diagnosis = serde_json::from_str(
            r#"{"code":"E11.9","description":"Diabetes mellitus tipo 2","confidence":"Alta"}"#,
        )
        .unwrap();
        assert_eq!(d.confidence, Confidence::High);
        assert_eq!(d.search_label(), "E11.9 Diabetes mellitus tipo 2");
    }
}
