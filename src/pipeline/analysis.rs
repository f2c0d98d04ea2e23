//! Chained analysis: concepts first, then diagnoses over the joined
//! concept list.

use serde::{Deserialize, Serialize};

use super::{AiRouter, ExtractConceptsInput, FlowError, SuggestDiagnosesInput};
use crate::models::{CodingSystem, Diagnosis, ProviderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalAnalysis {
    pub concepts: Vec<String>,
    pub diagnoses: Vec<Diagnosis>,
}

/// Run `ExtractConcepts` on `text`, then `SuggestDiagnoses` on the
/// `", "`-joined concepts. Blank text is rejected before any provider
/// call.
pub fn analyze_text(
    router: &AiRouter,
    text: &str,
    coding_system: CodingSystem,
    provider: ProviderId,
) -> Result<ClinicalAnalysis, FlowError> {
    if text.trim().is_empty() {
        return Err(FlowError::Validation(
            "there is no text to analyze".into(),
        ));
    }

    let concepts = router
        .call(
            ExtractConceptsInput {
                text: text.to_string(),
            },
            provider,
        )?
        .clinical_concepts;

    tracing::debug!(
        concept_count = concepts.len(),
        coding_system = %coding_system,
        "Clinical concepts extracted, suggesting diagnoses"
    );

    let diagnoses = router
        .call(
            SuggestDiagnosesInput {
                clinical_concepts: concepts.join(", "),
                coding_system,
            },
            provider,
        )?
        .diagnoses;

    Ok(ClinicalAnalysis {
        concepts,
        diagnoses,
    })
}
