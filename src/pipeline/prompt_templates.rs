//! Operation registry: one fixed entry per operation with its prompt
//! templates, retry budget and attachment behavior.
//!
//! Templates are plain text with `{{name}}` placeholders. Rendering is a
//! straight substitution; there is no conditional or loop syntax.

use crate::config::HOSTED_MAX_RETRIES;
use crate::models::Operation;

use super::OperationInput;

/// Registry entry for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationEntry {
    pub operation: Operation,
    /// Prompt sent to the hosted pipeline. The document of `ExtractText`
    /// travels as inline media, not inside this text.
    pub hosted_prompt: &'static str,
    /// Prompt sent to the self-hosted model server.
    pub self_hosted_prompt: &'static str,
    /// Retries after the first hosted attempt.
    pub max_retries: u32,
    /// Whether the operation sends the uploaded document as binary data.
    pub attaches_document: bool,
}

const EXTRACT_TEXT_HOSTED: &str = "\
Eres un asistente de transcripción médica. Extrae todo el texto legible del \
documento clínico adjunto (imagen o PDF), respetando el orden de lectura. \
No resumas ni interpretes el contenido.
Responde únicamente con un objeto JSON de la forma {\"extractedText\": \"...\"}.";

const EXTRACT_TEXT_SELF_HOSTED: &str = "\
Eres un asistente de transcripción médica. La imagen adjunta es un documento \
clínico. Extrae todo el texto legible respetando el orden de lectura, sin \
resumir ni interpretar.
Responde únicamente con un objeto JSON de la forma {\"extractedText\": \"...\"}.";

const EXTRACT_CONCEPTS_HOSTED: &str = "\
Eres un experto en terminología clínica. Identifica los conceptos clínicos \
relevantes (síntomas, signos, hallazgos, antecedentes, procedimientos y \
medicamentos) presentes en el siguiente texto:

{{text}}

Devuelve cada concepto como una frase corta en español.
Responde únicamente con un objeto JSON de la forma {\"clinicalConcepts\": [\"...\"]}.";

const EXTRACT_CONCEPTS_SELF_HOSTED: &str = "\
Extrae los conceptos clínicos (síntomas, signos, hallazgos, antecedentes, \
procedimientos y medicamentos) del siguiente texto médico.

Texto:
{{text}}

Responde únicamente con JSON válido: {\"clinicalConcepts\": [\"concepto 1\", \"concepto 2\"]}";

const SUMMARIZE_NOTES_HOSTED: &str = "\
Eres un médico que redacta resúmenes clínicos. Resume las siguientes notas \
clínicas en un párrafo breve y preciso, conservando diagnósticos, \
tratamientos y hallazgos relevantes:

{{notes}}

Responde únicamente con un objeto JSON de la forma {\"summary\": \"...\"}.";

const SUMMARIZE_NOTES_SELF_HOSTED: &str = "\
Resume en español y en un párrafo breve las siguientes notas clínicas. \
Conserva diagnósticos, tratamientos y hallazgos relevantes.

Notas:
{{notes}}

Responde únicamente con JSON válido: {\"summary\": \"resumen\"}";

const SUGGEST_DIAGNOSES_HOSTED: &str = "\
Eres un especialista en codificación clínica. A partir de los siguientes \
conceptos clínicos, sugiere los diagnósticos más probables codificados con \
el sistema {{codingSystem}}.

Conceptos: {{clinicalConcepts}}

Para cada diagnóstico indica el código {{codingSystem}}, una descripción \
breve en español y la confianza (Alta, Media o Baja).
Responde únicamente con un objeto JSON de la forma \
{\"diagnoses\": [{\"code\": \"...\", \"description\": \"...\", \"confidence\": \"Alta\"}]}.";

const SUGGEST_DIAGNOSES_SELF_HOSTED: &str = "\
Sugiere diagnósticos codificados con el sistema {{codingSystem}} para los \
siguientes conceptos clínicos: {{clinicalConcepts}}

Cada diagnóstico lleva código {{codingSystem}}, descripción en español y \
confianza \"Alta\", \"Media\" o \"Baja\".
Responde únicamente con JSON válido: \
{\"diagnoses\": [{\"code\": \"código\", \"description\": \"descripción\", \"confidence\": \"Media\"}]}";

static EXTRACT_TEXT: OperationEntry = OperationEntry {
    operation: Operation::ExtractText,
    hosted_prompt: EXTRACT_TEXT_HOSTED,
    self_hosted_prompt: EXTRACT_TEXT_SELF_HOSTED,
    max_retries: HOSTED_MAX_RETRIES,
    attaches_document: true,
};

static EXTRACT_CONCEPTS: OperationEntry = OperationEntry {
    operation: Operation::ExtractConcepts,
    hosted_prompt: EXTRACT_CONCEPTS_HOSTED,
    self_hosted_prompt: EXTRACT_CONCEPTS_SELF_HOSTED,
    max_retries: HOSTED_MAX_RETRIES,
    attaches_document: false,
};

static SUMMARIZE_NOTES: OperationEntry = OperationEntry {
    operation: Operation::SummarizeNotes,
    hosted_prompt: SUMMARIZE_NOTES_HOSTED,
    self_hosted_prompt: SUMMARIZE_NOTES_SELF_HOSTED,
    max_retries: HOSTED_MAX_RETRIES,
    attaches_document: false,
};

static SUGGEST_DIAGNOSES: OperationEntry = OperationEntry {
    operation: Operation::SuggestDiagnoses,
    hosted_prompt: SUGGEST_DIAGNOSES_HOSTED,
    self_hosted_prompt: SUGGEST_DIAGNOSES_SELF_HOSTED,
    max_retries: HOSTED_MAX_RETRIES,
    attaches_document: false,
};

/// Registry lookup. Exhaustive: adding an operation without an entry
/// does not compile.
pub fn entry_for(operation: Operation) -> &'static OperationEntry {
    match operation {
        Operation::ExtractText => &EXTRACT_TEXT,
        Operation::ExtractConcepts => &EXTRACT_CONCEPTS,
        Operation::SummarizeNotes => &SUMMARIZE_NOTES,
        Operation::SuggestDiagnoses => &SUGGEST_DIAGNOSES,
    }
}

/// Substitute every `{{name}}` in `template` with its value. Unknown
/// placeholders are left untouched.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{{{name}}}}}"), value)
    })
}

/// Hosted prompt for `input`.
pub fn render_hosted_prompt(input: &OperationInput) -> String {
    render_template(
        entry_for(input.operation()).hosted_prompt,
        &input.placeholders(),
    )
}

/// Self-hosted prompt for `input`.
pub fn render_self_hosted_prompt(input: &OperationInput) -> String {
    render_template(
        entry_for(input.operation()).self_hosted_prompt,
        &input.placeholders(),
    )
}
