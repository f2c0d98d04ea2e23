//! Input/output contracts of the four LLM-backed operations.
//!
//! Field names are the JSON wire names shared by both providers and the
//! browser client.

use serde::{Deserialize, Serialize};

use super::{data_uri, FlowError};
use crate::models::{CodingSystem, Diagnosis, Operation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTextInput {
    /// `data:<mime>;base64,<payload>`
    pub document_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTextOutput {
    pub extracted_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConceptsInput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractConceptsOutput {
    pub clinical_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeNotesInput {
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizeNotesOutput {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestDiagnosesInput {
    /// Comma-joined concept list.
    pub clinical_concepts: String,
    pub coding_system: CodingSystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestDiagnosesOutput {
    pub diagnoses: Vec<Diagnosis>,
}

/// Input of any operation. The variant determines the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OperationInput {
    ExtractText(ExtractTextInput),
    ExtractConcepts(ExtractConceptsInput),
    SummarizeNotes(SummarizeNotesInput),
    SuggestDiagnoses(SuggestDiagnosesInput),
}

impl OperationInput {
    pub fn operation(&self) -> Operation {
        match self {
            Self::ExtractText(_) => Operation::ExtractText,
            Self::ExtractConcepts(_) => Operation::ExtractConcepts,
            Self::SummarizeNotes(_) => Operation::SummarizeNotes,
            Self::SuggestDiagnoses(_) => Operation::SuggestDiagnoses,
        }
    }

    /// Decode a JSON body as the input shape of `operation`.
    pub fn from_json(operation: Operation, value: serde_json::Value) -> Result<Self, FlowError> {
        let invalid = |e: serde_json::Error| {
            FlowError::Validation(format!("{operation} input: {e}"))
        };
        Ok(match operation {
            Operation::ExtractText => Self::ExtractText(serde_json::from_value(value).map_err(invalid)?),
            Operation::ExtractConcepts => {
                Self::ExtractConcepts(serde_json::from_value(value).map_err(invalid)?)
            }
            Operation::SummarizeNotes => {
                Self::SummarizeNotes(serde_json::from_value(value).map_err(invalid)?)
            }
            Operation::SuggestDiagnoses => {
                Self::SuggestDiagnoses(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }

    /// Named values available to prompt templates.
    pub fn placeholders(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::ExtractText(i) => vec![("documentDataUri", i.document_data_uri.as_str())],
            Self::ExtractConcepts(i) => vec![("text", i.text.as_str())],
            Self::SummarizeNotes(i) => vec![("notes", i.notes.as_str())],
            Self::SuggestDiagnoses(i) => vec![
                ("clinicalConcepts", i.clinical_concepts.as_str()),
                ("codingSystem", i.coding_system.as_str()),
            ],
        }
    }

    /// Shape check applied before a hosted invocation: documents must be
    /// wrapped as base64 data URIs. Text fields are passed through as-is,
    /// empty strings included.
    pub fn validate(&self) -> Result<(), FlowError> {
        match self {
            Self::ExtractText(i) => data_uri::parse_data_uri(&i.document_data_uri)
                .map(|_| ())
                .map_err(FlowError::Validation),
            _ => Ok(()),
        }
    }
}

/// Output of any operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OperationOutput {
    ExtractText(ExtractTextOutput),
    ExtractConcepts(ExtractConceptsOutput),
    SummarizeNotes(SummarizeNotesOutput),
    SuggestDiagnoses(SuggestDiagnosesOutput),
}

impl OperationOutput {
    pub fn operation(&self) -> Operation {
        match self {
            Self::ExtractText(_) => Operation::ExtractText,
            Self::ExtractConcepts(_) => Operation::ExtractConcepts,
            Self::SummarizeNotes(_) => Operation::SummarizeNotes,
            Self::SuggestDiagnoses(_) => Operation::SuggestDiagnoses,
        }
    }

    /// Decode model JSON as the output shape of `operation`.
    pub fn from_json(
        operation: Operation,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match operation {
            Operation::ExtractText => Self::ExtractText(serde_json::from_value(value)?),
            Operation::ExtractConcepts => Self::ExtractConcepts(serde_json::from_value(value)?),
            Operation::SummarizeNotes => Self::SummarizeNotes(serde_json::from_value(value)?),
            Operation::SuggestDiagnoses => Self::SuggestDiagnoses(serde_json::from_value(value)?),
        })
    }
}

/// Static pairing of an input type with its operation and output type,
/// so callers get typed results from the router.
pub trait FlowIo: Sized {
    const OPERATION: Operation;
    type Output;

    fn into_input(self) -> OperationInput;
    fn take_output(output: OperationOutput) -> Option<Self::Output>;
}

macro_rules! flow_io {
    ($input:ident => $variant:ident, $output:ident) => {
        impl FlowIo for $input {
            const OPERATION: Operation = Operation::$variant;
            type Output = $output;

            fn into_input(self) -> OperationInput {
                OperationInput::$variant(self)
            }

            fn take_output(output: OperationOutput) -> Option<Self::Output> {
                match output {
                    OperationOutput::$variant(out) => Some(out),
                    _ => None,
                }
            }
        }
    };
}

flow_io!(ExtractTextInput => ExtractText, ExtractTextOutput);
flow_io!(ExtractConceptsInput => ExtractConcepts, ExtractConceptsOutput);
flow_io!(SummarizeNotesInput => SummarizeNotes, SummarizeNotesOutput);
flow_io!(SuggestDiagnosesInput => SuggestDiagnoses, SuggestDiagnosesOutput);
