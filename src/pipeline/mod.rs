pub mod analysis; // Chained concepts → diagnoses run
pub mod data_uri;
pub mod hosted; // Hosted pipelines + bounded retry
pub mod ollama; // Self-hosted model server client
pub mod operations;
pub mod prompt_templates; // Operation registry
pub mod router; // Dual-provider dispatch

pub use analysis::*;
pub use hosted::*;
pub use ollama::*;
pub use operations::*;
pub use prompt_templates::*;
pub use router::*;

use thiserror::Error;

/// Failures talking to either AI backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("AI provider is not reachable at {0}")]
    Connection(String),

    #[error("AI provider returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("AI provider reported an error: {0}")]
    Reported(String),

    #[error("AI provider returned a malformed payload: {0}")]
    MalformedPayload(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Hosted pipeline failed: {0}")]
    Hosted(String),

    #[error("Hosted provider is not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Worth another attempt by a retrying hosted pipeline.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::HttpClient(_) | Self::MalformedPayload(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Reported(_) | Self::Hosted(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Error surface of a routed operation.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
