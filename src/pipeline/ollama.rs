//! Self-hosted model server client (`POST /api/generate`).

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::config;

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub format: String,
    /// Bare base64 payloads, no data-URI prefix.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub images: Option<Vec<String>>,
}

/// Non-streaming response of `/api/generate`. Only the fields the router
/// reads are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateEnvelope {
    /// JSON-encoded model output (requested with `format: "json"`).
    #[serde(default)]
    pub response: Option<String>,
    /// Set by the server instead of `response` on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// Seam over the model server so the router can be tested without one.
pub trait GenerateClient {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateEnvelope, ProviderError>;
}

/// Blocking HTTP client for an Ollama-compatible server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Client with the self-hosted request budget
    /// (`config::SELF_HOSTED_TIMEOUT_SECS`, 5 minutes).
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        Self::with_timeout(base_url, config::SELF_HOSTED_TIMEOUT_SECS)
    }

    /// Connecting is bounded separately (10 s); `timeout_secs` covers the
    /// whole request including generation.
    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Client for `OLLAMA_HOST`, or the local default.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(&config::ollama_host())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl GenerateClient for OllamaClient {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateEnvelope, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self.client.post(&url).json(request).send().map_err(|e| {
            if e.is_connect() {
                ProviderError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ProviderError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ProviderError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| ProviderError::MalformedPayload(format!("generate envelope: {e}")))
    }
}

/// Mock model server: returns a fixed envelope and records every request.
pub struct MockGenerateClient {
    result: Result<GenerateEnvelope, (u16, String)>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockGenerateClient {
    /// Envelope whose `response` field is `response`.
    pub fn new(response: &str) -> Self {
        Self::with_envelope(GenerateEnvelope {
            response: Some(response.to_string()),
            error: None,
        })
    }

    pub fn with_envelope(envelope: GenerateEnvelope) -> Self {
        Self {
            result: Ok(envelope),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with a non-success status.
    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            result: Err((status, body.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl GenerateClient for MockGenerateClient {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateEnvelope, ProviderError> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request.clone());
        }
        match &self.result {
            Ok(envelope) => Ok(envelope.clone()),
            Err((status, body)) => Err(ProviderError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}
