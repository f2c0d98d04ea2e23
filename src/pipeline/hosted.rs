//! Hosted pipelines: schema-constrained calls to a hosted model API, with
//! a bounded retry wrapper.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::data_uri::parse_data_uri;
use super::{render_hosted_prompt, entry_for, OperationInput, OperationOutput, ProviderError};
use crate::config;
use crate::models::Operation;

/// Hosted capability for all four operations. One call is one attempt
/// unless the implementation retries internally.
pub trait HostedPipeline {
    fn invoke(&self, input: &OperationInput) -> Result<OperationOutput, ProviderError>;
}

// ═══════════════════════════════════════════════════════════
// Retry wrapper
// ═══════════════════════════════════════════════════════════

/// Retries transient failures up to the operation's registered budget and
/// surfaces the last failure once the budget is spent.
pub struct RetryingPipeline<P> {
    inner: P,
    backoff: Duration,
}

impl<P: HostedPipeline> RetryingPipeline<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            backoff: Duration::from_millis(500),
        }
    }

    /// Pause between attempts, multiplied by the attempt number.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: HostedPipeline> HostedPipeline for RetryingPipeline<P> {
    fn invoke(&self, input: &OperationInput) -> Result<OperationOutput, ProviderError> {
        let operation = input.operation();
        let max_retries = entry_for(operation).max_retries;
        let mut attempt = 0u32;

        loop {
            match self.inner.invoke(input) {
                Ok(output) => return Ok(output),
                Err(e) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        operation = %operation,
                        attempt,
                        max_retries,
                        error = %e,
                        "Hosted pipeline attempt failed, retrying"
                    );
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff * attempt);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Gemini generateContent backend
// ═══════════════════════════════════════════════════════════

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Hosted pipeline over the Generative Language `generateContent` API.
///
/// Each operation is sent with its hosted prompt, the document as inline
/// data for `ExtractText`, and a response schema; the JSON reply is
/// decoded into the operation's typed output.
pub struct GeminiPipeline {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiPipeline {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config::HOSTED_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            client,
        })
    }

    /// Public endpoint, key and model from the environment. A missing key
    /// is reported on first use, not here.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::new(GEMINI_BASE_URL, config::hosted_api_key(), &config::hosted_model())
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn request_body(&self, input: &OperationInput) -> Result<Value, ProviderError> {
        let mut parts = vec![json!({ "text": render_hosted_prompt(input) })];

        if let OperationInput::ExtractText(extract) = input {
            let document = parse_data_uri(&extract.document_data_uri)
                .map_err(ProviderError::Hosted)?;
            parts.push(json!({
                "inlineData": {
                    "mimeType": document.mime_type,
                    "data": document.payload,
                }
            }));
        }

        Ok(json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(input.operation()),
            }
        }))
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl HostedPipeline for GeminiPipeline {
    fn invoke(&self, input: &OperationInput) -> Result<OperationOutput, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("set GEMINI_API_KEY or GOOGLE_API_KEY".into())
        })?;
        let operation = input.operation();
        let _span = tracing::info_span!("hosted_invoke", operation = %operation, model = %self.model)
            .entered();
        let started = std::time::Instant::now();

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = self.request_body(input)?;

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Connection(self.base_url.clone())
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

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| ProviderError::MalformedPayload(format!("generateContent: {e}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Hosted("response has no candidates".into()))?;
        let text = candidate
            .content
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| {
                ProviderError::Hosted(format!(
                    "candidate has no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedPayload(format!("{operation} output: {e}")))?;
        let output = OperationOutput::from_json(operation, value).map_err(|e| {
            ProviderError::MalformedPayload(format!("{operation} output shape: {e}"))
        })?;

        tracing::info!(
            operation = %operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Hosted pipeline completed"
        );
        Ok(output)
    }
}

/// OpenAPI-subset schema of each operation's output.
pub fn response_schema(operation: Operation) -> Value {
    match operation {
        Operation::ExtractText => json!({
            "type": "OBJECT",
            "properties": { "extractedText": { "type": "STRING" } },
            "required": ["extractedText"],
        }),
        Operation::ExtractConcepts => json!({
            "type": "OBJECT",
            "properties": {
                "clinicalConcepts": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": ["clinicalConcepts"],
        }),
        Operation::SummarizeNotes => json!({
            "type": "OBJECT",
            "properties": { "summary": { "type": "STRING" } },
            "required": ["summary"],
        }),
        Operation::SuggestDiagnoses => json!({
            "type": "OBJECT",
            "properties": {
                "diagnoses": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "code": { "type": "STRING" },
                            "description": { "type": "STRING" },
                            "confidence": { "type": "STRING", "enum": ["Alta", "Media", "Baja"] },
                        },
                        "required": ["code", "description", "confidence"],
                    }
                }
            },
            "required": ["diagnoses"],
        }),
    }
}

// ═══════════════════════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════════════════════

/// Mock hosted pipeline: returns a fixed output (or failure), counts
/// calls and records every input.
pub struct MockHostedPipeline {
    result: Result<OperationOutput, fn() -> ProviderError>,
    calls: AtomicUsize,
    inputs: Mutex<Vec<OperationInput>>,
}

impl MockHostedPipeline {
    pub fn new(output: OperationOutput) -> Self {
        Self {
            result: Ok(output),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call with the error built by `make_error`.
    pub fn failing(make_error: fn() -> ProviderError) -> Self {
        Self {
            result: Err(make_error),
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<OperationInput> {
        self.inputs
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl HostedPipeline for MockHostedPipeline {
    fn invoke(&self, input: &OperationInput) -> Result<OperationOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.inputs.lock() {
            guard.push(input.clone());
        }
        match &self.result {
            Ok(output) => Ok(output.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{
        ExtractTextInput, SummarizeNotesInput, SummarizeNotesOutput,
    };
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn notes_input() -> OperationInput {
        OperationInput::SummarizeNotes(SummarizeNotesInput {
            notes: "Paciente con fiebre".into(),
        })
    }

    fn summary(text: &str) -> OperationOutput {
        OperationOutput::SummarizeNotes(SummarizeNotesOutput {
            summary: text.into(),
        })
    }

    /// Fails transiently a fixed number of times, then succeeds.
    struct Flaky {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    impl HostedPipeline for Flaky {
        fn invoke(&self, _input: &OperationInput) -> Result<OperationOutput, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(ProviderError::Status {
                    status: 503,
                    body: "overloaded".into(),
                });
            }
            Ok(summary("ok"))
        }
    }

    #[test]
    fn retry_recovers_from_transient_failures() {
        let pipeline = RetryingPipeline::new(Flaky {
            failures_left: AtomicUsize::new(2),
            calls: AtomicUsize::new(0),
        })
        .with_backoff(Duration::ZERO);

        assert_eq!(pipeline.invoke(&notes_input()).unwrap(), summary("ok"));
        assert_eq!(pipeline.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retry_gives_up_after_budget_and_surfaces_last_error() {
        let pipeline = RetryingPipeline::new(MockHostedPipeline::failing(|| {
            ProviderError::Connection("hosted".into())
        }))
        .with_backoff(Duration::ZERO);

        let err = pipeline.invoke(&notes_input()).unwrap_err();
        assert!(matches!(err, ProviderError::Connection(_)));
        assert_eq!(pipeline.inner().call_count(), 4);
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let pipeline = RetryingPipeline::new(MockHostedPipeline::failing(|| {
            ProviderError::NotConfigured("no key".into())
        }))
        .with_backoff(Duration::ZERO);

        assert!(pipeline.invoke(&notes_input()).is_err());
        assert_eq!(pipeline.inner().call_count(), 1);
    }

    #[test]
    fn missing_key_is_not_configured() {
        let pipeline = GeminiPipeline::new("http://127.0.0.1:1", None, "gemini-test").unwrap();
        assert!(!pipeline.is_configured());
        let err = pipeline.invoke(&notes_input()).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn extract_text_sends_inline_document() {
        let pipeline =
            GeminiPipeline::new("http://unused", Some("k".into()), "gemini-test").unwrap();
        let input = OperationInput::ExtractText(ExtractTextInput {
            document_data_uri: "data:application/pdf;base64,AAAA".into(),
        });
        let body = pipeline.request_body(&input).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], "AAAA");
        assert!(!parts[0]["text"].as_str().unwrap().contains("AAAA"));
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"][0],
            "extractedText"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn decodes_candidate_text_into_typed_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"summary\":\"Fiebre aguda\"}" }] },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let output = tokio::task::spawn_blocking(move || {
            GeminiPipeline::new(&uri, Some("secret".into()), "gemini-test")
                .unwrap()
                .invoke(&notes_input())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(output, summary("Fiebre aguda"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wrong_output_shape_is_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "{\"other\":1}" }] } }]
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = tokio::task::spawn_blocking(move || {
            GeminiPipeline::new(&uri, Some("k".into()), "gemini-test")
                .unwrap()
                .invoke(&notes_input())
        })
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, ProviderError::MalformedPayload(_)));
    }
}
