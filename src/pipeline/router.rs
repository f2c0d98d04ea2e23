//! Dual-provider dispatch.
//!
//! The caller passes the resolved `ProviderId` on every call; the router
//! holds no provider state of its own.

use std::sync::Arc;

use super::data_uri::base64_payload;
use super::{
    render_self_hosted_prompt, entry_for, FlowError, FlowIo, GenerateClient, GenerateRequest,
    HostedPipeline, OperationInput, OperationOutput, ProviderError,
};
use crate::config;
use crate::models::{Operation, ProviderId};

pub struct AiRouter {
    hosted: Arc<dyn HostedPipeline + Send + Sync>,
    self_hosted: Arc<dyn GenerateClient + Send + Sync>,
    vision_model: String,
    text_model: String,
}

impl AiRouter {
    pub fn new(
        hosted: Arc<dyn HostedPipeline + Send + Sync>,
        self_hosted: Arc<dyn GenerateClient + Send + Sync>,
    ) -> Self {
        Self {
            hosted,
            self_hosted,
            vision_model: config::VISION_MODEL.to_string(),
            text_model: config::TEXT_MODEL.to_string(),
        }
    }

    /// Override the self-hosted model identifiers.
    pub fn with_models(mut self, vision_model: &str, text_model: &str) -> Self {
        self.vision_model = vision_model.to_string();
        self.text_model = text_model.to_string();
        self
    }

    /// Self-hosted model for `operation`: the vision model for text
    /// extraction, the text model for everything else.
    pub fn model_for(&self, operation: Operation) -> &str {
        match operation {
            Operation::ExtractText => &self.vision_model,
            _ => &self.text_model,
        }
    }

    /// Run one operation against the selected provider.
    pub fn run(
        &self,
        input: &OperationInput,
        provider: ProviderId,
    ) -> Result<OperationOutput, FlowError> {
        let operation = input.operation();
        tracing::debug!(operation = %operation, provider = %provider, "Routing operation");

        match provider {
            ProviderId::Hosted => {
                input.validate()?;
                let output = self.hosted.invoke(input)?;
                if output.operation() != operation {
                    return Err(ProviderError::MalformedPayload(format!(
                        "hosted pipeline answered {} for {operation}",
                        output.operation()
                    ))
                    .into());
                }
                Ok(output)
            }
            ProviderId::SelfHosted => self.run_self_hosted(input),
        }
    }

    /// Typed variant of [`run`](Self::run).
    pub fn call<I: FlowIo>(&self, input: I, provider: ProviderId) -> Result<I::Output, FlowError> {
        let output = self.run(&input.into_input(), provider)?;
        I::take_output(output).ok_or_else(|| {
            ProviderError::MalformedPayload(format!("unexpected output for {}", I::OPERATION))
                .into()
        })
    }

    /// Request sent to the model server for `input`.
    pub fn build_self_hosted_request(&self, input: &OperationInput) -> GenerateRequest {
        let operation = input.operation();
        let images = match input {
            OperationInput::ExtractText(extract) if entry_for(operation).attaches_document => {
                base64_payload(&extract.document_data_uri).map(|payload| vec![payload.to_string()])
            }
            _ => None,
        };

        GenerateRequest {
            model: self.model_for(operation).to_string(),
            prompt: render_self_hosted_prompt(input),
            stream: false,
            format: "json".into(),
            images,
        }
    }

    /// Single generate call; no retries on this path.
    fn run_self_hosted(&self, input: &OperationInput) -> Result<OperationOutput, FlowError> {
        let operation = input.operation();
        let request = self.build_self_hosted_request(input);
        let _span = tracing::info_span!(
            "self_hosted_generate",
            operation = %operation,
            model = %request.model,
            images = request.images.as_ref().map_or(0, Vec::len),
        )
        .entered();
        let started = std::time::Instant::now();

        let envelope = self.self_hosted.generate(&request)?;

        if let Some(error) = envelope.error {
            return Err(ProviderError::Reported(error).into());
        }
        let raw = envelope.response.ok_or_else(|| {
            ProviderError::MalformedPayload("envelope has no `response` field".into())
        })?;

        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(operation = %operation, response_len = raw.len(), "Self-hosted output is not JSON");
            ProviderError::MalformedPayload(format!("{operation} output is not valid JSON: {e}"))
        })?;

        let output = OperationOutput::from_json(operation, value).map_err(|e| {
            FlowError::Validation(format!("{operation} output does not match its shape: {e}"))
        })?;

        tracing::info!(
            operation = %operation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Self-hosted generate completed"
        );
        Ok(output)
    }
}
