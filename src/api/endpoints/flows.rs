//! LLM operation endpoints.
//!
//! - `POST /api/flows/:operation`: run one operation
//! - `POST /api/analyze`: concepts then diagnoses
//!
//! Both accept `?provider=genkit|ollama`; without it the stored
//! preference decides.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{CodingSystem, Operation, ProviderId};
use crate::pipeline::{analyze_text, ClinicalAnalysis, OperationInput, OperationOutput};

#[derive(Debug, Default, Deserialize)]
pub struct ProviderQuery {
    pub provider: Option<ProviderId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub text: String,
    #[serde(default)]
    pub coding_system: CodingSystem,
}

/// `POST /api/flows/:operation`
pub async fn run(
    State(ctx): State<ApiContext>,
    Path(operation): Path<String>,
    Query(query): Query<ProviderQuery>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<OperationOutput>, ApiError> {
    let operation = Operation::from_str(&operation)
        .map_err(|_| ApiError::NotFound(format!("unknown operation `{operation}`")))?;
    let input = OperationInput::from_json(operation, body)?;

    let output = ctx
        .blocking(move |core| {
            let provider = core.resolve_provider(query.provider)?;
            Ok(core.router().run(&input, provider)?)
        })
        .await?;

    Ok(Json(output))
}

/// `POST /api/analyze`
pub async fn analyze(
    State(ctx): State<ApiContext>,
    Query(query): Query<ProviderQuery>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<ClinicalAnalysis>, ApiError> {
    let analysis = ctx
        .blocking(move |core| {
            let provider = core.resolve_provider(query.provider)?;
            Ok(analyze_text(
                core.router(),
                &request.text,
                request.coding_system,
                provider,
            )?)
        })
        .await?;

    Ok(Json(analysis))
}
