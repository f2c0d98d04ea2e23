//! Provider preference endpoints.
//!
//! - `GET /api/provider`: selected backend
//! - `PUT /api/provider`: select a backend

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::ProviderId;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderBody {
    pub provider: ProviderId,
}

/// `GET /api/provider`
pub async fn get(State(ctx): State<ApiContext>) -> Result<Json<ProviderBody>, ApiError> {
    let provider = ctx.blocking(|core| Ok(core.preferences().get()?)).await?;
    Ok(Json(ProviderBody { provider }))
}

/// `PUT /api/provider`
pub async fn set(
    State(ctx): State<ApiContext>,
    Json(body): Json<ProviderBody>,
) -> Result<Json<ProviderBody>, ApiError> {
    let provider = body.provider;
    ctx.blocking(move |core| Ok(core.preferences().set(provider)?))
        .await?;
    Ok(Json(ProviderBody { provider }))
}
