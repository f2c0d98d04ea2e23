//! History endpoints.
//!
//! - `GET /api/history`: filtered list (`status`, `search`)
//! - `POST /api/history`: save an analysis
//! - `PUT /api/history`: import an exported file (replaces everything)
//! - `DELETE /api/history`: clear
//! - `GET|PATCH|DELETE /api/history/:id`: single entry
//! - `GET /api/history/export.json|export.csv`: downloads

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::history::{self, CSV_EXPORT_FILE_NAME, JSON_EXPORT_FILE_NAME};
use crate::models::{HistoryEntry, HistoryUpdate, NewHistoryEntry, ReviewStatus};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<ReviewStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub entries: Vec<HistoryEntry>,
    /// Stored entries before filtering.
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// `GET /api/history`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryListResponse>, ApiError> {
    let all = ctx.blocking(|core| Ok(core.history().list_all()?)).await?;
    let total = all.len();
    let entries = history::filter_entries(
        &all,
        query.status.unwrap_or_default(),
        query.search.as_deref().unwrap_or_default(),
    );
    Ok(Json(HistoryListResponse { entries, total }))
}

/// `POST /api/history`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(entry): Json<NewHistoryEntry>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = ctx
        .blocking(move |core| Ok(core.history().insert(entry)?))
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /api/history/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<HistoryEntry>, ApiError> {
    ctx.blocking(move |core| Ok(core.history().get(id)?))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("history entry {id}")))
}

/// `PATCH /api/history/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    Json(update): Json<HistoryUpdate>,
) -> Result<Json<HistoryEntry>, ApiError> {
    let entry = ctx
        .blocking(move |core| Ok(core.history().update(id, update)?))
        .await?;
    Ok(Json(entry))
}

/// `DELETE /api/history/:id`: succeeds whether or not the entry exists.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ctx.blocking(move |core| Ok(core.history().delete(id)?))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/history`
pub async fn clear(State(ctx): State<ApiContext>) -> Result<StatusCode, ApiError> {
    ctx.blocking(|core| Ok(core.history().clear()?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/history`: body is an exported JSON file.
pub async fn import(
    State(ctx): State<ApiContext>,
    body: String,
) -> Result<Json<CountResponse>, ApiError> {
    let entries = history::parse_import(&body)?;
    let count = entries.len();
    ctx.blocking(move |core| Ok(core.history().bulk_replace(&entries)?))
        .await?;
    Ok(Json(CountResponse { count }))
}

/// `GET /api/history/export.json`
pub async fn export_json(State(ctx): State<ApiContext>) -> Result<impl IntoResponse, ApiError> {
    let entries = ctx.blocking(|core| Ok(core.history().list_all()?)).await?;
    let body = history::export_json(&entries)
        .map_err(|e| ApiError::Internal(format!("export serialization: {e}")))?;
    Ok(download(body, "application/json", JSON_EXPORT_FILE_NAME))
}

/// `GET /api/history/export.csv`
pub async fn export_csv(State(ctx): State<ApiContext>) -> Result<impl IntoResponse, ApiError> {
    let entries = ctx.blocking(|core| Ok(core.history().list_all()?)).await?;
    Ok(download(
        history::export_csv(&entries),
        "text/csv; charset=utf-8",
        CSV_EXPORT_FILE_NAME,
    ))
}

fn download(body: String, content_type: &'static str, file_name: &str) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
}
