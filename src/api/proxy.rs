//! Passthrough proxy to the self-hosted model server.
//!
//! `/api/ollama/<path>` is forwarded with the same method, query string
//! and body to `<OLLAMA_HOST>/api/<path>`. Both bodies are streamed: the
//! request body goes upstream as it arrives and the upstream status,
//! content type and body come back unbuffered, so streaming generate/pull
//! responses pass through chunk by chunk.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::ApiContext;

/// `ANY /api/ollama/*path`
pub async fn forward(
    State(ctx): State<ApiContext>,
    Path(path): Path<String>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let mut url = format!(
        "{}/api/{}",
        ctx.core.ollama_host(),
        path.trim_start_matches('/')
    );
    if let Some(query) = parts.uri.query() {
        url.push('?');
        url.push_str(query);
    }

    tracing::debug!(method = %parts.method, %url, "Proxying to model server");

    let mut upstream = ctx.proxy_client.request(parts.method.clone(), &url);
    if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
        upstream = upstream.header(header::CONTENT_TYPE, content_type.clone());
    }
    if parts.method != Method::GET && parts.method != Method::HEAD {
        if let Some(length) = parts.headers.get(header::CONTENT_LENGTH) {
            upstream = upstream.header(header::CONTENT_LENGTH, length.clone());
        }
        upstream = upstream.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = match upstream.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(%url, error = %e, "Model server proxy request failed");
            return proxy_failure(format!("Failed to reach model server: {e}"));
        }
    };

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}

fn proxy_failure(message: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
