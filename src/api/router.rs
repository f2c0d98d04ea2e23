//! API router.
//!
//! Returns a composable `Router` with every endpoint under `/api/`.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{any, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::api::proxy;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Uploaded documents arrive as base64 data URIs inside JSON bodies.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build the API router over a shared `CoreState`.
pub fn api_router(core: Arc<CoreState>) -> Result<Router, ApiError> {
    Ok(build_router(ApiContext::new(core)?))
}

fn build_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/provider",
            get(endpoints::provider::get).put(endpoints::provider::set),
        )
        .route("/flows/:operation", post(endpoints::flows::run))
        .route("/analyze", post(endpoints::flows::analyze))
        .route(
            "/history",
            get(endpoints::history::list)
                .post(endpoints::history::create)
                .put(endpoints::history::import)
                .delete(endpoints::history::clear),
        )
        .route("/history/export.json", get(endpoints::history::export_json))
        .route("/history/export.csv", get(endpoints::history::export_csv))
        .route(
            "/history/:id",
            get(endpoints::history::detail)
                .patch(endpoints::history::update)
                .delete(endpoints::history::remove),
        )
        .route("/ollama/*path", any(proxy::forward))
        .with_state(ctx);

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::models::ProviderId;
    use crate::pipeline::{
        AiRouter, MockGenerateClient, MockHostedPipeline, OperationOutput, ProviderError,
        SummarizeNotesOutput,
    };

    fn core_with(hosted: MockHostedPipeline, self_hosted: MockGenerateClient) -> Arc<CoreState> {
        core_with_host(hosted, self_hosted, "http://127.0.0.1:1")
    }

    fn core_with_host(
        hosted: MockHostedPipeline,
        self_hosted: MockGenerateClient,
        ollama_host: &str,
    ) -> Arc<CoreState> {
        let router = AiRouter::new(Arc::new(hosted), Arc::new(self_hosted));
        Arc::new(CoreState::in_memory(router, ollama_host).unwrap())
    }

    fn test_core() -> Arc<CoreState> {
        core_with(
            MockHostedPipeline::new(OperationOutput::SummarizeNotes(SummarizeNotesOutput {
                summary: "Resumen alojado".into(),
            })),
            MockGenerateClient::new(&json!({"summary": "Resumen local"}).to_string()),
        )
    }

    fn app(core: Arc<CoreState>) -> Router {
        api_router(core).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn read_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_version_and_provider() {
        let response = app(test_core())
            .oneshot(empty_request("GET", "/api/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
        let json = read_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["provider"], "genkit");
    }

    #[tokio::test]
    async fn provider_preference_round_trip() {
        let core = test_core();
        let response = app(core.clone())
            .oneshot(json_request("PUT", "/api/provider", json!({"provider": "ollama"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(core.preferences().get().unwrap(), ProviderId::SelfHosted);

        let response = app(core)
            .oneshot(empty_request("GET", "/api/provider"))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["provider"], "ollama");
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let response = app(test_core())
            .oneshot(json_request("PUT", "/api/provider", json!({"provider": "openai"})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn flow_uses_stored_preference() {
        let core = test_core();
        core.preferences().set(ProviderId::SelfHosted).unwrap();

        let response = app(core)
            .oneshot(json_request(
                "POST",
                "/api/flows/summarizeClinicalNotes",
                json!({"notes": "Paciente estable"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["summary"], "Resumen local");
    }

    #[tokio::test]
    async fn flow_query_overrides_preference() {
        let core = test_core();
        core.preferences().set(ProviderId::SelfHosted).unwrap();

        let response = app(core)
            .oneshot(json_request(
                "POST",
                "/api/flows/summarizeClinicalNotes?provider=genkit",
                json!({"notes": "Paciente estable"}),
            ))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["summary"], "Resumen alojado");
    }

    #[tokio::test]
    async fn unknown_operation_is_404() {
        let response = app(test_core())
            .oneshot(json_request("POST", "/api/flows/translate", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_input_shape_is_400() {
        let response = app(test_core())
            .oneshot(json_request(
                "POST",
                "/api/flows/summarizeClinicalNotes",
                json!({"text": "no notes field"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn provider_failure_is_502() {
        let core = core_with(
            MockHostedPipeline::failing(|| ProviderError::Hosted("quota".into())),
            MockGenerateClient::new("{}"),
        );
        let response = app(core)
            .oneshot(json_request(
                "POST",
                "/api/flows/extractClinicalConcepts",
                json!({"text": "Fiebre"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(read_json(response).await["error"]["code"], "PROVIDER");
    }

    #[tokio::test]
    async fn analyze_rejects_blank_text() {
        let response = app(test_core())
            .oneshot(json_request("POST", "/api/analyze", json!({"text": "  "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyze_chains_on_self_hosted() {
        let core = core_with(
            MockHostedPipeline::failing(|| ProviderError::Hosted("unused".into())),
            MockGenerateClient::new(
                &json!({
                    "clinicalConcepts": ["cefalea"],
                    "diagnoses": [{"code": "R51", "description": "Cefalea", "confidence": "Media"}]
                })
                .to_string(),
            ),
        );
        let response = app(core)
            .oneshot(json_request(
                "POST",
                "/api/analyze?provider=ollama",
                json!({"text": "Dolor de cabeza", "codingSystem": "CIE-11"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["concepts"], json!(["cefalea"]));
        assert_eq!(json["diagnoses"][0]["code"], "R51");
    }

    #[tokio::test]
    async fn history_crud_over_http() {
        let core = test_core();

        let response = app(core.clone())
            .oneshot(json_request(
                "POST",
                "/api/history",
                json!({"fileName": "analitica.png", "codingSystem": "CIE-10", "concepts": ["anemia"]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = read_json(response).await["id"].as_i64().unwrap();

        let response = app(core.clone())
            .oneshot(json_request(
                "PATCH",
                &format!("/api/history/{id}"),
                json!({"isReviewed": true}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = read_json(response).await;
        assert_eq!(updated["isReviewed"], true);
        assert_eq!(updated["fileName"], "analitica.png");

        let response = app(core.clone())
            .oneshot(empty_request("GET", "/api/history?status=pending"))
            .await
            .unwrap();
        let json = read_json(response).await;
        assert_eq!(json["entries"], json!([]));
        assert_eq!(json["total"], 1);

        let response = app(core.clone())
            .oneshot(empty_request("GET", "/api/history?search=ANEMIA"))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["entries"][0]["id"], id);

        let response = app(core.clone())
            .oneshot(empty_request("DELETE", &format!("/api/history/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Deleting again is harmless; fetching is not.
        let response = app(core.clone())
            .oneshot(empty_request("DELETE", &format!("/api/history/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = app(core)
            .oneshot(empty_request("GET", &format!("/api/history/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_missing_entry_is_404() {
        let response = app(test_core())
            .oneshot(json_request("PATCH", "/api/history/404", json!({"isReviewed": true})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_then_import_restores_snapshot() {
        let core = test_core();
        let entry = crate::models::NewHistoryEntry {
            file_name: "nota.pdf".into(),
            summary: Some("Resumen".into()),
            ..Default::default()
        };
        core.history().insert(entry).unwrap();
        let snapshot = core.history().list_all().unwrap();

        let response = app(core.clone())
            .oneshot(empty_request("GET", "/api/history/export.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("dualmint_medic_history.json"));
        let exported = read_text(response).await;

        let response = app(core.clone())
            .oneshot(empty_request("DELETE", "/api/history"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(core.history().count().unwrap(), 0);

        let response = app(core.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/history")
                    .body(Body::from(exported))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(read_json(response).await["count"], 1);
        assert_eq!(core.history().list_all().unwrap(), snapshot);
    }

    #[tokio::test]
    async fn import_rejects_bad_shape_and_keeps_history() {
        let core = test_core();
        core.history()
            .insert(crate::models::NewHistoryEntry {
                file_name: "a.png".into(),
                ..Default::default()
            })
            .unwrap();

        let response = app(core.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/history")
                    .body(Body::from(r#"[{"fileName": "x"}]"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"]["code"], "IMPORT_FORMAT");
        assert_eq!(core.history().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn import_with_repeated_ids_is_format_error() {
        let core = test_core();
        let response = app(core.clone())
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/history")
                    .body(Body::from(
                        r#"[{"id":1,"timestamp":1,"fileName":"a"},{"id":1,"timestamp":2,"fileName":"b"}]"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "IMPORT_FORMAT");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("repeats id 1"));
        assert_eq!(core.history().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn csv_export_has_header() {
        let response = app(test_core())
            .oneshot(empty_request("GET", "/api/history/export.csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let csv = read_text(response).await;
        assert!(csv.starts_with("ID,Timestamp,FileName,Reviewed"));
    }

    #[tokio::test]
    async fn proxy_forwards_method_path_and_status() {
        use wiremock::matchers::{body_json, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .and(query_param("verbose", "true"))
            .and(body_json(json!({"name": "llama3"})))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let core = core_with_host(
            MockHostedPipeline::failing(|| ProviderError::Hosted("unused".into())),
            MockGenerateClient::new("{}"),
            &server.uri(),
        );
        let response = app(core)
            .oneshot(json_request(
                "POST",
                "/api/ollama/show?verbose=true",
                json!({"name": "llama3"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        assert_eq!(read_json(response).await["error"], "model not found");
    }

    #[tokio::test]
    async fn proxy_get_passes_body_through() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"models": [{"name": "llava:latest"}]})),
            )
            .mount(&server)
            .await;

        let core = core_with_host(
            MockHostedPipeline::failing(|| ProviderError::Hosted("unused".into())),
            MockGenerateClient::new("{}"),
            &server.uri(),
        );
        let response = app(core)
            .oneshot(empty_request("GET", "/api/ollama/tags"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["models"][0]["name"], "llava:latest");
    }

    #[tokio::test]
    async fn proxy_transport_failure_is_500_with_error() {
        let response = app(test_core())
            .oneshot(empty_request("GET", "/api/ollama/tags"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(read_json(response).await["error"].is_string());
    }
}
