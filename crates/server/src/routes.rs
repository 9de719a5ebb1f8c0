//! Router assembly.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{AppState, ask_handler, logs_handler, root_handler};

/// Create the service router.
///
/// Endpoints:
/// - POST {prefix}/ask
/// - GET  {prefix}/logs
/// - GET  /
pub fn create_router(state: Arc<AppState>, prefix: &str) -> Router {
    let api_routes = Router::new()
        .route("/ask", post(ask_handler))
        .route("/logs", get(logs_handler))
        .with_state(state);

    let prefix = prefix.trim_end_matches('/');
    let router = if prefix.is_empty() { Router::new().merge(api_routes) } else { Router::new().nest(prefix, api_routes) };

    router
        .route("/", get(root_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tradex_core::cache::DEFAULT_TTL;
    use tradex_core::testing::{FakeSource, ScriptedTranslator, lpi_row};
    use tradex_core::{ActivityLog, AskPipeline, QueryExecutor, SnapshotCache};

    fn rows() -> Vec<tradex_core::RawRecord> {
        vec![
            lpi_row(1, "singapore", "east asia & pacific", json!(4.3), json!(2023)),
            lpi_row(2, "japan", "east asia & pacific", json!("3.9"), json!(2023)),
            lpi_row(3, "japan", "east asia & pacific", json!(4.0), json!(2018)),
        ]
    }

    fn app_with(source: FakeSource, translator: ScriptedTranslator, prefix: &str) -> Router {
        let log = Arc::new(ActivityLog::default());
        let cache = Arc::new(SnapshotCache::new(Arc::new(source), Arc::clone(&log), DEFAULT_TTL));
        let pipeline = AskPipeline::new(cache, Arc::new(translator), QueryExecutor::default(), log);
        create_router(Arc::new(AppState::new(Arc::new(pipeline))), prefix)
    }

    fn app(translator: ScriptedTranslator) -> Router {
        app_with(FakeSource::with_rows(rows()), translator, "/api")
    }

    fn ask(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ask_returns_rows_and_sql() {
        let app = app(ScriptedTranslator::replying(
            "```sql\nSELECT country, lpi_score FROM countries_lpi WHERE year = 2023 AND ilike(region, '%asia%') ORDER BY lpi_score DESC\n```",
        ));

        let response = app.oneshot(ask("/api/ask", r#"{"question": "Asian countries"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(
            body["answer"],
            json!([{"country": "Singapore", "lpi_score": 4.3}, {"country": "Japan", "lpi_score": 3.9}])
        );
        assert!(body["sql"].as_str().unwrap().starts_with("SELECT country, lpi_score FROM countries_lpi"));
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_missing_question_is_bad_request() {
        for body in [r#"{}"#, r#"{"question": ""}"#, r#"{"question": "  "}"#, "", "not json"] {
            let response = app(ScriptedTranslator::replying("SELECT 1"))
                .oneshot(ask("/api/ask", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body:?}");
            assert_eq!(json_body(response).await, json!({"error": "Question is required"}));
        }
    }

    #[tokio::test]
    async fn test_empty_dataset_message() {
        let source = FakeSource::with_rows(vec![lpi_row(1, "chad", "africa", json!("n/a"), json!(2023))]);
        let app = app_with(source, ScriptedTranslator::replying("SELECT 1"), "/api");

        let response = app.oneshot(ask("/api/ask", r#"{"question": "anything"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"answer": [], "sql": "", "message": "No valid data found in database."})
        );
    }

    #[tokio::test]
    async fn test_rejected_query_status() {
        let app = app(ScriptedTranslator::replying("DROP TABLE countries_lpi"));

        let response = app.oneshot(ask("/api/ask", r#"{"question": "drop it"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert_eq!(body["code"], "QUERY_REJECTED");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_store_failure_is_bad_gateway() {
        let app = app_with(FakeSource::failing("connection refused"), ScriptedTranslator::replying("SELECT 1"), "/api");

        let response = app.oneshot(ask("/api/ask", r#"{"question": "top"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["details"], "connection refused");
    }

    #[tokio::test]
    async fn test_logs_newest_first() {
        let app = app(ScriptedTranslator::replying("SELECT country FROM countries_lpi WHERE year = 2023"));

        let response = app.clone().oneshot(ask("/api/ask", r#"{"question": "countries"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/logs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let logs = json_body(response).await;
        let logs = logs.as_array().unwrap();
        assert_eq!(logs[0]["type"], "RESULT");
        assert_eq!(logs[0]["message"], "Returned 2 rows");
        assert!(logs[0].get("details").is_none());
        assert_eq!(logs.last().unwrap()["type"], "QUERY");
        let ids: Vec<u64> = logs.iter().map(|e| e["id"].as_u64().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_root_banner_and_custom_prefix() {
        let app = app_with(FakeSource::with_rows(rows()), ScriptedTranslator::replying("SELECT 1"), "");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"TradeXchange API is running");

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/logs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/logs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let response = app(ScriptedTranslator::replying("SELECT 1"))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/ask")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
