pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/match", post(handlers::handle_match))
        .route("/api/v1/match/batch", post(handlers::handle_batch_match))
        .route("/api/v1/match/upload", post(handlers::handle_upload_match))
        .route("/api/v1/match/config", get(handlers::handle_get_config))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::matching::{MatchConfig, MatchContext, MatchingEngine};

    fn app() -> Router {
        let engine =
            MatchingEngine::new(MatchConfig::default(), Arc::new(MatchContext::standard())).unwrap();
        build_router(AppState {
            engine: Arc::new(engine),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(boundary: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{boundary}\r\n"));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/match/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "matcher");
    }

    #[tokio::test]
    async fn test_match_returns_scored_result() {
        let request = post_json(
            "/api/v1/match",
            json!({
                "resume_text": "Python developer with Django and AWS experience",
                "job_description_text": "Looking for Python developer with cloud experience"
            }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["matched_skills"], json!(["python"]));
        assert!(body["relevance_score"].as_f64().unwrap() > 0.0);
        assert!(body["score_breakdown"]["calculation"].is_string());
        assert_eq!(body["semantic_match_details"]["model_used"], "TF-IDF");
    }

    #[tokio::test]
    async fn test_match_with_empty_text_is_unsuccessful_not_http_error() {
        let request = post_json(
            "/api/v1/match",
            json!({ "resume_text": "   ", "job_description_text": "Rust engineer" }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["verdict"], "Error");
        assert_eq!(body["relevance_score"], 0.0);
    }

    #[tokio::test]
    async fn test_match_rejects_invalid_config_override() {
        let request = post_json(
            "/api/v1/match",
            json!({
                "resume_text": "rust",
                "job_description_text": "rust",
                "config": { "high_suitability": 20, "medium_suitability": 60 }
            }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_CONFIG");
    }

    #[tokio::test]
    async fn test_match_applies_config_override() {
        let request = post_json(
            "/api/v1/match",
            json!({
                "resume_text": "Rust engineer building tokio services",
                "job_description_text": "Rust engineer",
                "config": { "max_suggestions": 1, "semantic_backend": "basic" }
            }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configuration_used"]["max_suggestions"], 1);
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 1);
        assert_eq!(body["semantic_match_details"]["model_used"], "Basic");
    }

    #[tokio::test]
    async fn test_batch_match_sorted_with_total() {
        let request = post_json(
            "/api/v1/match/batch",
            json!({
                "resume_text": "Python developer with Django, PostgreSQL and AWS",
                "job_descriptions": [
                    "Pastry chef for a busy bakery",
                    "Python developer with Django and PostgreSQL",
                    "Python developer"
                ]
            }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        let scores: Vec<f64> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["relevance_score"].as_f64().unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "not sorted: {scores:?}");
        assert_eq!(body["results"][2]["job_index"], 0);
    }

    #[tokio::test]
    async fn test_batch_match_requires_job_descriptions() {
        let request = post_json(
            "/api/v1/match/batch",
            json!({ "resume_text": "rust", "job_descriptions": [] }),
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_get_config() {
        let request = Request::builder()
            .uri("/api/v1/match/config")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["semantic_weight"], 0.6);
        assert_eq!(body["fuzzy_backend"], "ratio");
        assert_eq!(body["vocabulary_policy"], "fit_once");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let request = multipart_request(
            "matcherboundary",
            &[
                ("resume_file", Some("resume.txt"), "plain text resume"),
                ("job_description_text", None, "Rust engineer"),
            ],
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_requires_job_description() {
        let request = multipart_request(
            "matcherboundary",
            &[("resume_file", Some("resume.pdf"), "%PDF-1.4 truncated")],
        );
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("job_description_text"));
    }
}
