pub mod auth;
pub mod files;
pub mod health;
pub mod process;
pub mod rate_limit;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Allowance for multipart framing and the text fields on top of the file itself.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    let authenticated = Router::new()
        .route("/process", post(process::handle_process))
        .route("/files/:filename", get(files::handle_get_file))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let api = Router::new()
        .route("/health", get(health::health_handler))
        .merge(authenticated)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new().nest("/api/v1", api).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::documents::{codec_for, DocumentFormat};
    use crate::llm_client::stub::StubGenerator;
    use crate::storage::LocalStore;

    const BOUNDARY: &str = "resume-api-test-boundary";
    const TOKEN: &str = "test-secret";

    fn app(config: Config, llm: Arc<StubGenerator>) -> Router {
        let store = LocalStore::new(config.upload_dir.clone(), &config.public_base_url);
        let state = AppState::new(config, llm, Arc::new(store)).unwrap();
        build_router(state)
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn process_request(body: Vec<u8>, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/process")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sample_pdf() -> Vec<u8> {
        codec_for(DocumentFormat::Pdf)
            .write(
                "Jane Doe\nExperience\nResponsible for managing things\nSkills\nRust",
                None,
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(
            Config::for_tests(dir.path().to_path_buf()),
            StubGenerator::replying(""),
        );

        let response = app
            .oneshot(get_request("/api/v1/health", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        let time = body["time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[tokio::test]
    async fn test_format_without_job_description_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let llm = StubGenerator::replying("{}");
        let app = app(Config::for_tests(dir.path().to_path_buf()), llm.clone());

        let body = multipart_body(&[("mode", "format")], Some(("cv.pdf", sample_pdf().as_slice())));
        let response = app
            .oneshot(process_request(body, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "jobDescription is required for format mode"})
        );
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_roast_completes_with_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let llm = StubGenerator::replying("This CV lists duties, not results.");
        let app = app(Config::for_tests(dir.path().to_path_buf()), llm.clone());

        let body = multipart_body(
            &[("mode", "roast"), ("documentId", "doc-7")],
            Some(("cv.pdf", sample_pdf().as_slice())),
        );
        let response = app
            .oneshot(process_request(body, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["documentId"], "doc-7");
        assert_eq!(body["feedback"], "This CV lists duties, not results.");
        assert!(body.get("error").is_none());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_upstream_failure_returns_failed_response() {
        let dir = tempfile::tempdir().unwrap();
        let llm = StubGenerator::failing("quota exhausted");
        let app = app(Config::for_tests(dir.path().to_path_buf()), llm);

        let body = multipart_body(&[("mode", "roast")], Some(("cv.pdf", sample_pdf().as_slice())));
        let response = app
            .oneshot(process_request(body, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["status"], "failed");
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to roast CV:"));
        assert!(body["documentId"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path().to_path_buf());
        config.max_file_size = 64;
        let llm = StubGenerator::replying("unused");
        let app = app(config, llm.clone());

        let body = multipart_body(&[("mode", "roast")], Some(("cv.pdf", [b'%'; 512].as_slice())));
        let response = app
            .oneshot(process_request(body, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("64 bytes"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_file_type_makes_no_ai_calls() {
        let dir = tempfile::tempdir().unwrap();
        let llm = StubGenerator::replying("unused");
        let app = app(Config::for_tests(dir.path().to_path_buf()), llm.clone());

        let body = multipart_body(
            &[("mode", "roast")],
            Some(("cv.txt", b"Plain text resume".as_slice())),
        );
        let response = app
            .oneshot(process_request(body, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "Unsupported file type; only PDF and DOCX are allowed"})
        );
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_change_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path().to_path_buf());
        config.webhook_url = Some("http://127.0.0.1:9/hooks/cv".to_string());
        let llm = StubGenerator::replying("Solid, but quantify your impact.");
        let app = app(config, llm);

        let body = multipart_body(&[("mode", "roast")], Some(("cv.pdf", sample_pdf().as_slice())));
        let response = app
            .oneshot(process_request(body, Some(TOKEN)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["feedback"], "Solid, but quantify your impact.");
    }

    #[tokio::test]
    async fn test_missing_or_wrong_bearer_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let llm = StubGenerator::replying("unused");
        let app = app(Config::for_tests(dir.path().to_path_buf()), llm.clone());

        for token in [None, Some("wrong-secret")] {
            let body = multipart_body(&[("mode", "roast")], Some(("cv.pdf", sample_pdf().as_slice())));
            let response = app
                .clone()
                .oneshot(process_request(body, token))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(response).await, json!({"error": "Unauthorized"}));
        }

        let response = app
            .oneshot(get_request("/api/v1/files/report.pdf", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_files_route_serves_and_guards_uploads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cover_letter_1.pdf"), b"%PDF-1.5").unwrap();
        let app = app(
            Config::for_tests(dir.path().to_path_buf()),
            StubGenerator::replying(""),
        );

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/files/cover_letter_1.pdf", Some(TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.5");

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/files/..%2Fsecrets.txt", Some(TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get_request("/api/v1/files/missing.pdf", Some(TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rate_limit_applies_to_all_routes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_tests(dir.path().to_path_buf());
        config.rate_limit_per_minute = 1;
        let app = app(config, StubGenerator::replying(""));

        let first = app
            .clone()
            .oneshot(get_request("/api/v1/health", None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(get_request("/api/v1/health", None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body_json(second).await,
            json!({"error": "Rate limit exceeded"})
        );
    }
}
