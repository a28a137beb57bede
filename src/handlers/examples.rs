//! Example collection handlers.
//!
//! # Endpoints
//!
//! - `GET /examples` - List every example in creation order
//! - `POST /examples` - Create an example (Basic auth + rate limit)

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use tracing::{info, instrument};

use crate::error::{AppError, AppResult, StorageOperation};
use crate::metrics;
use crate::models::{CreateExampleRequest, CreateExampleResponse, Example};
use crate::state::AppState;
use crate::validation::validate_example_name;

/// List all examples.
///
/// # Response Body
///
/// ```json
/// [{ "id": 1, "name": "Example 1" }]
/// ```
#[instrument(skip(state))]
pub async fn list_examples(State(state): State<AppState>) -> AppResult<Json<Vec<Example>>> {
    let examples = state.repository.list().await.map_err(|e| {
        metrics::record_storage_error(StorageOperation::FetchExamples);
        AppError::storage(StorageOperation::FetchExamples, e)
    })?;

    Ok(Json(examples))
}

/// Create a new example.
///
/// # Request Body
///
/// ```json
/// { "name": "Example 1" }
/// ```
///
/// Any body rejection (bad JSON, wrong content type, too large) is a 400.
#[instrument(skip(state, payload))]
pub async fn create_example(
    State(state): State<AppState>,
    payload: Result<Json<CreateExampleRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CreateExampleResponse>)> {
    let Json(request) = payload?;
    validate_example_name(&request.name)?;

    let id = state.repository.create(&request.name).await.map_err(|e| {
        metrics::record_storage_error(StorageOperation::CreateExample);
        AppError::storage(StorageOperation::CreateExample, e)
    })?;

    metrics::record_example_created();
    info!(id, "Example created");

    Ok((StatusCode::CREATED, Json(CreateExampleResponse::created(id))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::models::ExampleId;
    use crate::repository::{ExampleRepository, InMemoryExampleRepository, RepositoryError};

    /// Repository whose backend is always down.
    struct FailingRepository;

    #[async_trait]
    impl ExampleRepository for FailingRepository {
        async fn create(&self, _name: &str) -> Result<ExampleId, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }

        async fn list(&self) -> Result<Vec<Example>, RepositoryError> {
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }
    }

    fn app(repository: Arc<dyn ExampleRepository>) -> (Router, AppState) {
        let state = AppState::with_dependencies(Config::default(), repository, None).unwrap();
        let router = Router::new()
            .route("/examples", get(list_examples).post(create_example))
            .with_state(state.clone());
        (router, state)
    }

    fn post_json(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/examples")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let (router, state) = app(Arc::new(InMemoryExampleRepository::new()));

        let created = router
            .clone()
            .oneshot(post_json(r#"{"name":"Example 1"}"#))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = read_json(created).await;
        assert_eq!(body["message"], "Example created successfully");
        assert_eq!(body["id"], 1);

        let listed = router
            .oneshot(Request::get("/examples").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(listed.status(), StatusCode::OK);
        assert_eq!(
            read_json(listed).await,
            serde_json::json!([{ "id": 1, "name": "Example 1" }])
        );

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_empty() {
        let (router, state) = app(Arc::new(InMemoryExampleRepository::new()));

        let response = router
            .oneshot(Request::get("/examples").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(read_json(response).await, serde_json::json!([]));

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (router, state) = app(Arc::new(InMemoryExampleRepository::new()));

        let response = router.oneshot(post_json(r#"{"name":"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_name_is_bad_request() {
        let (router, state) = app(Arc::new(InMemoryExampleRepository::new()));

        let response = router.oneshot(post_json("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await["error"],
            "Missing required field: name"
        );

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected_before_storage() {
        let (router, state) = app(Arc::new(InMemoryExampleRepository::new()));

        let response = router.oneshot(post_json(r#"{"name":"   "}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.repository.list().await.unwrap().is_empty());

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_storage_failures_are_generic_500s() {
        let (router, state) = app(Arc::new(FailingRepository));

        let create = router
            .clone()
            .oneshot(post_json(r#"{"name":"x"}"#))
            .await
            .unwrap();
        assert_eq!(create.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(create).await,
            serde_json::json!({ "error": "Failed to create example" })
        );

        let list = router
            .oneshot(Request::get("/examples").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(list.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_json(list).await,
            serde_json::json!({ "error": "Failed to fetch examples" })
        );

        state.shutdown().await;
    }
}
