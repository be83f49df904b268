//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server needed.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use tryon_api::error::AppError;
use tryon_core::error::CoreError;
use tryon_vertex::api::VertexError;
use tryon_vertex::auth::AuthError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn validation_error_returns_400() {
    let err = AppError::Core(CoreError::Validation("At most 2 garment images".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "At most 2 garment images");
}

#[tokio::test]
async fn missing_prediction_returns_502() {
    let err = AppError::Core(CoreError::MissingField("No predictions returned from API."));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "BAD_GATEWAY");
    assert_eq!(json["error"], "No predictions returned from API.");
}

#[tokio::test]
async fn unusable_upstream_image_returns_502() {
    let err = AppError::Core(CoreError::InvalidResponse(
        "Invalid image data in API response: Unreadable image".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "BAD_GATEWAY");
}

#[tokio::test]
async fn upstream_status_and_body_pass_through() {
    let err = AppError::Vertex(VertexError::Api {
        status: 413,
        body: "{\"error\":{\"message\":\"Request payload size exceeds the limit\"}}".into(),
        retry_after: None,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "UPSTREAM_ERROR");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Request payload size exceeds the limit"));
}

#[tokio::test]
async fn missing_token_returns_401() {
    let err = AppError::Auth(AuthError::Missing("Missing access token.".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Missing access token.");
}

#[tokio::test]
async fn cancellation_returns_503() {
    let (status, json) = error_to_response(AppError::Vertex(VertexError::Cancelled)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn internal_error_hides_details() {
    let err = AppError::Core(CoreError::Internal("image task failed: secret stack trace".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}
