#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use tryon_api::config::ServerConfig;
use tryon_api::router::build_app_router;
use tryon_api::state::AppState;
use tryon_core::retry::RetryPolicy;
use tryon_vertex::api::VertexApi;
use tryon_vertex::auth::{StaticToken, TokenChain, TokenProvider};
use tryon_vertex::tryon::TryOnService;

pub const PROJECT: &str = "test-project";

/// Build a test `ServerConfig` pointing at `vertex_base_url` with no retry waits.
pub fn test_config(vertex_base_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_body_bytes: 8 * 1024 * 1024,
        max_image_dim: 256,
        imagen_model: "imagen-test".to_string(),
        max_retries: 2,
        backoff_secs: 0.0,
        vertex_base_url: Some(vertex_base_url.to_string()),
    }
}

/// Build the full application router against a mock Vertex endpoint.
pub fn build_test_app(vertex_base_url: &str) -> Router {
    build_test_app_with_tokens(vertex_base_url, Arc::new(StaticToken::new("test-token")))
}

/// Same as [`build_test_app`] but with no access token available.
pub fn build_test_app_without_token(vertex_base_url: &str) -> Router {
    build_test_app_with_tokens(
        vertex_base_url,
        Arc::new(TokenChain::new(vec![], "Missing access token.")),
    )
}

fn build_test_app_with_tokens(vertex_base_url: &str, tokens: Arc<dyn TokenProvider>) -> Router {
    let config = test_config(vertex_base_url);
    let api = VertexApi::with_base_url(reqwest::Client::new(), vertex_base_url);
    let policy = RetryPolicy {
        max_delay: Duration::from_millis(10),
        ..config.retry_policy()
    };
    let tryon = TryOnService::new(api, tokens)
        .with_policy(policy)
        .with_max_image_dim(Some(config.max_image_dim));

    let state = AppState {
        config: Arc::new(config.clone()),
        tryon: Arc::new(tryon),
        shutdown: CancellationToken::new(),
    };
    build_app_router(state, &config)
}

pub fn predict_path(model: &str) -> String {
    format!("/v1/projects/{PROJECT}/locations/us-central1/publishers/google/models/{model}:predict")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn png_b64(width: u32, height: u32, color: [u8; 3]) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}
