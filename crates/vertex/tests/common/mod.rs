#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use tryon_core::retry::RetryPolicy;
use tryon_vertex::api::{ModelTarget, VertexApi};
use tryon_vertex::auth::StaticToken;
use tryon_vertex::tryon::TryOnService;
use wiremock::MockServer;

pub const PROJECT: &str = "test-project";
pub const LOCATION: &str = "us-central1";
pub const TRY_ON_MODEL: &str = "virtual-try-on-001";
pub const IMAGEN_MODEL: &str = "imagen-test";
pub const TOKEN: &str = "test-token";

/// Path the mock server sees for a `:predict` call on `model`.
pub fn predict_path(model: &str) -> String {
    format!("/v1/projects/{PROJECT}/locations/{LOCATION}/publishers/google/models/{model}:predict")
}

pub fn target(model: &str) -> ModelTarget {
    ModelTarget::new(PROJECT, LOCATION, model)
}

pub fn api_for(server: &MockServer) -> VertexApi {
    VertexApi::with_base_url(reqwest::Client::new(), server.uri())
}

/// Retry policy with no waiting so tests stay fast.
pub fn instant_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::ZERO,
        multiplier: 2.0,
        max_delay: Duration::from_millis(50),
    }
}

pub fn service_for(server: &MockServer, max_retries: u32) -> TryOnService {
    TryOnService::new(api_for(server), Arc::new(StaticToken::new(TOKEN)))
        .with_policy(instant_policy(max_retries))
}

pub fn png_b64(width: u32, height: u32, color: [u8; 3]) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

pub fn prediction_body(image_b64: &str) -> serde_json::Value {
    json!({
        "predictions": [{"bytesBase64Encoded": image_b64, "mimeType": "image/png"}]
    })
}
