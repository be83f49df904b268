//! Handlers for try-on generation and background scene generation.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tryon_core::error::CoreError;
use tryon_core::payload::{DEFAULT_LOCATION, TRY_ON_MODEL_ID};
use tryon_vertex::api::ModelTarget;
use tryon_vertex::tryon::{BackgroundJob, TryOnJob};

use crate::error::AppResult;
use crate::state::AppState;

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

fn default_sample_count() -> u32 {
    1
}

/// Request body for `POST /try-on`. Images are base64, with or without a
/// `data:` URL prefix.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnRequest {
    /// GCP project ID.
    pub project: String,
    #[serde(default = "default_location")]
    pub location: String,
    /// Try-on model ID; defaults to `virtual-try-on-001`.
    pub model: Option<String>,
    pub person_image_base64: String,
    pub garment_image_base64: String,
    /// A second garment, e.g. a bottom to go with the top.
    #[serde(default)]
    pub extra_garment_images_base64: Vec<String>,
    pub background_prompt: Option<String>,
    /// When present the try-on output is composited onto this image.
    pub background_image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResponse {
    pub image_base64: String,
}

/// Request body for `POST /background`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRequest {
    pub project: String,
    #[serde(default = "default_location")]
    pub location: String,
    /// Imagen model ID; defaults to the server's `IMAGEN_MODEL_ID`.
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundResponse {
    pub image_base64: String,
    pub prompt: Option<String>,
}

/// POST /try-on
///
/// Normalizes the inputs, calls the try-on model, and composites the
/// result onto `backgroundImageBase64` when one is supplied.
pub async fn try_on(
    State(state): State<AppState>,
    Json(input): Json<TryOnRequest>,
) -> AppResult<Json<TryOnResponse>> {
    let target = model_target(
        input.project,
        input.location,
        input.model,
        TRY_ON_MODEL_ID,
    )?;

    let mut garments_b64 = vec![input.garment_image_base64];
    garments_b64.extend(input.extra_garment_images_base64);

    let job = TryOnJob {
        target,
        person_b64: input.person_image_base64,
        garments_b64,
        background_prompt: input.background_prompt,
        background_b64: input.background_image_base64.filter(|b| !b.trim().is_empty()),
    };

    let image_base64 = state.tryon.try_on(job, &state.shutdown).await?;
    Ok(Json(TryOnResponse { image_base64 }))
}

/// POST /background
///
/// Generates a scene from a text prompt with Imagen.
pub async fn generate_background(
    State(state): State<AppState>,
    Json(input): Json<BackgroundRequest>,
) -> AppResult<Json<BackgroundResponse>> {
    let target = model_target(
        input.project,
        input.location,
        input.model,
        &state.config.imagen_model,
    )?;

    let generated = state
        .tryon
        .generate_background(
            BackgroundJob {
                target,
                prompt: input.prompt,
                sample_count: input.sample_count,
            },
            &state.shutdown,
        )
        .await?;

    Ok(Json(BackgroundResponse {
        image_base64: generated.image_b64,
        prompt: generated.prompt,
    }))
}

/// Validate identifiers and fill in the default model.
fn model_target(
    project: String,
    location: String,
    model: Option<String>,
    default_model: &str,
) -> AppResult<ModelTarget> {
    let project = project.trim();
    if project.is_empty() {
        return Err(CoreError::Validation("project is required".into()).into());
    }
    let location = location.trim();
    if location.is_empty() {
        return Err(CoreError::Validation("location must not be empty".into()).into());
    }
    let model = model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default_model.to_string());
    Ok(ModelTarget::new(project, location, model))
}
