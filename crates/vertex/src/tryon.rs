//! Try-on and background-generation flows.
//!
//! [`TryOnService`] ties together token resolution, image normalization,
//! payload construction, the retrying predict call, and optional
//! background compositing. Both the CLI and the HTTP server drive it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tryon_core::composite::{composite_images, CompositeParams};
use tryon_core::error::CoreError;
use tryon_core::imaging::{decode_base64, encode_base64, load_image, normalize_base64};
use tryon_core::matte::{BorderKeyMatte, Matte};
use tryon_core::payload::{build_background_request, build_try_on_request};
use tryon_core::retry::RetryPolicy;

use crate::api::{ModelTarget, VertexApi, VertexError};
use crate::auth::{AuthError, TokenProvider};

/// Inputs for one try-on generation. Images are base64-encoded.
#[derive(Debug, Clone)]
pub struct TryOnJob {
    pub target: ModelTarget,
    pub person_b64: String,
    /// One or two garments, e.g. a top and a bottom.
    pub garments_b64: Vec<String>,
    pub background_prompt: Option<String>,
    /// When set, the try-on output is composited onto this image.
    pub background_b64: Option<String>,
}

/// Inputs for one Imagen background generation.
#[derive(Debug, Clone)]
pub struct BackgroundJob {
    pub target: ModelTarget,
    pub prompt: String,
    pub sample_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBackground {
    pub image_b64: String,
    /// Prompt as echoed back by the model, if any.
    pub prompt: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Vertex(#[from] VertexError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Orchestrates calls to the try-on and Imagen models.
#[derive(Clone)]
pub struct TryOnService {
    api: VertexApi,
    tokens: Arc<dyn TokenProvider>,
    policy: RetryPolicy,
    max_image_dim: Option<u32>,
    matte: Arc<dyn Matte>,
    composite: CompositeParams,
}

impl TryOnService {
    /// Service with the default retry policy, no input normalization, and
    /// the border-key matte for compositing.
    pub fn new(api: VertexApi, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            api,
            tokens,
            policy: RetryPolicy::default(),
            max_image_dim: None,
            matte: Arc::new(BorderKeyMatte::default()),
            composite: CompositeParams::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound input images to `max_dim` and re-encode them as JPEG before
    /// sending. `None` sends the images as given.
    pub fn with_max_image_dim(mut self, max_dim: Option<u32>) -> Self {
        self.max_image_dim = max_dim;
        self
    }

    pub fn with_matte(mut self, matte: Arc<dyn Matte>) -> Self {
        self.matte = matte;
        self
    }

    pub fn with_composite_params(mut self, params: CompositeParams) -> Self {
        self.composite = params;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate a try-on image and return it base64-encoded.
    pub async fn try_on(
        &self,
        job: TryOnJob,
        cancel: &CancellationToken,
    ) -> Result<String, TryOnError> {
        let token = self.tokens.access_token().await?;

        let (person_b64, garments_b64) = match self.max_image_dim {
            Some(max_dim) => {
                let person = job.person_b64;
                let garments = job.garments_b64;
                run_blocking(move || {
                    let person = normalize_base64(&person, max_dim)?;
                    let garments = garments
                        .iter()
                        .map(|g| normalize_base64(g, max_dim))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok((person, garments))
                })
                .await?
            }
            None => (job.person_b64, job.garments_b64),
        };

        // Reject an unreadable background before spending a prediction call.
        let scene = match job.background_b64 {
            Some(background_b64) => Some(
                run_blocking(move || load_image(&decode_base64(&background_b64)?)).await?,
            ),
            None => None,
        };

        let request = build_try_on_request(person_b64, garments_b64, job.background_prompt)?;
        let garment_count = request.instances[0].product_images.len();

        tracing::info!(
            project = %job.target.project,
            location = %job.target.location,
            model = %job.target.model,
            garment_count,
            "Requesting virtual try-on",
        );

        let response = self
            .api
            .predict_with_retry(&job.target, &token, &request, &self.policy, cancel)
            .await?;
        let image_b64 = response.first_image()?.to_string();

        let Some(scene) = scene else {
            return Ok(image_b64);
        };

        tracing::info!("Compositing try-on output onto background");
        let matte = Arc::clone(&self.matte);
        let params = self.composite.clone();
        let composited = run_blocking(move || {
            let render = decode_base64(&image_b64)
                .and_then(|bytes| load_image(&bytes))
                .map_err(|e| match e {
                    CoreError::Validation(detail) => CoreError::InvalidResponse(format!(
                        "Invalid image data in API response: {detail}"
                    )),
                    other => other,
                })?;
            let jpeg = composite_images(&render, &scene, matte.as_ref(), &params)?;
            Ok(encode_base64(&jpeg))
        })
        .await?;
        Ok(composited)
    }

    /// Generate a background scene from a text prompt.
    pub async fn generate_background(
        &self,
        job: BackgroundJob,
        cancel: &CancellationToken,
    ) -> Result<GeneratedBackground, TryOnError> {
        let token = self.tokens.access_token().await?;
        let request = build_background_request(job.prompt, job.sample_count)?;

        tracing::info!(
            project = %job.target.project,
            model = %job.target.model,
            sample_count = job.sample_count,
            "Requesting background generation",
        );

        let response = self
            .api
            .predict_with_retry(&job.target, &token, &request, &self.policy, cancel)
            .await?;
        let prediction = response.first()?;
        let image_b64 = response.first_image()?.to_string();

        Ok(GeneratedBackground {
            image_b64,
            prompt: prediction.prompt.clone(),
        })
    }
}

/// Run CPU-bound image work off the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T, CoreError>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Internal(format!("image task failed: {e}")))?
}
