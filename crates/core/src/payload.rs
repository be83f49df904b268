//! Request and response bodies for the publisher-model `:predict` endpoint.
//!
//! Both the try-on model and the Imagen background model share the
//! `{"instances": [...], "parameters": {...}}` envelope and answer with a
//! list of base64 predictions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default virtual try-on model id.
pub const TRY_ON_MODEL_ID: &str = "virtual-try-on-001";

/// Default Imagen model used for background generation.
pub const IMAGEN_MODEL_ID: &str = "imagen-4.0-ultra-generate-001";

/// Default Vertex AI region.
pub const DEFAULT_LOCATION: &str = "us-central1";

/// The service accepts up to two product images (e.g. a top and a bottom).
pub const MAX_PRODUCT_IMAGES: usize = 2;

/// Upper bound on Imagen `sampleCount`.
pub const MAX_SAMPLE_COUNT: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictRequest<I, P> {
    pub instances: Vec<I>,
    pub parameters: P,
}

/// Inline base64 image, serialized as `{"bytesBase64Encoded": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub bytes_base64_encoded: String,
}

/// Wrapper object the try-on model expects around each image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSlot {
    pub image: InlineImage,
}

impl ImageSlot {
    pub fn new(b64: impl Into<String>) -> Self {
        Self {
            image: InlineImage {
                bytes_base64_encoded: b64.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TryOnInstance {
    pub person_image: ImageSlot,
    pub product_images: Vec<ImageSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TryOnParameters {
    pub sample_count: u32,
    /// Forwarded for completeness; the try-on model currently ignores it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_prompt: Option<String>,
}

pub type TryOnRequest = PredictRequest<TryOnInstance, TryOnParameters>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagenInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImagenParameters {
    pub sample_count: u32,
}

pub type ImagenRequest = PredictRequest<ImagenInstance, ImagenParameters>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
    /// Imagen echoes the (possibly rewritten) prompt here.
    pub prompt: Option<String>,
}

impl PredictResponse {
    /// The first prediction, or an error when the service returned none.
    pub fn first(&self) -> Result<&Prediction, CoreError> {
        self.predictions
            .first()
            .ok_or(CoreError::MissingField("No predictions returned from API."))
    }

    /// Base64 image data of the first prediction.
    pub fn first_image(&self) -> Result<&str, CoreError> {
        self.first()?
            .bytes_base64_encoded
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::MissingField("Missing image data in API response."))
    }
}

/// Build a single-sample try-on request for one person and 1-2 garments.
pub fn build_try_on_request(
    person_b64: String,
    garments_b64: Vec<String>,
    background_prompt: Option<String>,
) -> Result<TryOnRequest, CoreError> {
    if person_b64.trim().is_empty() {
        return Err(CoreError::Validation("Person image is required".into()));
    }
    if garments_b64.is_empty() {
        return Err(CoreError::Validation(
            "At least one garment image is required".into(),
        ));
    }
    if garments_b64.len() > MAX_PRODUCT_IMAGES {
        return Err(CoreError::Validation(format!(
            "At most {MAX_PRODUCT_IMAGES} garment images are supported, got {}",
            garments_b64.len()
        )));
    }
    if garments_b64.iter().any(|g| g.trim().is_empty()) {
        return Err(CoreError::Validation("Garment image data is empty".into()));
    }

    Ok(PredictRequest {
        instances: vec![TryOnInstance {
            person_image: ImageSlot::new(person_b64),
            product_images: garments_b64.into_iter().map(ImageSlot::new).collect(),
        }],
        parameters: TryOnParameters {
            sample_count: 1,
            background_prompt: background_prompt.filter(|p| !p.trim().is_empty()),
        },
    })
}

/// Build an Imagen text-to-image request.
pub fn build_background_request(
    prompt: String,
    sample_count: u32,
) -> Result<ImagenRequest, CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Background prompt is required".into()));
    }
    if !(1..=MAX_SAMPLE_COUNT).contains(&sample_count) {
        return Err(CoreError::Validation(format!(
            "sampleCount must be between 1 and {MAX_SAMPLE_COUNT}, got {sample_count}"
        )));
    }
    Ok(PredictRequest {
        instances: vec![ImagenInstance { prompt }],
        parameters: ImagenParameters { sample_count },
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn try_on_request_matches_wire_shape() {
        let req = build_try_on_request("P".into(), vec!["G1".into(), "G2".into()], None).unwrap();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "instances": [{
                    "personImage": {"image": {"bytesBase64Encoded": "P"}},
                    "productImages": [
                        {"image": {"bytesBase64Encoded": "G1"}},
                        {"image": {"bytesBase64Encoded": "G2"}}
                    ]
                }],
                "parameters": {"sampleCount": 1}
            })
        );
    }

    #[test]
    fn background_prompt_is_forwarded_when_present() {
        let req =
            build_try_on_request("P".into(), vec!["G".into()], Some("a beach".into())).unwrap();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["parameters"]["backgroundPrompt"], "a beach");

        let blank = build_try_on_request("P".into(), vec!["G".into()], Some("  ".into())).unwrap();
        assert!(blank.parameters.background_prompt.is_none());
    }

    #[test]
    fn garment_count_is_bounded() {
        assert_matches!(
            build_try_on_request("P".into(), vec![], None),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            build_try_on_request("P".into(), vec!["a".into(), "b".into(), "c".into()], None),
            Err(CoreError::Validation(msg)) if msg.contains("At most 2")
        );
    }

    #[test]
    fn empty_person_is_rejected() {
        assert_matches!(
            build_try_on_request(" ".into(), vec!["G".into()], None),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn imagen_request_matches_wire_shape() {
        let req = build_background_request("studio loft".into(), 2).unwrap();
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"instances": [{"prompt": "studio loft"}], "parameters": {"sampleCount": 2}})
        );
    }

    #[test]
    fn imagen_request_validates_inputs() {
        assert_matches!(build_background_request("".into(), 1), Err(CoreError::Validation(_)));
        assert_matches!(build_background_request("x".into(), 0), Err(CoreError::Validation(_)));
        assert_matches!(build_background_request("x".into(), 5), Err(CoreError::Validation(_)));
    }

    #[test]
    fn first_image_extracts_prediction() {
        let resp: PredictResponse = serde_json::from_value(json!({
            "predictions": [{"bytesBase64Encoded": "abc", "mimeType": "image/png"}]
        }))
        .unwrap();
        assert_eq!(resp.first_image().unwrap(), "abc");
    }

    #[test]
    fn missing_predictions_and_image_data() {
        let empty: PredictResponse = serde_json::from_value(json!({})).unwrap();
        assert_matches!(
            empty.first_image(),
            Err(CoreError::MissingField("No predictions returned from API."))
        );

        let no_bytes: PredictResponse =
            serde_json::from_value(json!({"predictions": [{"mimeType": "image/png"}]})).unwrap();
        assert_matches!(
            no_bytes.first_image(),
            Err(CoreError::MissingField("Missing image data in API response."))
        );
    }
}
