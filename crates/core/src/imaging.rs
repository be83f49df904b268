//! Base64 and raster helpers used to marshal images into request payloads.
//!
//! The remote service rejects oversized payloads, so person and garment
//! photos are normalized to a bounded JPEG before they are sent.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::error::CoreError;

/// Default longest-edge bound applied by [`normalize_image`].
pub const DEFAULT_MAX_IMAGE_DIM: u32 = 1280;

/// JPEG quality for normalized request images.
pub const NORMALIZED_JPEG_QUALITY: u8 = 90;

/// Decode standard base64, accepting an optional `data:<mime>;base64,` prefix.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, CoreError> {
    let trimmed = strip_data_url(input.trim());
    STANDARD
        .decode(trimmed)
        .map_err(|e| CoreError::Validation(format!("Invalid base64 image data: {e}")))
}

/// Encode bytes as standard (padded) base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn strip_data_url(input: &str) -> &str {
    if !input.starts_with("data:") {
        return input;
    }
    match input.split_once(',') {
        Some((_, payload)) => payload,
        None => input,
    }
}

/// Decode an encoded image (PNG, JPEG or WebP) from memory.
pub fn load_image(bytes: &[u8]) -> Result<DynamicImage, CoreError> {
    image::load_from_memory(bytes)
        .map_err(|e| CoreError::Validation(format!("Unreadable image: {e}")))
}

/// Shrink `img` to fit within a `max_dim` square, preserving aspect ratio.
///
/// Images already inside the bound are returned untouched; this never
/// upscales. A `max_dim` of zero disables the bound.
pub fn fit_within(img: DynamicImage, max_dim: u32) -> DynamicImage {
    if max_dim == 0 || (img.width() <= max_dim && img.height() <= max_dim) {
        return img;
    }
    img.resize(max_dim, max_dim, FilterType::Lanczos3)
}

/// Encode an RGB buffer as JPEG at the given quality (1-100).
pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, CoreError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Decode, flatten to RGB, bound to `max_dim` and re-encode as JPEG.
pub fn normalize_image(bytes: &[u8], max_dim: u32) -> Result<Vec<u8>, CoreError> {
    let img = load_image(bytes)?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let fitted = fit_within(rgb, max_dim);
    encode_jpeg(&fitted.to_rgb8(), NORMALIZED_JPEG_QUALITY)
}

/// [`normalize_image`] over base64 input and output.
pub fn normalize_base64(input: &str, max_dim: u32) -> Result<String, CoreError> {
    let bytes = decode_base64(input)?;
    let normalized = normalize_image(&bytes, max_dim)?;
    Ok(encode_base64(&normalized))
}


#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::test_support::png_bytes;
    use super::*;

    #[test]
    fn decode_accepts_data_url_prefix() {
        let encoded = format!("data:image/png;base64,{}", encode_base64(b"hello"));
        assert_eq!(decode_base64(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn decode_trims_whitespace() {
        let encoded = format!("  {}\n", encode_base64(b"abc"));
        assert_eq!(decode_base64(&encoded).unwrap(), b"abc");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_matches!(decode_base64("not*base64!"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn normalize_shrinks_preserving_aspect_ratio() {
        let png = png_bytes(400, 200, [10, 200, 30]);
        let out = normalize_image(&png, 100).unwrap();
        let img = load_image(&out).unwrap();
        assert_eq!((img.width(), img.height()), (100, 50));
        assert_eq!(image::guess_format(&out).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn normalize_never_upscales() {
        let png = png_bytes(64, 48, [0, 0, 0]);
        let out = normalize_image(&png, 1280).unwrap();
        let img = load_image(&out).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn zero_max_dim_disables_bound() {
        let img = DynamicImage::new_rgb8(3000, 10);
        assert_eq!(fit_within(img, 0).width(), 3000);
    }

    #[test]
    fn normalize_rejects_non_image_bytes() {
        assert_matches!(
            normalize_image(b"definitely not an image", 100),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn normalize_base64_round_trips_through_jpeg() {
        let b64 = encode_base64(&png_bytes(20, 20, [255, 0, 0]));
        let out = normalize_base64(&b64, DEFAULT_MAX_IMAGE_DIM).unwrap();
        let bytes = decode_base64(&out).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
    }
}
