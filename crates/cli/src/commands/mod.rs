//! CLI command implementations

pub mod background;
pub mod samples;
pub mod tryon;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tryon_core::imaging::{decode_base64, encode_base64};
use tryon_core::retry::RetryPolicy;
use tryon_vertex::api::{VertexApi, REQUEST_TIMEOUT};
use tryon_vertex::auth::TokenChain;
use tryon_vertex::tryon::TryOnService;

use crate::cli::VertexArgs;

/// Build the service shared by the generating commands.
pub(crate) fn build_service(args: &VertexArgs) -> Result<TryOnService> {
    let api = match &args.vertex_base_url {
        Some(base) => {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .context("Failed to build HTTP client")?;
            VertexApi::with_base_url(client, base.clone())
        }
        None => VertexApi::new().context("Failed to build HTTP client")?,
    };

    let tokens = TokenChain::for_cli(args.access_token.clone());
    Ok(TryOnService::new(api, Arc::new(tokens))
        .with_policy(RetryPolicy::new(args.max_retries, args.backoff_seconds)))
}

/// `out/<prefix>_<unix seconds>.<extension>`
pub(crate) fn default_output_path(prefix: &str, unix_secs: i64, extension: &str) -> PathBuf {
    PathBuf::from("out").join(format!("{prefix}_{unix_secs}.{extension}"))
}

/// Read an input image as base64, failing with `"<label> not found: <path>"`
/// when the file is missing.
pub(crate) async fn read_image_b64(path: &Path, label: &str) -> Result<String> {
    if !path.is_file() {
        anyhow::bail!("{label} not found: {}", path.display());
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(encode_base64(&bytes))
}

/// Decode base64 image data and write it, creating parent directories.
pub(crate) async fn write_image_b64(path: &Path, image_b64: &str) -> Result<()> {
    let bytes = decode_base64(image_b64).context("Model returned invalid image data")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_uses_out_dir() {
        assert_eq!(
            default_output_path("try_on", 1_700_000_000, "png"),
            PathBuf::from("out/try_on_1700000000.png")
        );
        assert_eq!(
            default_output_path("try_on", 1_700_000_000, "jpg"),
            PathBuf::from("out/try_on_1700000000.jpg")
        );
    }

    #[tokio::test]
    async fn missing_input_names_the_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");

        let err = read_image_b64(&path, "Person image").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            format!("Person image not found: {}", path.display())
        );
    }

    #[tokio::test]
    async fn write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/result.png");

        write_image_b64(&path, "aGVsbG8=").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn read_encodes_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garment.png");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(read_image_b64(&path, "Garment image").await.unwrap(), "aGVsbG8=");
    }
}
