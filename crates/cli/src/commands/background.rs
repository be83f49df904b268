//! `tryon background`

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tryon_vertex::api::ModelTarget;
use tryon_vertex::tryon::BackgroundJob;

use super::{build_service, default_output_path, write_image_b64};
use crate::cli::BackgroundArgs;

pub async fn run(args: BackgroundArgs, cancel: &CancellationToken) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| default_output_path("background", chrono::Utc::now().timestamp(), "png"));

    let service = build_service(&args.vertex)?;
    let generated = service
        .generate_background(
            BackgroundJob {
                target: ModelTarget::new(&args.vertex.project, &args.vertex.location, &args.model),
                prompt: args.prompt,
                sample_count: 1,
            },
            cancel,
        )
        .await
        .context("Background generation failed")?;

    if let Some(prompt) = &generated.prompt {
        tracing::debug!(prompt = %prompt, "Model prompt");
    }
    write_image_b64(&output, &generated.image_b64).await?;

    println!("Saved background image to {}", output.display());
    Ok(())
}
