//! `tryon try-on`

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tryon_core::payload::MAX_PRODUCT_IMAGES;
use tryon_vertex::api::ModelTarget;
use tryon_vertex::tryon::{BackgroundJob, TryOnJob};

use super::{build_service, default_output_path, read_image_b64, write_image_b64};
use crate::cli::TryOnArgs;

pub async fn run(args: TryOnArgs, cancel: &CancellationToken) -> Result<()> {
    anyhow::ensure!(
        args.garments.len() <= MAX_PRODUCT_IMAGES,
        "At most {MAX_PRODUCT_IMAGES} garment images are supported, got {}",
        args.garments.len()
    );

    let person_b64 = read_image_b64(&args.person, "Person image").await?;
    let mut garments_b64 = Vec::with_capacity(args.garments.len());
    for garment in &args.garments {
        garments_b64.push(read_image_b64(garment, "Garment image").await?);
    }

    let extension = output_extension(&args);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path("try_on", chrono::Utc::now().timestamp(), extension));

    let service = build_service(&args.vertex)?.with_max_image_dim(args.max_dim);

    let background_b64 = match (&args.background_image, &args.background_prompt) {
        (Some(path), _) => Some(read_image_b64(path, "Background image").await?),
        (None, Some(prompt)) => {
            tracing::info!(prompt = %prompt, "Generating background");
            let generated = service
                .generate_background(
                    BackgroundJob {
                        target: ModelTarget::new(
                            &args.vertex.project,
                            &args.vertex.location,
                            &args.imagen_model,
                        ),
                        prompt: prompt.clone(),
                        sample_count: 1,
                    },
                    cancel,
                )
                .await
                .context("Background generation failed")?;
            Some(generated.image_b64)
        }
        (None, None) => None,
    };

    let job = TryOnJob {
        target: ModelTarget::new(&args.vertex.project, &args.vertex.location, &args.model),
        person_b64,
        garments_b64,
        background_prompt: None,
        background_b64,
    };

    let image_b64 = service.try_on(job, cancel).await.context("Try-on failed")?;
    write_image_b64(&output, &image_b64).await?;

    println!("Saved try-on image to {}", output.display());
    Ok(())
}

/// Composites are encoded as JPEG; plain try-on output stays PNG.
fn output_extension(args: &TryOnArgs) -> &'static str {
    if args.background_image.is_some() || args.background_prompt.is_some() {
        "jpg"
    } else {
        "png"
    }
}
