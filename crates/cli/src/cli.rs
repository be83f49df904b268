//! CLI argument parsing with clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tryon_core::payload::{DEFAULT_LOCATION, IMAGEN_MODEL_ID, TRY_ON_MODEL_ID};

/// Vertex AI virtual try-on from the command line
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dress a person image in one or two garments
    TryOn(TryOnArgs),

    /// Generate a background scene from a text prompt
    Background(BackgroundArgs),

    /// List sample images
    Samples(SamplesArgs),
}

/// Connection settings shared by every command that calls Vertex AI.
#[derive(Args, Debug, Clone)]
pub struct VertexArgs {
    /// GCP project ID
    #[arg(long, env = "VERTEX_PROJECT")]
    pub project: String,

    /// Vertex AI region
    #[arg(long, default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// OAuth access token (falls back to ACCESS_TOKEN)
    #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Retries for 429/5xx responses and transport failures
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Initial backoff between retries, doubled each attempt
    #[arg(long, default_value_t = 2.0)]
    pub backoff_seconds: f64,

    /// Replace the regional Vertex AI endpoint
    #[arg(long, env = "VERTEX_BASE_URL", hide = true)]
    pub vertex_base_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct TryOnArgs {
    #[command(flatten)]
    pub vertex: VertexArgs,

    /// Person image
    #[arg(long)]
    pub person: PathBuf,

    /// Garment image; pass twice for a top and a bottom
    #[arg(long = "garment", required = true)]
    pub garments: Vec<PathBuf>,

    /// Output path [default: out/try_on_<unix time>.png]
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Try-on model ID
    #[arg(long, default_value = TRY_ON_MODEL_ID)]
    pub model: String,

    /// Shrink inputs so the longest edge fits, re-encoding as JPEG
    #[arg(long)]
    pub max_dim: Option<u32>,

    /// Composite the result onto this background image
    #[arg(long, conflicts_with = "background_prompt")]
    pub background_image: Option<PathBuf>,

    /// Generate a background with Imagen and composite onto it
    #[arg(long)]
    pub background_prompt: Option<String>,

    /// Imagen model used with --background-prompt
    #[arg(long, default_value = IMAGEN_MODEL_ID)]
    pub imagen_model: String,
}

#[derive(Args, Debug)]
pub struct BackgroundArgs {
    #[command(flatten)]
    pub vertex: VertexArgs,

    /// Scene description
    #[arg(long)]
    pub prompt: String,

    /// Output path [default: out/background_<unix time>.png]
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Imagen model ID
    #[arg(long, default_value = IMAGEN_MODEL_ID)]
    pub model: String,
}

#[derive(Args, Debug)]
pub struct SamplesArgs {
    /// Directory to scan
    #[arg(long, default_value = "samples")]
    pub dir: PathBuf,
}
