//! `tryon` - command-line client for Vertex AI virtual try-on.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Ctrl-C aborts any pending retry wait.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, cancelling");
            on_signal.cancel();
        }
    });

    match cli.command {
        Commands::TryOn(args) => commands::tryon::run(args, &cancel).await,
        Commands::Background(args) => commands::background::run(args, &cancel).await,
        Commands::Samples(args) => commands::samples::run(args),
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("tryon=info"),
        1 => EnvFilter::new("tryon=debug"),
        _ => EnvFilter::new("tryon=trace,reqwest=debug"),
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
