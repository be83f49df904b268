use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tryon_api::config::ServerConfig;
use tryon_api::router::build_app_router;
use tryon_api::state::AppState;
use tryon_vertex::api::VertexApi;
use tryon_vertex::auth::TokenChain;
use tryon_vertex::tryon::TryOnService;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tryon_api=debug,tryon_vertex=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = config.port,
        max_retries = config.max_retries,
        max_image_dim = config.max_image_dim,
        "Loaded server configuration",
    );

    // --- Vertex client ---
    let api = match &config.vertex_base_url {
        Some(base) => {
            tracing::info!(base_url = %base, "Using Vertex AI base URL override");
            let client = reqwest::Client::builder()
                .timeout(tryon_vertex::api::REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client");
            VertexApi::with_base_url(client, base.clone())
        }
        None => VertexApi::new().expect("Failed to build HTTP client"),
    };

    let tryon = TryOnService::new(api, Arc::new(TokenChain::for_server()))
        .with_policy(config.retry_policy())
        .with_max_image_dim(Some(config.max_image_dim));

    // --- App state ---
    let shutdown = CancellationToken::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        tryon: Arc::new(tryon),
        shutdown: shutdown.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal, then cancel in-flight retry waits.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }

    shutdown.cancel();
}
