use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tryon_vertex::tryon::TryOnService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Try-on and background generation against Vertex AI.
    pub tryon: Arc<TryOnService>,
    /// Cancelled on shutdown so pending retry waits end promptly.
    pub shutdown: CancellationToken,
}
