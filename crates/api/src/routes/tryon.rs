use axum::routing::post;
use axum::Router;

use crate::handlers::tryon;
use crate::state::AppState;

/// Mount try-on and background generation routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/try-on", post(tryon::try_on))
        .route("/background", post(tryon::generate_background))
}
