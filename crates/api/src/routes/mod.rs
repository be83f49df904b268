pub mod health;
pub mod tryon;

use axum::Router;

use crate::state::AppState;

/// Build the generation route tree.
///
/// Route hierarchy:
///
/// ```text
/// /try-on        POST  person + garments -> try-on image
/// /background    POST  prompt -> generated background image
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(tryon::router())
}
