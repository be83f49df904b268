use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tryon_core::error::CoreError;
use tryon_vertex::api::VertexError;
use tryon_vertex::auth::AuthError;
use tryon_vertex::tryon::TryOnError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent `{"error", "code"}`
/// JSON bodies. Upstream Vertex failures keep their status code and body so
/// callers see exactly what the service reported.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `tryon_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure talking to Vertex AI.
    #[error(transparent)]
    Vertex(#[from] VertexError),

    /// No usable access token.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<TryOnError> for AppError {
    fn from(err: TryOnError) -> Self {
        match err {
            TryOnError::Core(e) => AppError::Core(e),
            TryOnError::Vertex(e) => AppError::Vertex(e),
            TryOnError::Auth(e) => AppError::Auth(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::MissingField(msg) => {
                    tracing::warn!(error = %msg, "Incomplete prediction response");
                    (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.to_string())
                }
                CoreError::InvalidResponse(msg) => {
                    tracing::warn!(error = %msg, "Unusable prediction response");
                    (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.clone())
                }
                CoreError::Image(err) => {
                    tracing::error!(error = %err, "Image processing error");
                    internal()
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Vertex errors ---
            AppError::Vertex(err) => classify_vertex_error(err),

            // --- Auth errors ---
            AppError::Auth(err) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", err.to_string()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a Vertex error into an HTTP status, error code, and message.
///
/// - API errors reuse the upstream status and pass the body through.
/// - Timeouts map to 504, other transport failures to 502.
/// - Cancellation (server shutdown) maps to 503.
fn classify_vertex_error(err: &VertexError) -> (StatusCode, &'static str, String) {
    match err {
        VertexError::Api { status, body, .. } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            "UPSTREAM_ERROR",
            body.clone(),
        ),
        VertexError::Request(e) if e.is_timeout() => {
            tracing::warn!(error = %e, "Vertex AI request timed out");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "UPSTREAM_TIMEOUT",
                "Vertex AI request timed out".to_string(),
            )
        }
        VertexError::Request(e) => {
            tracing::warn!(error = %e, "Vertex AI request failed");
            (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
                format!("Vertex AI request failed: {e}"),
            )
        }
        VertexError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Server is shutting down".to_string(),
        ),
    }
}
