#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A field the remote service is expected to return was absent.
    #[error("{0}")]
    MissingField(&'static str),

    /// The remote service returned data that could not be used.
    #[error("{0}")]
    InvalidResponse(String),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}
