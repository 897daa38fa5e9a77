use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Empty image data")]
    EmptyInput,

    #[error("Invalid {name} parameter: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Unsupported output format: {0:?} (expected jpeg, png or webp)")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("Image is too large even after compression: {smallest} bytes (max {limit})")]
    TooLargeAfterCompression { smallest: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Errors caused by the request itself rather than by the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TransformError::EmptyInput
                | TransformError::InvalidParameter { .. }
                | TransformError::UnsupportedFormat(_)
                | TransformError::Decode(_)
                | TransformError::TooLargeAfterCompression { .. }
        )
    }
}
