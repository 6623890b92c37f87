use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Timed out after {timeout_secs}s waiting for element: {selector} ({reason})")]
    ElementTimeout {
        selector: String,
        timeout_secs: u64,
        reason: String,
    },

    #[error("Required field missing: {field} ({selector})")]
    FieldMissing { field: String, selector: String },

    #[error("Delivery to channel {channel_id} failed: {message}")]
    Delivery { channel_id: u64, message: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl AppError {
    /// Short stage label used in log fields and failure notices.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Http(_) => "http",
            AppError::Decode(_) => "decode",
            AppError::Ocr(_) => "ocr",
            AppError::ElementTimeout { .. } => "element_timeout",
            AppError::FieldMissing { .. } => "field_missing",
            AppError::Delivery { .. } => "delivery",
            AppError::Browser(_) => "browser",
            AppError::InvalidUrl { .. } => "invalid_url",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
