use thiserror::Error;

/// Every failure a workflow can surface to the user.
///
/// The `Display` text is the single message shown to the user; no
/// structured codes leave the library.
#[derive(Error, Debug)]
pub enum ToolboxError {
    #[error("{0}")]
    MissingInput(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Service misconfigured: {0}")]
    ServiceMisconfigured(String),

    #[error("Upstream request failed: {0}")]
    UpstreamRequestFailed(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("{0}")]
    ConversionTimedOut(String),

    #[error("PDF processing failed: {0}")]
    LocalProcessingFailed(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),
}

impl ToolboxError {
    /// Errors raised before any library or network call was attempted.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ToolboxError::MissingInput(_)
                | ToolboxError::UnsupportedFormat(_)
                | ToolboxError::InvalidRange(_)
        )
    }
}

impl From<lopdf::Error> for ToolboxError {
    fn from(err: lopdf::Error) -> Self {
        ToolboxError::LocalProcessingFailed(err.to_string())
    }
}

impl From<std::io::Error> for ToolboxError {
    fn from(err: std::io::Error) -> Self {
        ToolboxError::LocalProcessingFailed(err.to_string())
    }
}

impl From<reqwest::Error> for ToolboxError {
    fn from(err: reqwest::Error) -> Self {
        ToolboxError::UpstreamRequestFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ToolboxError>;
