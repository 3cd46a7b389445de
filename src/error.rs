use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Navigation failed for {url}: {message}")]
    NavigationFailed { url: String, message: String },

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Image decode failed: {0}")]
    ImageDecodeFailed(String),

    #[error("Image encode failed: {0}")]
    ImageEncodeFailed(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CaptureError {
    /// Setup errors abort before any page job runs; everything else aborts
    /// the remaining queue mid-run.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            CaptureError::BrowserLaunchFailed(_)
                | CaptureError::ServerError(_)
                | CaptureError::ConfigurationError(_)
        )
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::IoError(err.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::ImageDecodeFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(err: serde_json::Error) -> Self {
        CaptureError::SerializationError(err.to_string())
    }
}
