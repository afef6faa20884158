// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the detection service.

use std::fmt;

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Main error type for the detection service.
#[derive(Debug)]
pub enum InferenceError {
    /// Error loading the ONNX model (fatal at startup).
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// Error decoding, encoding or drawing images.
    ImageError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Request input was rejected before any processing.
    InvalidInput(String),
    /// IO error with context.
    IoError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
    /// Error parsing model metadata.
    MetadataError(String),
    /// A detection call failed; wraps the underlying cause.
    DetectionFailed(Box<InferenceError>),
}

impl InferenceError {
    /// Wrap an error as the generic detection failure surfaced to callers.
    ///
    /// Already wrapped errors are returned unchanged.
    #[must_use]
    pub fn detection_failed(cause: Self) -> Self {
        match cause {
            Self::DetectionFailed(_) => cause,
            other => Self::DetectionFailed(Box::new(other)),
        }
    }

    /// Whether the error was caused by the caller's input rather than the server.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::InvalidInput(_) => true,
            Self::DetectionFailed(cause) => cause.is_client_error(),
            _ => false,
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::MetadataError(msg) => write!(f, "Metadata error: {msg}"),
            Self::DetectionFailed(cause) => write!(f, "Detection failed: {cause}"),
        }
    }
}

impl std::error::Error for InferenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::DetectionFailed(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for InferenceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for InferenceError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}
