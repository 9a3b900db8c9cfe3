//! Common error types used throughout hlsforge.
//!
//! Every failure of the upload pipeline is one of these variants. The HTTP
//! layer turns them into responses via [`Error::http_status`]; nothing in the
//! pipeline retries on its own.

use std::time::Duration;

/// Common error type for hlsforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A request field or path was malformed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The declared upload filename has an extension outside the allow-list.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The upload stream exceeded the configured byte ceiling.
    #[error("Payload too large: upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// Missing or wrong credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// The requested artifact does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Directory or file creation, copy, or removal failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The transcoding engine was killed because its deadline elapsed.
    #[error("Transcode timed out after {}s", after.as_secs())]
    TranscodeTimeout { after: Duration },

    /// The transcoding engine exited unsuccessfully or could not be run.
    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new UnsupportedMediaType error.
    pub fn unsupported_media_type<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedMediaType(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new TranscodeFailed error.
    pub fn transcode_failed<S: Into<String>>(msg: S) -> Self {
        Self::TranscodeFailed(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code this error should surface as.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::UnsupportedMediaType(_)
            | Self::PayloadTooLarge { .. } => 400,
            Self::Unauthorized => 401,
            Self::NotFound(_) => 404,
            Self::Storage(_)
            | Self::TranscodeTimeout { .. }
            | Self::TranscodeFailed(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Whether the client caused this error (4xx class).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
