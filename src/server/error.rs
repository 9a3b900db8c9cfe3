//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`. Client errors carry their
//! message in a plain-text body; server errors are logged in full and answer
//! with a short generic message so engine output and filesystem paths do not
//! leak to clients.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hlsforge_common::Error;

/// Realm advertised on 401 responses.
pub const BASIC_REALM: &str = r#"Basic realm="Restricted""#;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: Error,
}

impl AppError {
    pub fn new(inner: Error) -> Self {
        Self { inner }
    }

    fn public_message(&self) -> String {
        match &self.inner {
            Error::Storage(_) => "storage error".to_string(),
            Error::TranscodeTimeout { .. } => "transcode timed out".to_string(),
            Error::TranscodeFailed(_) => "transcode failed".to_string(),
            Error::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.inner, "Server error in handler");
        }

        let mut response = (status, self.public_message()).into_response();
        if matches!(self.inner, Error::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(BASIC_REALM),
            );
        }
        response
    }
}
