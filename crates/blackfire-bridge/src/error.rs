//! Profiler error types

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// Profiler result type
pub type ProfilerResult<T> = Result<T, ProfilerError>;

/// Profiler errors
///
/// Every other way a request can miss profiling is silent; only a probe that
/// refuses to start is surfaced, since it points at a broken agent setup.
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Cannot enable Blackfire profiler for {url}")]
    ProbeActivation { url: String },
}

impl ProfilerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProfilerError::ProbeActivation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProfilerError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_error_message() {
        let err = ProfilerError::ProbeActivation {
            url: "http://localhost/health".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot enable Blackfire profiler for http://localhost/health"
        );
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_activation_error_into_response() {
        let err = ProfilerError::ProbeActivation { url: "/".to_string() };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
