//! Harness error types

use thiserror::Error;

/// Harness result type
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors raised while coordinating profiled test runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// The build helper failed to perform an operation
    #[error("Build coordinator failed to {operation}: {message}")]
    Coordinator {
        operation: &'static str,
        message: String,
    },

    /// The helper issued a token that cannot travel in a header
    #[error("Invalid profiling token: {0}")]
    InvalidToken(String),

    /// The service under test failed
    #[error("Service error: {0}")]
    Service(String),
}

impl HarnessError {
    pub(crate) fn coordinator(operation: &'static str, err: anyhow::Error) -> Self {
        HarnessError::Coordinator {
            operation,
            message: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_error_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("POST /api/v1/builds");
        let err = HarnessError::coordinator("create scenario", err);

        assert_eq!(
            err.to_string(),
            "Build coordinator failed to create scenario: POST /api/v1/builds: connection refused"
        );
    }
}
