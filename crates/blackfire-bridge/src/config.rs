//! Profiler configuration

use serde::{Deserialize, Serialize};

/// Header carrying the probe activation query
pub const QUERY_HEADER: &str = "x-blackfire-query";

/// Probe attribute receiving the downstream status code
pub const STATUS_CODE_ATTRIBUTE: &str = "http.status_code";

/// Probe attribute tagged with the request URL when activation fails
pub const PROFILE_TITLE_ATTRIBUTE: &str = "profileTitle";

/// Configuration for the request profiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Header holding the activation query (matched case-insensitively)
    pub query_header: String,

    /// Whether to push the response status code into the probe
    pub record_status_code: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            query_header: QUERY_HEADER.to_string(),
            record_status_code: true,
        }
    }
}

impl ProfilerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the activation header name
    pub fn query_header(mut self, name: impl Into<String>) -> Self {
        self.query_header = name.into();
        self
    }

    /// Enable/disable the status code attribute
    pub fn record_status_code(mut self, enabled: bool) -> Self {
        self.record_status_code = enabled;
        self
    }
}
