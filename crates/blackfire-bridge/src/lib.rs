//! blackfire-bridge: Blackfire probe middleware
//!
//! Attaches an external profiling agent to an HTTP service:
//! - a request carrying `X-Blackfire-Query` enables a probe for its lifetime
//! - the response status is recorded on the probe
//! - the probe's own response header is relayed back to the client
//!
//! The agent is consumed through [`ProbeCapability`]; wiring is provided for
//! axum ([`profile_request`]) and tower ([`ProfilerLayer`]).

pub mod config;
pub mod error;
pub mod middleware;
pub mod probe;
pub mod profiler;
pub mod request;
pub mod response;

// Re-exports
pub use config::{ProfilerConfig, PROFILE_TITLE_ATTRIBUTE, QUERY_HEADER, STATUS_CODE_ATTRIBUTE};
pub use error::{ProfilerError, ProfilerResult};
pub use middleware::{profile_request, ProfilerLayer, ProfilerService};
pub use probe::{ProbeCapability, ProbeHandle, UnavailableProbe};
pub use profiler::{ActiveProfile, Activation, Ineligible, Profiler, RequestId};
pub use request::ProfiledRequest;
pub use response::{ProbeResponseHeader, ResponseShape};
