//! Probe capability seam
//!
//! The profiling agent itself lives outside this crate. Hosts plug it in by
//! implementing [`ProbeCapability`] and [`ProbeHandle`].

use serde_json::Value;

/// Entry point into a profiling agent.
pub trait ProbeCapability: Send + Sync {
    /// Whether the agent is loaded in this process
    fn is_available(&self) -> bool;

    /// Build a probe seeded with the activation query
    fn create(&self, query: &str) -> Box<dyn ProbeHandle>;
}

/// One probe instance, owned by a single profiling session.
///
/// `is_enabled` and `set_attribute` run while the profiler holds its session
/// lock; they must not call back into the [`Profiler`](crate::Profiler).
pub trait ProbeHandle: Send {
    /// Start profiling. Returns false when the agent refuses.
    fn enable(&mut self) -> bool;

    fn is_enabled(&self) -> bool;

    /// Stop profiling and hand the report to the agent
    fn close(&mut self);

    /// Header line the agent wants relayed to the client, as `Name: value`
    fn response_line(&self) -> String;

    fn set_attribute(&mut self, name: &str, value: Value);
}

/// Capability used when no agent is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProbe;

impl ProbeCapability for UnavailableProbe {
    fn is_available(&self) -> bool {
        false
    }

    fn create(&self, _query: &str) -> Box<dyn ProbeHandle> {
        Box::new(DetachedProbe)
    }
}

/// Handle that never enables; returned by [`UnavailableProbe`].
#[derive(Debug, Clone, Copy, Default)]
struct DetachedProbe;

impl ProbeHandle for DetachedProbe {
    fn enable(&mut self) -> bool {
        false
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn close(&mut self) {}

    fn response_line(&self) -> String {
        String::new()
    }

    fn set_attribute(&mut self, _name: &str, _value: Value) {}
}
