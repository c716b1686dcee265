//! Recording probe used by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use blackfire_bridge::{ProbeCapability, ProbeHandle, Profiler, ProfilerConfig};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeCall {
    Create(String),
    Enable,
    Close,
    Attribute(String, Value),
}

#[derive(Debug)]
struct ProbeState {
    calls: Vec<ProbeCall>,
    available: bool,
    enable_result: bool,
    response_line: String,
}

/// Probe capability recording every call it receives.
#[derive(Debug, Clone)]
pub struct RecordingProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl RecordingProbe {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProbeState {
                calls: Vec::new(),
                available: true,
                enable_result: true,
                response_line: "X-Blackfire-Response: continue=true&progress=100".to_string(),
            })),
        }
    }

    pub fn unavailable() -> Self {
        let probe = Self::new();
        probe.state.lock().available = false;
        probe
    }

    pub fn failing_enable() -> Self {
        let probe = Self::new();
        probe.state.lock().enable_result = false;
        probe
    }

    pub fn calls(&self) -> Vec<ProbeCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, call: &ProbeCall) -> usize {
        self.state.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn profiler(&self) -> Arc<Profiler> {
        Arc::new(Profiler::new(Arc::new(self.clone()), ProfilerConfig::default()))
    }
}

impl ProbeCapability for RecordingProbe {
    fn is_available(&self) -> bool {
        self.state.lock().available
    }

    fn create(&self, query: &str) -> Box<dyn ProbeHandle> {
        self.state.lock().calls.push(ProbeCall::Create(query.to_string()));
        Box::new(RecordingHandle {
            state: Arc::clone(&self.state),
            enabled: false,
        })
    }
}

struct RecordingHandle {
    state: Arc<Mutex<ProbeState>>,
    enabled: bool,
}

impl ProbeHandle for RecordingHandle {
    fn enable(&mut self) -> bool {
        let mut state = self.state.lock();
        state.calls.push(ProbeCall::Enable);
        self.enabled = state.enable_result;
        self.enabled
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn close(&mut self) {
        self.state.lock().calls.push(ProbeCall::Close);
        self.enabled = false;
    }

    fn response_line(&self) -> String {
        self.state.lock().response_line.clone()
    }

    fn set_attribute(&mut self, name: &str, value: Value) {
        self.state
            .lock()
            .calls
            .push(ProbeCall::Attribute(name.to_string(), value));
    }
}
