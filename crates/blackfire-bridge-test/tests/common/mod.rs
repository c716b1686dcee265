//! Fakes shared by the harness integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use blackfire_bridge::{ProbeCapability, ProbeHandle};
use blackfire_bridge_test::{
    BuildContext, Coordinator, EnvSource, HarnessConfig, LocalBuildHelper, ParallelBuildHelper,
    ScenarioSource, StepRequest,
};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Default)]
struct HelperState {
    calls: Vec<String>,
    scenarios: HashSet<String>,
    steps: usize,
}

/// Build helper recording every call, usable as either flavour.
#[derive(Debug, Clone)]
pub struct RecordingBuildHelper {
    state: Arc<Mutex<HelperState>>,
    enabled: bool,
}

impl RecordingBuildHelper {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn open(&self, call: String, key: &str) {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.scenarios.insert(key.to_string());
    }

    fn close(&self, call: String, key: &str) {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.scenarios.remove(key);
    }
}

impl ScenarioSource for RecordingBuildHelper {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn has_scenario(&self, key: &str) -> bool {
        self.state.lock().scenarios.contains(key)
    }

    fn create_request(&self, key: &str, step_title: &str) -> anyhow::Result<StepRequest> {
        let mut state = self.state.lock();
        state.steps += 1;
        state.calls.push(format!("request {} | {}", key, step_title));
        Ok(StepRequest::new(
            format!("token-{}", state.steps),
            format!("uuid-{}", state.steps),
        ))
    }
}

impl LocalBuildHelper for RecordingBuildHelper {
    fn create_scenario(&self, title: &str, key: &str) -> anyhow::Result<()> {
        self.open(format!("create {} | {}", title, key), key);
        Ok(())
    }

    fn end_scenario(&self, key: &str) -> anyhow::Result<()> {
        self.close(format!("end {}", key), key);
        Ok(())
    }
}

impl ParallelBuildHelper for RecordingBuildHelper {
    fn start_scenario(&self, key: &str, title: &str) -> anyhow::Result<()> {
        self.open(format!("start {} | {}", key, title), key);
        Ok(())
    }

    fn close_scenario(&self, key: &str) -> anyhow::Result<()> {
        self.close(format!("close {}", key), key);
        Ok(())
    }
}

/// Environment map tests can mutate mid-setup.
#[derive(Debug, Clone, Default)]
pub struct FakeEnv(Arc<Mutex<HashMap<String, String>>>);

impl FakeEnv {
    pub fn set(&self, key: &str, value: &str) {
        self.0.lock().insert(key.to_string(), value.to_string());
    }

    pub fn source(&self) -> EnvSource {
        let vars = Arc::clone(&self.0);
        EnvSource::from_fn(move |key| vars.lock().get(key).cloned())
    }
}

pub fn local_context(helper: &RecordingBuildHelper, env: &FakeEnv) -> Arc<BuildContext> {
    let helper = helper.clone();
    Arc::new(
        BuildContext::new(HarnessConfig::default(), move || Ok(Coordinator::local(helper.clone())))
            .with_env(env.source()),
    )
}

pub fn parallel_context(helper: &RecordingBuildHelper, env: &FakeEnv) -> Arc<BuildContext> {
    let helper = helper.clone();
    Arc::new(
        BuildContext::new(HarnessConfig::default(), move || {
            Ok(Coordinator::parallel(helper.clone()))
        })
        .with_env(env.source()),
    )
}

/// Probe that always enables and records the queries it was built with.
#[derive(Debug, Clone, Default)]
pub struct QueryProbe {
    queries: Arc<Mutex<Vec<String>>>,
}

impl QueryProbe {
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl ProbeCapability for QueryProbe {
    fn is_available(&self) -> bool {
        true
    }

    fn create(&self, query: &str) -> Box<dyn ProbeHandle> {
        self.queries.lock().push(query.to_string());
        Box::new(QueryHandle { enabled: false })
    }
}

struct QueryHandle {
    enabled: bool,
}

impl ProbeHandle for QueryHandle {
    fn enable(&mut self) -> bool {
        self.enabled = true;
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn close(&mut self) {
        self.enabled = false;
    }

    fn response_line(&self) -> String {
        "X-Blackfire-Response: continue=true".to_string()
    }

    fn set_attribute(&mut self, _name: &str, _value: Value) {}
}
