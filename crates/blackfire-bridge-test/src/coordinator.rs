//! Build helper seam
//!
//! The helper that talks to the Blackfire build service is external. It
//! comes in two flavours with different scenario verbs; [`Coordinator`]
//! gives the harness one surface over both.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SetupOrder;
use crate::error::{HarnessError, HarnessResult};

/// Ticket for one profiled step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRequest {
    /// Activation query to send in `X-Blackfire-Query`
    pub token: String,
    /// Profile id, used in the printed link
    pub uuid: String,
}

impl StepRequest {
    pub fn new(token: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            uuid: uuid.into(),
        }
    }
}

/// Operations shared by both helper flavours.
pub trait ScenarioSource: Send + Sync {
    /// Whether builds are enabled for this run
    fn is_enabled(&self) -> bool;

    fn has_scenario(&self, key: &str) -> bool;

    /// Issue a ticket for one step of scenario `key`
    fn create_request(&self, key: &str, step_title: &str) -> anyhow::Result<StepRequest>;
}

/// Helper whose scenarios are created, then ended.
pub trait LocalBuildHelper: ScenarioSource {
    fn create_scenario(&self, title: &str, key: &str) -> anyhow::Result<()>;

    fn end_scenario(&self, key: &str) -> anyhow::Result<()>;
}

/// Helper safe for parallel runs; scenarios are started, then closed.
pub trait ParallelBuildHelper: ScenarioSource {
    fn start_scenario(&self, key: &str, title: &str) -> anyhow::Result<()>;

    fn close_scenario(&self, key: &str) -> anyhow::Result<()>;
}

/// One of the two helper flavours
#[derive(Clone)]
pub enum Coordinator {
    Local(Arc<dyn LocalBuildHelper>),
    Parallel(Arc<dyn ParallelBuildHelper>),
}

impl Coordinator {
    pub fn local(helper: impl LocalBuildHelper + 'static) -> Self {
        Coordinator::Local(Arc::new(helper))
    }

    pub fn parallel(helper: impl ParallelBuildHelper + 'static) -> Self {
        Coordinator::Parallel(Arc::new(helper))
    }

    /// Setup order each flavour expects
    pub fn default_setup_order(&self) -> SetupOrder {
        match self {
            Coordinator::Local(_) => SetupOrder::SuppressAfterParent,
            Coordinator::Parallel(_) => SetupOrder::SuppressBeforeParent,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Coordinator::Local(helper) => helper.is_enabled(),
            Coordinator::Parallel(helper) => helper.is_enabled(),
        }
    }

    pub fn has_scenario(&self, key: &str) -> bool {
        match self {
            Coordinator::Local(helper) => helper.has_scenario(key),
            Coordinator::Parallel(helper) => helper.has_scenario(key),
        }
    }

    /// Create or start scenario `key`
    pub fn open_scenario(&self, key: &str, title: &str) -> HarnessResult<()> {
        tracing::debug!(scenario = %key, title = %title, "Opening Blackfire scenario");
        match self {
            Coordinator::Local(helper) => helper
                .create_scenario(title, key)
                .map_err(|e| HarnessError::coordinator("create scenario", e)),
            Coordinator::Parallel(helper) => helper
                .start_scenario(key, title)
                .map_err(|e| HarnessError::coordinator("start scenario", e)),
        }
    }

    /// End or close scenario `key`
    pub fn close_scenario(&self, key: &str) -> HarnessResult<()> {
        tracing::debug!(scenario = %key, "Closing Blackfire scenario");
        match self {
            Coordinator::Local(helper) => helper
                .end_scenario(key)
                .map_err(|e| HarnessError::coordinator("end scenario", e)),
            Coordinator::Parallel(helper) => helper
                .close_scenario(key)
                .map_err(|e| HarnessError::coordinator("close scenario", e)),
        }
    }

    pub fn create_request(&self, key: &str, step_title: &str) -> HarnessResult<StepRequest> {
        let step = match self {
            Coordinator::Local(helper) => helper.create_request(key, step_title),
            Coordinator::Parallel(helper) => helper.create_request(key, step_title),
        }
        .map_err(|e| HarnessError::coordinator("create request", e))?;

        tracing::debug!(scenario = %key, step = %step_title, uuid = %step.uuid, "Created Blackfire step");
        Ok(step)
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinator::Local(_) => f.write_str("Coordinator::Local"),
            Coordinator::Parallel(_) => f.write_str("Coordinator::Parallel"),
        }
    }
}
