//! Process-wide build context
//!
//! Built once per test binary and handed to every fixture as
//! `Arc<BuildContext>`. The coordinator behind it is created lazily, on the
//! first profiled call, and reused afterwards.

use std::fmt;

use once_cell::sync::OnceCell;

use crate::case::ScenarioKey;
use crate::config::{EnvSource, HarnessConfig, SetupOrder};
use crate::coordinator::Coordinator;
use crate::error::{HarnessError, HarnessResult};

type CoordinatorFactory = dyn Fn() -> anyhow::Result<Coordinator> + Send + Sync;

/// Shared state for all profiled test cases of a run
pub struct BuildContext {
    config: HarnessConfig,
    env: EnvSource,
    factory: Box<CoordinatorFactory>,
    coordinator: OnceCell<Coordinator>,
}

impl BuildContext {
    /// Create a context whose coordinator comes from `factory`
    pub fn new<F>(config: HarnessConfig, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Coordinator> + Send + Sync + 'static,
    {
        Self {
            config,
            env: EnvSource::process(),
            factory: Box::new(factory),
            coordinator: OnceCell::new(),
        }
    }

    /// Replace the environment lookup
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The coordinator, created on first access.
    ///
    /// A failing factory is reported and tried again on the next call.
    pub fn coordinator(&self) -> HarnessResult<&Coordinator> {
        self.coordinator.get_or_try_init(|| {
            tracing::debug!("Initializing Blackfire build coordinator");
            (self.factory)().map_err(|e| HarnessError::coordinator("initialize", e))
        })
    }

    /// The coordinator if it has already been created
    pub fn initialized(&self) -> Option<&Coordinator> {
        self.coordinator.get()
    }

    /// Whether the environment switch disables profiling; read on each call
    pub fn build_disabled(&self) -> bool {
        self.env.flag(&self.config.disable_switch)
    }

    /// Setup order: the config override, else the coordinator's default.
    ///
    /// While the environment switch is set the coordinator is not created
    /// here; an existing one still supplies its order, otherwise defaults
    /// are applied before the parent setup.
    pub fn setup_order(&self) -> HarnessResult<SetupOrder> {
        if let Some(order) = self.config.setup_order {
            return Ok(order);
        }

        if self.build_disabled() {
            return Ok(self
                .initialized()
                .map_or(SetupOrder::SuppressBeforeParent, Coordinator::default_setup_order));
        }

        Ok(self.coordinator()?.default_setup_order())
    }

    /// Close scenario `key` after the last test of its class.
    ///
    /// Does nothing when no coordinator was ever created or the scenario is
    /// no longer known. Returns whether a close was issued.
    pub fn finish_scenario(&self, key: &ScenarioKey) -> HarnessResult<bool> {
        let Some(coordinator) = self.initialized() else {
            return Ok(false);
        };

        if !coordinator.has_scenario(key.as_str()) {
            return Ok(false);
        }

        coordinator.close_scenario(key.as_str())?;
        Ok(true)
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator.get())
            .finish()
    }
}
