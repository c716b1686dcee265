//! Harness configuration

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Environment switch that turns profiling off for a whole run
pub const BUILD_DISABLED_ENV: &str = "BLACKFIRE_BUILD_DISABLED";

/// Default host for profile links
pub const DEFAULT_LINK_BASE_URL: &str = "https://blackfire.io";

/// Where the profiling defaults are applied relative to the parent setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupOrder {
    /// Apply defaults, then run the parent setup
    SuppressBeforeParent,
    /// Run the parent setup, then apply defaults
    SuppressAfterParent,
}

/// Configuration shared by every profiled test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Profile every request unless a test opts out
    pub profile_all_requests: bool,

    /// Override for the coordinator's own setup order
    pub setup_order: Option<SetupOrder>,

    /// Host used in printed profile links
    pub link_base_url: String,

    /// Environment variable that disables profiling
    pub disable_switch: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            profile_all_requests: true,
            setup_order: None,
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            disable_switch: BUILD_DISABLED_ENV.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether requests are profiled by default
    pub fn profile_all_requests(mut self, enabled: bool) -> Self {
        self.profile_all_requests = enabled;
        self
    }

    /// Force a setup order regardless of the coordinator
    pub fn setup_order(mut self, order: SetupOrder) -> Self {
        self.setup_order = Some(order);
        self
    }

    /// Set the profile link host
    pub fn link_base_url(mut self, url: impl Into<String>) -> Self {
        self.link_base_url = url.into();
        self
    }

    /// Set the environment switch name
    pub fn disable_switch(mut self, name: impl Into<String>) -> Self {
        self.disable_switch = name.into();
        self
    }
}

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Environment variable lookup, pluggable for tests.
#[derive(Clone)]
pub struct EnvSource(Arc<Lookup>);

impl EnvSource {
    /// Read from the process environment
    pub fn process() -> Self {
        Self::from_fn(|key| std::env::var(key).ok())
    }

    pub fn from_fn<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(lookup))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    /// Whether `key` holds a truthy value (`1`, `true`, `yes`, `on`)
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).map_or(false, |value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::process()
    }
}

impl fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvSource")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvSource {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvSource::from_fn(move |key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert!(config.profile_all_requests);
        assert_eq!(config.setup_order, None);
        assert_eq!(config.link_base_url, "https://blackfire.io");
        assert_eq!(config.disable_switch, "BLACKFIRE_BUILD_DISABLED");
    }

    #[test]
    fn test_deserialize_setup_order() {
        let config: HarnessConfig =
            serde_json::from_str(r#"{"setup_order": "suppress_before_parent"}"#).unwrap();
        assert_eq!(config.setup_order, Some(SetupOrder::SuppressBeforeParent));
        assert!(config.profile_all_requests);
    }

    #[test]
    fn test_flag_values() {
        let source = env(&[
            ("A", "1"),
            ("B", " TRUE "),
            ("C", "on"),
            ("D", "0"),
            ("E", "false"),
            ("F", ""),
        ]);

        assert!(source.flag("A"));
        assert!(source.flag("B"));
        assert!(source.flag("C"));
        assert!(!source.flag("D"));
        assert!(!source.flag("E"));
        assert!(!source.flag("F"));
        assert!(!source.flag("MISSING"));
    }
}
