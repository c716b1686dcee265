//! blackfire-bridge-test: Blackfire scenarios for HTTP test suites
//!
//! Groups the requests of each test class into one Blackfire scenario:
//! - a shared [`BuildContext`] owns the build coordinator for the whole run
//! - each [`ProfiledTestCase`] turns its requests into scenario steps
//! - profile links are printed as steps complete
//!
//! The build helper talking to Blackfire is external and plugged in through
//! [`LocalBuildHelper`] or [`ParallelBuildHelper`].

pub mod case;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod reporter;

// Re-exports
pub use case::{ProfiledTestCase, ScenarioKey, SkipProfiling, COMMAND_PROFILE_FLAG};
pub use config::{EnvSource, HarnessConfig, SetupOrder, BUILD_DISABLED_ENV};
pub use context::BuildContext;
pub use coordinator::{Coordinator, LocalBuildHelper, ParallelBuildHelper, ScenarioSource, StepRequest};
pub use error::{HarnessError, HarnessResult};
pub use logging::init_test_logging;
pub use reporter::{profile_url, ProfileLinkReporter, SharedBuffer};
