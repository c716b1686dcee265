//! Per-class profiling harness
//!
//! A [`ProfiledTestCase`] wraps the requests a test class sends to the
//! service under test. Every profiled request becomes one step of the class
//! scenario, and its profile link is printed once the response is back.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blackfire_bridge_test::{BuildContext, ProfiledTestCase, ScenarioKey};
//!
//! struct HealthTest;
//!
//! # async fn example(context: Arc<BuildContext>, app: axum::Router) -> Result<(), blackfire_bridge_test::HarnessError> {
//! let mut case = ProfiledTestCase::new(context.clone(), ScenarioKey::of::<HealthTest>());
//! case.set_up(|| ())?;
//!
//! let request = http::Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap();
//! let response = case.call(app, request).await?;
//! assert!(response.status().is_success());
//!
//! case.tear_down(|| ());
//! ProfiledTestCase::tear_down_after_class(&context, &ScenarioKey::of::<HealthTest>())?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use blackfire_bridge::QUERY_HEADER;
use http::header::HeaderName;
use http::HeaderValue;
use serde_json::{Map, Value};
use tower::{BoxError, Service, ServiceExt};

use crate::config::SetupOrder;
use crate::context::BuildContext;
use crate::coordinator::StepRequest;
use crate::error::{HarnessError, HarnessResult};
use crate::reporter::ProfileLinkReporter;

/// Parameter flagging a console command as part of a profiled run
pub const COMMAND_PROFILE_FLAG: &str = "blackfire-laravel-tests";

/// Scenario grouping key, one per test class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScenarioKey(String);

impl ScenarioKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key named after a test type
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request extension opting a single request out of profiling
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipProfiling;

/// Profiling state of one test case instance
pub struct ProfiledTestCase {
    context: Arc<BuildContext>,
    scenario: ScenarioKey,
    scenario_title: Option<String>,
    profile_all_requests: bool,
    profile_next_request: bool,
    next_profile_title: Option<String>,
    step: Option<StepRequest>,
    reporter: ProfileLinkReporter,
}

impl ProfiledTestCase {
    pub fn new(context: Arc<BuildContext>, scenario: ScenarioKey) -> Self {
        let profile_all_requests = context.config().profile_all_requests;
        let reporter = ProfileLinkReporter::stdout(context.config().link_base_url.clone());
        Self {
            context,
            scenario,
            scenario_title: None,
            profile_all_requests,
            profile_next_request: profile_all_requests,
            next_profile_title: None,
            step: None,
            reporter,
        }
    }

    /// Human label for the scenario; defaults to the key
    pub fn with_scenario_title(mut self, title: impl Into<String>) -> Self {
        self.scenario_title = Some(title.into());
        self
    }

    pub fn with_profile_all_requests(mut self, enabled: bool) -> Self {
        self.profile_all_requests = enabled;
        self.profile_next_request = enabled;
        self
    }

    pub fn with_reporter(mut self, reporter: ProfileLinkReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn scenario(&self) -> &ScenarioKey {
        &self.scenario
    }

    /// Whether the next request will be profiled
    pub fn is_profiling_next(&self) -> bool {
        self.profile_next_request
    }

    /// Run `parent` setup and reset profiling defaults around it.
    ///
    /// The environment switch is read before or after `parent` depending on
    /// the effective [`SetupOrder`].
    pub fn set_up<T>(&mut self, parent: impl FnOnce() -> T) -> HarnessResult<T> {
        match self.context.setup_order()? {
            SetupOrder::SuppressBeforeParent => {
                self.apply_profiling_defaults()?;
                Ok(parent())
            }
            SetupOrder::SuppressAfterParent => {
                let out = parent();
                self.apply_profiling_defaults()?;
                Ok(out)
            }
        }
    }

    fn apply_profiling_defaults(&mut self) -> HarnessResult<()> {
        self.profile_next_request = self.profile_all_requests;
        self.next_profile_title = None;

        if self.context.build_disabled() {
            tracing::debug!(scenario = %self.scenario, "Blackfire builds disabled by environment");
            self.profile_next_request = false;
        } else if !self.context.coordinator()?.is_enabled() {
            self.profile_next_request = false;
        }
        Ok(())
    }

    /// Forget the current step, then run `parent` teardown
    pub fn tear_down<T>(&mut self, parent: impl FnOnce() -> T) -> T {
        self.step = None;
        self.next_profile_title = None;
        parent()
    }

    pub fn enable_profiling(&mut self) -> &mut Self {
        self.profile_next_request = true;
        self
    }

    pub fn disable_profiling(&mut self) -> &mut Self {
        self.profile_next_request = false;
        self
    }

    /// Title for the next profiled step; `None` falls back to `METHOD uri`
    pub fn set_profile_title(&mut self, title: Option<String>) -> &mut Self {
        self.next_profile_title = title;
        self
    }

    /// Open the class scenario unless the coordinator already knows it
    pub fn initialize_scenario(&self) -> HarnessResult<()> {
        let coordinator = self.context.coordinator()?;
        let key = self.scenario.as_str();
        if !coordinator.has_scenario(key) {
            let title = self.scenario_title.as_deref().unwrap_or(key);
            coordinator.open_scenario(key, title)?;
        }
        Ok(())
    }

    /// Attach a profiling ticket to `request`.
    ///
    /// Returns `None` when profiling is off for this test or the request
    /// carries [`SkipProfiling`].
    pub fn prepare_request<B>(
        &mut self,
        request: &mut http::Request<B>,
    ) -> HarnessResult<Option<&StepRequest>> {
        if !self.profile_next_request || request.extensions().get::<SkipProfiling>().is_some() {
            return Ok(None);
        }

        self.initialize_scenario()?;

        let title = match &self.next_profile_title {
            Some(title) => title.clone(),
            None => format!("{} {}", request.method(), request.uri()),
        };
        let step = self
            .context
            .coordinator()?
            .create_request(self.scenario.as_str(), &title)?;

        let token = HeaderValue::from_str(&step.token)
            .map_err(|_| HarnessError::InvalidToken(step.token.clone()))?;
        request
            .headers_mut()
            .insert(HeaderName::from_static(QUERY_HEADER), token);

        // the title is spent only once its step carries a ticket
        self.next_profile_title = None;
        self.step = Some(step);
        Ok(self.step.as_ref())
    }

    /// Mark console command parameters when the next run is profiled
    pub fn prepare_command(&self, parameters: &mut Map<String, Value>) {
        if self.profile_next_request {
            parameters.insert(COMMAND_PROFILE_FLAG.to_string(), Value::Bool(true));
        }
    }

    /// Print the link of the pending step, if any, and forget it
    pub fn record_response(&mut self) -> Option<StepRequest> {
        let step = self.step.take()?;
        self.reporter.profile_link(&step.uuid);
        Some(step)
    }

    /// Send `request` to `service`, profiling it as one scenario step
    pub async fn call<S, B, R>(
        &mut self,
        service: S,
        mut request: http::Request<B>,
    ) -> HarnessResult<http::Response<R>>
    where
        S: Service<http::Request<B>, Response = http::Response<R>>,
        S::Error: Into<BoxError>,
    {
        self.prepare_request(&mut request)?;

        match service.oneshot(request).await {
            Ok(response) => {
                self.record_response();
                Ok(response)
            }
            Err(err) => {
                self.step = None;
                let err: BoxError = err.into();
                Err(HarnessError::Service(err.to_string()))
            }
        }
    }

    /// Close the class scenario once its last test has run
    pub fn tear_down_after_class(context: &BuildContext, key: &ScenarioKey) -> HarnessResult<bool> {
        context.finish_scenario(key)
    }
}

impl fmt::Debug for ProfiledTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfiledTestCase")
            .field("scenario", &self.scenario)
            .field("profile_next_request", &self.profile_next_request)
            .field("step", &self.step)
            .finish()
    }
}
