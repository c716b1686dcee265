//! Request-scoped probe sessions
//!
//! A [`Profiler`] stands for one worker. It owns at most one live probe at a
//! time: a request carrying the activation query starts it, and the same
//! request finalizes it on the way out.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use blackfire_bridge::{Activation, Profiler, ProfilerConfig, ResponseShape, UnavailableProbe};
//!
//! # fn example() -> Result<(), blackfire_bridge::ProfilerError> {
//! let profiler = Arc::new(Profiler::new(Arc::new(UnavailableProbe), ProfilerConfig::default()));
//! let request = http::Request::builder().uri("/health").body(()).unwrap();
//!
//! if let Activation::Started(active) = Profiler::start(&profiler, &request)? {
//!     let mut response = http::Response::new(());
//!     active.record_status(response.status());
//!     active.finish(ResponseShape::from(&mut response));
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use http::StatusCode;
use parking_lot::Mutex;
use serde_json::json;

use crate::config::{ProfilerConfig, PROFILE_TITLE_ATTRIBUTE, STATUS_CODE_ATTRIBUTE};
use crate::error::{ProfilerError, ProfilerResult};
use crate::probe::{ProbeCapability, ProbeHandle};
use crate::request::ProfiledRequest;
use crate::response::{ProbeResponseHeader, ResponseShape};

/// Identity of the request that owns a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a request was not profiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// No profiling agent in this process
    CapabilityUnavailable,
    /// Request did not carry the activation query
    MissingQuery,
    /// Another request is being profiled on this worker
    SessionActive,
    /// The session was reset while its probe was being enabled
    Reset,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::CapabilityUnavailable => write!(f, "capability unavailable"),
            Ineligible::MissingQuery => write!(f, "missing query header"),
            Ineligible::SessionActive => write!(f, "session already active"),
            Ineligible::Reset => write!(f, "session reset during activation"),
        }
    }
}

/// Outcome of [`Profiler::start`]
#[derive(Debug)]
pub enum Activation {
    Started(ActiveProfile),
    Ineligible(Ineligible),
}

struct ProbeSession {
    request_id: RequestId,
    handle: Box<dyn ProbeHandle>,
}

enum SessionSlot {
    Empty,
    /// Claimed by a request whose probe is being created and enabled
    Reserved(RequestId),
    Live(ProbeSession),
}

/// Claim on the session slot held while the agent enables a probe.
///
/// Dropping it frees the slot unless the probe was installed.
struct Reservation<'a> {
    profiler: &'a Profiler,
    request_id: RequestId,
}

impl Reservation<'_> {
    /// Install `handle` as the live session, or hand it back if the slot was reset.
    fn fill(&self, handle: Box<dyn ProbeHandle>) -> Result<(), Box<dyn ProbeHandle>> {
        let mut slot = self.profiler.session.lock();
        if !matches!(*slot, SessionSlot::Reserved(id) if id == self.request_id) {
            return Err(handle);
        }
        *slot = SessionSlot::Live(ProbeSession {
            request_id: self.request_id,
            handle,
        });
        Ok(())
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut slot = self.profiler.session.lock();
        if matches!(*slot, SessionSlot::Reserved(id) if id == self.request_id) {
            *slot = SessionSlot::Empty;
        }
    }
}

/// Per-worker probe lifecycle manager
pub struct Profiler {
    capability: Arc<dyn ProbeCapability>,
    config: ProfilerConfig,
    session: Mutex<SessionSlot>,
    next_request_id: AtomicU64,
}

impl Profiler {
    /// Create a profiler on top of a probe capability
    pub fn new(capability: Arc<dyn ProbeCapability>, config: ProfilerConfig) -> Self {
        Self {
            capability,
            config,
            session: Mutex::new(SessionSlot::Empty),
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Whether the underlying agent is loaded
    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    /// Whether a session is live or being activated
    pub fn is_profiling(&self) -> bool {
        !matches!(*self.session.lock(), SessionSlot::Empty)
    }

    /// Try to start profiling `request`.
    ///
    /// Returns [`Activation::Ineligible`] when the agent is missing, the
    /// query header is absent, another session is live, or [`Profiler::reset`]
    /// cleared the slot while the probe was being enabled. Fails only when
    /// the probe refuses to enable.
    pub fn start<R>(self: &Arc<Self>, request: &R) -> ProfilerResult<Activation>
    where
        R: ProfiledRequest + ?Sized,
    {
        if !self.capability.is_available() {
            return Ok(self.ineligible(Ineligible::CapabilityUnavailable));
        }

        let Some(query) = request.header(&self.config.query_header) else {
            return Ok(self.ineligible(Ineligible::MissingQuery));
        };

        let reservation = {
            let mut slot = self.session.lock();
            if !matches!(*slot, SessionSlot::Empty) {
                // profiling may have been activated by a concurrent request
                return Ok(self.ineligible(Ineligible::SessionActive));
            }
            let request_id = RequestId(self.next_request_id.fetch_add(1, Ordering::Relaxed));
            *slot = SessionSlot::Reserved(request_id);
            Reservation {
                profiler: self,
                request_id,
            }
        };
        let request_id = reservation.request_id;

        // the agent runs outside the lock; the reservation keeps other requests out
        let mut handle = self.capability.create(query);

        if !handle.enable() {
            let url = request.url();
            handle.set_attribute(PROFILE_TITLE_ATTRIBUTE, json!(url));
            release_handle(handle);
            drop(reservation);
            tracing::error!(request_id = %request_id, url = %url, "Cannot enable Blackfire probe");
            return Err(ProfilerError::ProbeActivation { url });
        }

        if let Err(handle) = reservation.fill(handle) {
            release_handle(handle);
            return Ok(self.ineligible(Ineligible::Reset));
        }
        drop(reservation);
        tracing::info!(request_id = %request_id, "Blackfire probe enabled");

        Ok(Activation::Started(ActiveProfile {
            profiler: Arc::clone(self),
            request_id,
        }))
    }

    /// Finalize the session owned by `request_id`.
    ///
    /// Closes the probe, relays its header onto `response` when the shape
    /// allows it, and releases the session. Returns false without touching
    /// anything if the session is missing, disabled, or owned by another
    /// request.
    pub fn stop(&self, request_id: RequestId, response: ResponseShape<'_>) -> bool {
        if !self.capability.is_available() {
            return false;
        }

        let mut session = {
            let mut slot = self.session.lock();
            match std::mem::replace(&mut *slot, SessionSlot::Empty) {
                SessionSlot::Live(session)
                    if session.request_id == request_id && session.handle.is_enabled() =>
                {
                    session
                }
                other => {
                    *slot = other;
                    return false;
                }
            }
        };

        session.handle.close();

        if let ResponseShape::Headers { headers, .. } = response {
            let line = session.handle.response_line();
            match ProbeResponseHeader::parse(&line).as_ref().and_then(ProbeResponseHeader::to_header) {
                Some((name, value)) => {
                    headers.insert(name, value);
                }
                None => {
                    tracing::warn!(request_id = %request_id, line = %line, "Unusable probe response line");
                }
            }
        }

        release_handle(session.handle);
        tracing::info!(request_id = %request_id, "Blackfire profile finalized");
        true
    }

    /// Release the session owned by `request_id` without relaying anything.
    ///
    /// Idempotent; a no-op once the session is gone or owned by another
    /// request.
    pub fn release(&self, request_id: RequestId) {
        let session = {
            let mut slot = self.session.lock();
            match std::mem::replace(&mut *slot, SessionSlot::Empty) {
                SessionSlot::Live(session) if session.request_id == request_id => session,
                other => {
                    *slot = other;
                    return;
                }
            }
        };

        tracing::debug!(request_id = %request_id, "Releasing Blackfire session");
        release_handle(session.handle);
    }

    /// Drop whatever session is live, closing its probe if still enabled.
    ///
    /// A request still enabling its probe loses its claim and is not profiled.
    pub fn reset(&self) {
        let slot = std::mem::replace(&mut *self.session.lock(), SessionSlot::Empty);
        match slot {
            SessionSlot::Live(session) => {
                tracing::debug!(request_id = %session.request_id, "Resetting Blackfire session");
                release_handle(session.handle);
            }
            SessionSlot::Reserved(request_id) => {
                tracing::debug!(request_id = %request_id, "Resetting Blackfire activation");
            }
            SessionSlot::Empty => {}
        }
    }

    // The handle is called with the session lock held.
    fn set_attribute(&self, request_id: RequestId, name: &str, value: serde_json::Value) {
        let mut slot = self.session.lock();
        if let SessionSlot::Live(session) = &mut *slot {
            if session.request_id == request_id {
                session.handle.set_attribute(name, value);
            }
        }
    }

    fn ineligible(&self, reason: Ineligible) -> Activation {
        tracing::debug!(reason = %reason, "Request not profiled");
        Activation::Ineligible(reason)
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("config", &self.config)
            .field("available", &self.capability.is_available())
            .field("profiling", &self.is_profiling())
            .finish()
    }
}

fn release_handle(mut handle: Box<dyn ProbeHandle>) {
    if handle.is_enabled() {
        handle.close();
    }
}

/// Guard for a live session; releases it when dropped.
pub struct ActiveProfile {
    profiler: Arc<Profiler>,
    request_id: RequestId,
}

impl ActiveProfile {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Push the downstream status code into this session's probe
    pub fn record_status(&self, status: StatusCode) {
        if self.profiler.config.record_status_code {
            self.set_attribute(STATUS_CODE_ATTRIBUTE, json!(status.as_u16()));
        }
    }

    /// Set an attribute on this session's probe
    pub fn set_attribute(&self, name: &str, value: serde_json::Value) {
        self.profiler.set_attribute(self.request_id, name, value);
    }

    /// Finalize the session against `response`. See [`Profiler::stop`].
    pub fn finish(self, response: ResponseShape<'_>) -> bool {
        self.profiler.stop(self.request_id, response)
    }
}

impl Drop for ActiveProfile {
    fn drop(&mut self) {
        self.profiler.release(self.request_id);
    }
}

impl fmt::Debug for ActiveProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveProfile")
            .field("request_id", &self.request_id)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
