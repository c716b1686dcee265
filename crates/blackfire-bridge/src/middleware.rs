//! Middleware wiring
//!
//! Two front doors over the same flow: an axum `from_fn_with_state`
//! function and a tower [`Layer`] for arbitrary `http` services.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Router};
//! use blackfire_bridge::{profile_request, Profiler, ProfilerConfig, UnavailableProbe};
//!
//! let profiler = Arc::new(Profiler::new(Arc::new(UnavailableProbe), ProfilerConfig::default()));
//! let app: Router = Router::new()
//!     .route("/health", get(|| async { "ok" }))
//!     .layer(middleware::from_fn_with_state(profiler, profile_request));
//! ```

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use futures::future::BoxFuture;
use tower::{BoxError, Layer, Service};

use crate::error::ProfilerError;
use crate::profiler::{Activation, Profiler};
use crate::response::ResponseShape;

/// Run `next` under a probe session when `request` asks for one.
///
/// The session is released on every exit path: the guard is dropped when
/// `next` fails and when this future is dropped before completion.
async fn run_profiled<B, ResBody, E, F, Fut>(
    profiler: Arc<Profiler>,
    request: http::Request<B>,
    next: F,
) -> Result<http::Response<ResBody>, E>
where
    F: FnOnce(http::Request<B>) -> Fut,
    Fut: Future<Output = Result<http::Response<ResBody>, E>>,
    E: From<ProfilerError>,
{
    let active = match Profiler::start(&profiler, &request)? {
        Activation::Started(active) => active,
        Activation::Ineligible(_) => return next(request).await,
    };

    let mut response = next(request).await?;
    active.record_status(response.status());
    active.finish(ResponseShape::from(&mut response));

    Ok(response)
}

/// axum middleware profiling requests that carry the activation query.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn profile_request(
    State(profiler): State<Arc<Profiler>>,
    request: Request,
    next: Next,
) -> Result<Response, ProfilerError> {
    if !profiler.is_available() {
        return Ok(next.run(request).await);
    }

    run_profiled(profiler, request, |request| async move {
        Ok::<_, ProfilerError>(next.run(request).await)
    })
    .await
}

/// Tower layer adding request profiling to a service
#[derive(Debug, Clone)]
pub struct ProfilerLayer {
    profiler: Arc<Profiler>,
}

impl ProfilerLayer {
    pub fn new(profiler: Arc<Profiler>) -> Self {
        Self { profiler }
    }
}

impl<S> Layer<S> for ProfilerLayer {
    type Service = ProfilerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProfilerService {
            inner,
            profiler: Arc::clone(&self.profiler),
        }
    }
}

/// Service produced by [`ProfilerLayer`]
#[derive(Debug, Clone)]
pub struct ProfilerService<S> {
    inner: S,
    profiler: Arc<Profiler>,
}

impl<S, ReqBody, ResBody> Service<http::Request<ReqBody>> for ProfilerService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: http::Request<ReqBody>) -> Self::Future {
        // Drive the instance that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let profiler = Arc::clone(&self.profiler);

        Box::pin(run_profiled(profiler, request, move |request| async move {
            let result: Result<_, BoxError> = inner.call(request).await.map_err(Into::into);
            result
        }))
    }
}
