//! Span and task-local context for the service and its requests.
//!
//! # Design
//! - The process-wide `app` span carries the run mode and build SHA.
//! - Request id and matched route live in task-local storage so download
//!   pipeline logs can be correlated without threading ids through every call.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Keeps the process-wide `app` span entered while alive.
pub struct GlobalContextGuard {
    _entered: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the `app` span tagged with `mode` and the recorded build SHA.
    #[must_use]
    pub fn new(mode: impl Into<String>) -> Self {
        let mode = mode.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            mode = %mode,
            build_sha = %build_sha()
        )));
        Self {
            _entered: span.enter(),
        }
    }
}

/// Request id of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_request_id() -> Option<String> {
    REQUEST_CONTEXT
        .try_with(|ctx| ctx.request_id.to_string())
        .ok()
}

/// Matched route of the enclosing [`with_request_context`] scope.
#[must_use]
pub fn current_route() -> Option<String> {
    REQUEST_CONTEXT.try_with(|ctx| ctx.route.to_string()).ok()
}

/// Run `fut` with the given request id and route visible to [`current_request_id`]
/// and [`current_route`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    REQUEST_CONTEXT.scope(context, fut).await
}

#[derive(Clone)]
struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}
