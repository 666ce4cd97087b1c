//! Task-scoped request context.
//!
//! Holds the correlation ID, request path, and request method for the
//! logical request currently being executed. Storage is a Tokio
//! task-local, so values follow a request future across `.await`
//! points and worker threads, and two requests handled concurrently
//! never see each other's values.
//!
//! A scope is opened with [`scope`] (the middleware does this for every
//! inbound request). Code running outside any scope (startup, a batch
//! job, a plain `tokio::spawn`) reads and writes a per-thread fallback
//! entry instead, so a value set there is still seen by logging and
//! outbound calls on the same thread.

use std::cell::RefCell;
use std::future::Future;

use tokio::task::JoinHandle;

/// Header carrying the correlation ID, inbound and outbound.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
}

tokio::task_local! {
    static CURRENT: RefCell<RequestContext>;
}

thread_local! {
    static FALLBACK: RefCell<RequestContext> = RefCell::new(RequestContext::default());
}

/// Run `f` against the scoped entry, or the thread's fallback outside a scope.
fn with_entry<R>(f: impl FnOnce(&RefCell<RequestContext>) -> R) -> R {
    if in_scope() {
        CURRENT.with(f)
    } else {
        FALLBACK.with(f)
    }
}

/// Run `future` as a new logical unit with an empty context.
pub async fn scope<F: Future>(future: F) -> F::Output {
    scope_with(RequestContext::default(), future).await
}

/// Run `future` as a new logical unit seeded with `context`.
pub async fn scope_with<F: Future>(context: RequestContext, future: F) -> F::Output {
    CURRENT.scope(RefCell::new(context), future).await
}

/// Synchronous variant of [`scope_with`], for code that never awaits.
pub fn sync_scope<R>(context: RequestContext, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(RefCell::new(context), f)
}

/// Spawn `future` on the runtime with a copy of the current context.
///
/// `tokio::spawn` starts a fresh task, and task-locals do not cross
/// that boundary. Background work belonging to a request should use
/// this instead so its logs keep the request's correlation ID.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(scope_with(current(), future))
}

#[must_use]
pub fn in_scope() -> bool {
    CURRENT.try_with(|_| ()).is_ok()
}

/// Snapshot of all three values.
#[must_use]
pub fn current() -> RequestContext {
    with_entry(|cell| cell.borrow().clone())
}

pub fn set_correlation_id(id: Option<String>) {
    with_entry(|cell| cell.borrow_mut().correlation_id = id);
}

#[must_use]
pub fn get_correlation_id() -> Option<String> {
    with_entry(|cell| cell.borrow().correlation_id.clone())
}

pub fn set_request_context(path: Option<String>, method: Option<String>) {
    with_entry(|cell| {
        let mut ctx = cell.borrow_mut();
        ctx.path = path;
        ctx.method = method;
    });
}

#[must_use]
pub fn get_request_path() -> Option<String> {
    with_entry(|cell| cell.borrow().path.clone())
}

#[must_use]
pub fn get_request_method() -> Option<String> {
    with_entry(|cell| cell.borrow().method.clone())
}

/// A fresh UUID v4 in hyphenated form.
#[must_use]
pub fn generate_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
