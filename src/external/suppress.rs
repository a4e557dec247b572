//! Marker for suppressing nested HTTP instrumentation.
//!
//! The authenticated wrapper already traces the logical call, so while its
//! transport future runs the transport must not open a second client span.
//! The marker lives in a tokio task-local and only covers the wrapped future.

use std::future::Future;

tokio::task_local! {
    static SUPPRESS_HTTP_INSTRUMENTATION: ();
}

/// Run `future` with nested instrumentation suppressed
pub async fn suppress_further_instrumentation<F>(future: F) -> F::Output
where
    F: Future,
{
    SUPPRESS_HTTP_INSTRUMENTATION.scope((), future).await
}

pub fn is_instrumentation_suppressed() -> bool {
    SUPPRESS_HTTP_INSTRUMENTATION.try_with(|_| ()).is_ok()
}
