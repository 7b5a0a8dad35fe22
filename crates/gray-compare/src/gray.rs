//! Dual-path query orchestration.
//!
//! [`gray`] dispatches the old-path and new-path fetches to their pools,
//! returns the primary path's result to the caller, and hands the pair off
//! to the out-of-band comparator. Failure semantics are asymmetric: a
//! primary failure propagates, a shadow failure is logged and only skips
//! comparison for that invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::compare;
use crate::config::CompareConfig;
use crate::correlation;
use crate::diff::Diffable;
use crate::error::QueryError;

/// Boxed future used by the fetcher capability.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Zero-argument query closure. Invoked once per dispatch and again on every
/// comparison retry, so it must be safe to call repeatedly.
pub type Fetcher<E> = Arc<dyn Fn() -> BoxFuture<anyhow::Result<E>> + Send + Sync>;

/// Adapt an async closure into a [`Fetcher`].
pub fn fetcher<E, F, Fut>(f: F) -> Fetcher<E>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<E>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// Run one gray-release invocation.
///
/// Returns the primary path's value, or that path's error. The comparison
/// task, if any, is fire-and-forget: this function never waits on it, and
/// its outcome is only observable through the configured reporter and logs.
pub async fn gray<E, O>(
    old_fetch: Fetcher<E>,
    new_fetch: Fetcher<E>,
    config: Arc<CompareConfig<O>>,
) -> Result<E, QueryError>
where
    E: Diffable<Item = O> + Clone + Send + Sync + 'static,
    O: Clone + Send + Sync + Serialize + 'static,
{
    let correlation_id = correlation::generate_id();
    let primary_is_new = config.switch_to_new_query;

    let (primary, shadow) = if primary_is_new {
        (
            PathSpec::new("new-query", &new_fetch, &config.new_query_pool, config.new_query_wait),
            PathSpec::new("old-query", &old_fetch, &config.old_query_pool, config.old_query_wait),
        )
    } else {
        (
            PathSpec::new("old-query", &old_fetch, &config.old_query_pool, config.old_query_wait),
            PathSpec::new("new-query", &new_fetch, &config.new_query_pool, config.new_query_wait),
        )
    };

    // The primary query always runs. The shadow side is dispatched only when
    // comparison is on — with it off, the shadow path costs nothing.
    let primary_handle = primary.dispatch(&correlation_id);
    let shadow_handle = config
        .switch_to_cmp
        .then(|| shadow.dispatch(&correlation_id));

    let primary_value = match await_query(primary_handle, primary.wait).await {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(
                business_flag = %config.business_flag,
                correlation_id = %correlation_id,
                path = primary.name,
                error = %e,
                "Primary query failed"
            );
            return Err(e);
        }
    };

    let shadow_value = match shadow_handle {
        Some(handle) => match await_query(handle, shadow.wait).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    business_flag = %config.business_flag,
                    correlation_id = %correlation_id,
                    path = shadow.name,
                    error = %e,
                    "Shadow query failed, skipping comparison"
                );
                None
            }
        },
        None => None,
    };

    // A present shadow value implies comparison is enabled and the shadow
    // fetch succeeded. Submit the comparator and return without waiting.
    if let Some(shadow_value) = shadow_value {
        let (old_value, new_value) = if primary_is_new {
            (shadow_value, primary_value.clone())
        } else {
            (primary_value.clone(), shadow_value)
        };
        spawn_named(
            &config.cmp_pool,
            "cmp-task",
            &correlation_id,
            compare::run(
                old_value,
                new_value,
                old_fetch.clone(),
                new_fetch.clone(),
                Arc::clone(&config),
            ),
        );
    }

    Ok(primary_value)
}

/// One side of the dual dispatch: a fetcher bound to its pool and wait.
struct PathSpec<'a, E> {
    name: &'static str,
    fetch: &'a Fetcher<E>,
    pool: &'a Handle,
    wait: Duration,
}

impl<'a, E: Send + 'static> PathSpec<'a, E> {
    fn new(name: &'static str, fetch: &'a Fetcher<E>, pool: &'a Handle, wait: Duration) -> Self {
        Self {
            name,
            fetch,
            pool,
            wait,
        }
    }

    fn dispatch(&self, correlation_id: &str) -> JoinHandle<anyhow::Result<E>> {
        spawn_named(self.pool, self.name, correlation_id, (self.fetch)())
    }
}

/// Spawn a named unit of work onto a caller-owned pool, wrapped in a span
/// carrying the task name and correlation ID.
fn spawn_named<T: Send + 'static>(
    pool: &Handle,
    name: &'static str,
    correlation_id: &str,
    fut: impl Future<Output = T> + Send + 'static,
) -> JoinHandle<T> {
    let span = tracing::info_span!("gray_task", task = name, correlation_id = %correlation_id);
    pool.spawn(fut.instrument(span))
}

/// Bounded wait on a dispatched query. On timeout the `JoinHandle` is
/// dropped, abandoning the task without aborting it; the underlying fetch
/// may still complete and its output is discarded.
async fn await_query<E>(
    handle: JoinHandle<anyhow::Result<E>>,
    wait: Duration,
) -> Result<E, QueryError> {
    match tokio::time::timeout(wait, handle).await {
        Ok(Ok(Ok(value))) => Ok(value),
        Ok(Ok(Err(e))) => Err(QueryError::Fetch(e)),
        Ok(Err(join_err)) => Err(QueryError::Join(join_err)),
        Err(_) => Err(QueryError::Timeout(wait)),
    }
}
