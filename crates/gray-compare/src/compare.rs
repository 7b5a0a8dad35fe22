//! Out-of-band comparison task.
//!
//! Runs entirely on the compare pool, detached from the invocation that
//! spawned it. Nothing here may surface back to the caller: every failure —
//! misconfiguration, a refetch error — is logged and ends the task.
//!
//! An apparent mismatch right after a write may just be replication lag
//! between the two backing stores, so the loop re-fetches both sides and
//! diffs again instead of re-judging the same stale capture.

use std::sync::Arc;

use serde::Serialize;

use crate::config::CompareConfig;
use crate::diff::{self, Diffable, DiffResult};
use crate::gray::Fetcher;

/// Retry loop: diff, and while differences remain and attempts are left,
/// sleep, refetch both sides, and diff again. The last computed diff is
/// reported exactly once; a task that errors out reports nothing.
pub(crate) async fn run<E, O>(
    mut old_value: E,
    mut new_value: E,
    old_fetch: Fetcher<E>,
    new_fetch: Fetcher<E>,
    config: Arc<CompareConfig<O>>,
) where
    E: Diffable<Item = O> + Send + Sync + 'static,
    O: Clone + Send + Sync + Serialize + 'static,
{
    let mut result = DiffResult::new();

    for attempt in 1..=config.max_cmp_times {
        // Coerced borrows stay inside this statement so the future holds
        // nothing non-Send across the sleep and refetch awaits.
        result = match diff::diff(
            &old_value,
            &new_value,
            config.key_extractor.as_deref().map(|k| k as _),
            &*config.equivalence,
            config.zero.as_ref(),
        ) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    business_flag = %config.business_flag,
                    error = %e,
                    "Comparison misconfigured, giving up"
                );
                return;
            }
        };

        if !result.has_difference() {
            break;
        }
        if attempt == config.max_cmp_times {
            break;
        }

        tracing::debug!(
            business_flag = %config.business_flag,
            attempt,
            diff = %result,
            "Differences found, refetching before next attempt"
        );
        tokio::time::sleep(config.cmp_sleep).await;

        old_value = match (old_fetch)().await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    business_flag = %config.business_flag,
                    error = %e,
                    "Old-path refetch failed during comparison"
                );
                return;
            }
        };
        new_value = match (new_fetch)().await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(
                    business_flag = %config.business_flag,
                    error = %e,
                    "New-path refetch failed during comparison"
                );
                return;
            }
        };
    }

    if let Some(reporter) = &config.reporter {
        reporter.report(&config.business_flag, &result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gray::fetcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    type Reports = Arc<Mutex<Vec<DiffResult<i64>>>>;

    fn capturing_reporter() -> Reports {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn config_with(
        max_cmp_times: u32,
        key_extractor: bool,
        reports: Reports,
    ) -> Arc<CompareConfig<i64>> {
        let handle = tokio::runtime::Handle::current();
        let mut builder = CompareConfig::builder()
            .old_query_pool(handle.clone())
            .new_query_pool(handle.clone())
            .cmp_pool(handle)
            .cmp_sleep(Duration::from_millis(1))
            .max_cmp_times(max_cmp_times)
            .switch_to_cmp(true)
            .business_flag("cmp-test")
            .equivalence(|a: &i64, b: &i64| a == b)
            .reporter(move |_flag: &str, result: &DiffResult<i64>| {
                reports.lock().unwrap().push(result.clone());
            });
        if key_extractor {
            builder = builder.key_extractor(|v: &i64| v.to_string());
        }
        Arc::new(builder.build().unwrap())
    }

    fn counting_fetcher(values: Vec<i64>, calls: Arc<AtomicUsize>) -> Fetcher<Vec<i64>> {
        fetcher(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let values = values.clone();
            async move { Ok(values) }
        })
    }

    #[tokio::test]
    async fn test_clean_first_attempt_reports_once_without_refetch() {
        let reporter = capturing_reporter();
        let config = config_with(3, true, reporter.clone());
        let old_calls = Arc::new(AtomicUsize::new(0));
        let new_calls = Arc::new(AtomicUsize::new(0));

        run(
            vec![1_i64, 2, 3],
            vec![1_i64, 2, 3],
            counting_fetcher(vec![1, 2, 3], old_calls.clone()),
            counting_fetcher(vec![1, 2, 3], new_calls.clone()),
            config,
        )
        .await;

        // No refetch on a clean first attempt.
        assert_eq!(old_calls.load(Ordering::SeqCst), 0);
        assert_eq!(new_calls.load(Ordering::SeqCst), 0);

        let results = reporter.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].has_difference());
    }

    #[tokio::test]
    async fn test_persistent_difference_exhausts_attempts() {
        let reporter = capturing_reporter();
        let config = config_with(3, true, reporter.clone());
        let old_calls = Arc::new(AtomicUsize::new(0));
        let new_calls = Arc::new(AtomicUsize::new(0));

        run(
            vec![1_i64],
            vec![2_i64],
            counting_fetcher(vec![1], old_calls.clone()),
            counting_fetcher(vec![2], new_calls.clone()),
            config,
        )
        .await;

        // Three attempts means exactly two refetch rounds.
        assert_eq!(old_calls.load(Ordering::SeqCst), 2);
        assert_eq!(new_calls.load(Ordering::SeqCst), 2);

        let results = reporter.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].has_difference());
        assert_eq!(results[0].only_in_left[0].left, Some(1));
        assert_eq!(results[0].only_in_right[0].right, Some(2));
    }

    #[tokio::test]
    async fn test_difference_resolving_on_retry_reports_clean() {
        let reporter = capturing_reporter();
        let config = config_with(3, true, reporter.clone());
        // Old side converges to the new side on refetch.
        let old_calls = Arc::new(AtomicUsize::new(0));
        let new_calls = Arc::new(AtomicUsize::new(0));

        run(
            vec![1_i64],
            vec![2_i64],
            counting_fetcher(vec![2], old_calls.clone()),
            counting_fetcher(vec![2], new_calls.clone()),
            config,
        )
        .await;

        assert_eq!(old_calls.load(Ordering::SeqCst), 1);
        assert_eq!(new_calls.load(Ordering::SeqCst), 1);

        let results = reporter.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].has_difference());
    }

    #[tokio::test]
    async fn test_missing_key_extractor_swallowed_no_report() {
        let reporter = capturing_reporter();
        let config = config_with(3, false, reporter.clone());

        run(
            vec![1_i64],
            vec![2_i64],
            counting_fetcher(vec![1], Arc::new(AtomicUsize::new(0))),
            counting_fetcher(vec![2], Arc::new(AtomicUsize::new(0))),
            config,
        )
        .await;

        assert!(reporter.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refetch_failure_ends_task_without_report() {
        let reporter = capturing_reporter();
        let config = config_with(3, true, reporter.clone());
        let failing: Fetcher<Vec<i64>> =
            fetcher(|| async { Err(anyhow::anyhow!("store unavailable")) });

        run(
            vec![1_i64],
            vec![2_i64],
            failing.clone(),
            failing,
            config,
        )
        .await;

        assert!(reporter.lock().unwrap().is_empty());
    }
}
