//! Reporting sink for comparison outcomes.
//!
//! The reporter is the only channel through which a caller observes
//! verification results. It is invoked at most once per comparison task,
//! from the compare pool, so implementations must be safe to call from a
//! different execution context than the original caller.

use serde::Serialize;

use crate::diff::DiffResult;

/// Receives the final diff of one comparison invocation.
pub trait Reporter<O>: Send + Sync {
    fn report(&self, business_flag: &str, result: &DiffResult<O>);
}

impl<O, F> Reporter<O> for F
where
    F: Fn(&str, &DiffResult<O>) + Send + Sync,
{
    fn report(&self, business_flag: &str, result: &DiffResult<O>) {
        self(business_flag, result);
    }
}

/// Default reporter: one structured log line per comparison.
pub struct LogReporter;

impl<O: Serialize> Reporter<O> for LogReporter {
    fn report(&self, business_flag: &str, result: &DiffResult<O>) {
        tracing::info!(
            business_flag = %business_flag,
            has_difference = result.has_difference(),
            result = %result,
            "Gray compare result"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_reporter_receives_flag_and_result() {
        let calls = AtomicUsize::new(0);
        let reporter = |flag: &str, result: &DiffResult<i64>| {
            assert_eq!(flag, "orders");
            assert!(!result.has_difference());
            calls.fetch_add(1, Ordering::Relaxed);
        };
        Reporter::report(&reporter, "orders", &DiffResult::new());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
