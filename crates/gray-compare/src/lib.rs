//! Gray-release verification harness.
//!
//! During a migration from an old code path to a new one, [`gray`] runs both
//! paths, returns the result of whichever is currently authoritative, and
//! asynchronously verifies the two results are equivalent — without blocking
//! or risking the caller's critical path on the verification work.
//!
//! The caller supplies the pools, both fetchers, an equivalence predicate,
//! and (for list- or scalar-shaped results) a key extractor; the harness
//! coordinates the dual dispatch, diffs the pair out-of-band with bounded
//! retries, and hands the outcome to the configured [`Reporter`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use gray_compare::{gray, fetcher, CompareConfig, LogReporter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = tokio::runtime::Handle::current();
//! let config = Arc::new(
//!     CompareConfig::builder()
//!         .old_query_pool(pool.clone())
//!         .new_query_pool(pool.clone())
//!         .cmp_pool(pool)
//!         .switch_to_cmp(true)
//!         .business_flag("orders-migration")
//!         .key_extractor(|v: &i64| v.to_string())
//!         .equivalence(|a: &i64, b: &i64| a == b)
//!         .reporter(LogReporter)
//!         .build()?,
//! );
//!
//! let orders = gray(
//!     fetcher(|| async { Ok(vec![100_i64, 200, 300]) }),
//!     fetcher(|| async { Ok(vec![100_i64, 200, 300]) }),
//!     config,
//! )
//! .await?;
//! assert_eq!(orders, vec![100, 200, 300]);
//! # Ok(())
//! # }
//! ```

mod compare;
pub mod config;
mod correlation;
pub mod diff;
pub mod error;
pub mod gray;
pub mod report;

pub use config::{
    CompareConfig, CompareConfigBuilder, CompareSettings, Equivalence, KeyExtractor,
};
pub use diff::{diff, DiffEntry, DiffResult, Diffable};
pub use error::{ConfigError, DiffError, QueryError};
pub use gray::{fetcher, gray, BoxFuture, Fetcher};
pub use report::{LogReporter, Reporter};
