//! Error types for configuration, query orchestration, and diffing.
//!
//! The split mirrors the propagation policy: [`QueryError`] is the only type
//! a caller of [`gray`](crate::gray) ever sees, and it only ever carries a
//! primary-path failure. [`DiffError`] stays inside the comparison task,
//! where it is logged and swallowed.

use std::time::Duration;

use thiserror::Error;

/// Validation failures raised by [`CompareConfigBuilder::build`](crate::CompareConfigBuilder::build).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required collaborator was never supplied to the builder.
    #[error("{0} must be configured")]
    Missing(&'static str),

    /// The business flag is required for reporting and log tagging.
    #[error("business_flag must not be empty")]
    EmptyBusinessFlag,

    /// Timeouts, the retry sleep, and the attempt limit must all be
    /// strictly positive.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Primary-path failure returned by [`gray`](crate::gray).
///
/// Shadow-path failures never surface here — they are logged and comparison
/// is skipped for that invocation.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The fetcher itself returned an error.
    #[error("query failed: {0:#}")]
    Fetch(anyhow::Error),

    /// The query did not complete within its configured wait.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// The spawned query task panicked or was aborted.
    #[error("query task failed: {0}")]
    Join(#[source] tokio::task::JoinError),
}

/// Misuse of the diff engine detected during shape normalization.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The input shape needs a key extractor and none was configured.
    #[error("key extractor is required for {0} inputs")]
    MissingKeyExtractor(&'static str),

    /// The key extractor produced the same key for two elements on one
    /// side. Fail fast instead of silently dropping data.
    #[error("duplicate key {0:?} within one side of a list comparison")]
    DuplicateKey(String),
}
