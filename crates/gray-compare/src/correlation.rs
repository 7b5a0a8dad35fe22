//! Correlation ID generation for invocation tracing.
//!
//! Every call to [`gray`](crate::gray) gets one ID, attached to the spans of
//! the primary query, the shadow query, and the comparison task so a single
//! invocation's log lines can be grepped together across pools.

use uuid::Uuid;

/// Generate a new correlation ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
