//! Metrics definitions for the catalog.
//!
//! This module defines all metrics used throughout the service.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "pages_served_total",
        "Total number of list pages returned by the catalog"
    );
    describe_counter!(
        "entity_mutations_total",
        "Total number of successful create/update/delete operations"
    );
    describe_counter!(
        "store_errors_total",
        "Total number of store failures surfaced to callers"
    );
    describe_histogram!(
        "page_query_duration_seconds",
        "Time taken to fetch one list page in seconds"
    );
}

/// Record a page returned to a caller.
///
/// # Arguments
/// * `kind` - Entity kind ("category" or "tag")
/// * `last` - Whether the page ended the collection
pub fn record_page_served(kind: &str, last: bool) {
    counter!("pages_served_total", "kind" => kind.to_string(), "last" => last.to_string())
        .increment(1);
}

/// Record a successful mutation.
///
/// # Arguments
/// * `kind` - Entity kind, or "profile"
/// * `op` - Operation name ("create", "update", "delete")
pub fn record_mutation(kind: &str, op: &str) {
    counter!("entity_mutations_total", "kind" => kind.to_string(), "op" => op.to_string())
        .increment(1);
}

/// Record a store failure.
pub fn record_store_error(code: &str) {
    counter!("store_errors_total", "code" => code.to_string()).increment(1);
}

/// A timer that records page query duration when dropped.
pub struct QueryTimer {
    kind: &'static str,
    start: Instant,
}

impl QueryTimer {
    /// Start a new timer for a page query on `kind`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        histogram!("page_query_duration_seconds", "kind" => self.kind).record(duration);
    }
}
