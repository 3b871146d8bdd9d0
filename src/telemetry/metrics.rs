//! Metric instrument factories for crawl-frontier.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"crawl-frontier"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for crawl-frontier instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("crawl-frontier")
}

/// Counter: queue operations (push, pop, pop_empty, clear).
/// Labels: `queue`, `discipline`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("frontier.queue.operations")
        .with_description("Number of work queue operations")
        .build()
}

/// Counter: membership filter operations (insert, exists_hit, exists_miss).
/// Labels: `filter`, `operation`.
pub fn filter_operations() -> Counter<u64> {
    meter()
        .u64_counter("frontier.filter.operations")
        .with_description("Number of membership filter operations")
        .build()
}

/// Counter: items submitted to the frontier.
/// Labels: `result` ("queued" | "duplicate").
pub fn frontier_submitted() -> Counter<u64> {
    meter()
        .u64_counter("frontier.submitted")
        .with_description("Number of work items submitted to the frontier")
        .build()
}

/// Histogram: time a pop spent waiting, in milliseconds.
/// Labels: `discipline`.
pub fn pop_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("frontier.pop.wait_ms")
        .with_description("Time spent inside a queue pop")
        .with_unit("ms")
        .build()
}
