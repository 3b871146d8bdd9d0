//! Integration tests for telemetry initialization and span helpers.

use crawl_frontier::model::WorkItem;
use uuid::Uuid;

#[test]
fn telemetry_initializes_without_endpoint() {
    // Note: tracing subscriber can only be set once per process.
    // Using try_init() in the implementation avoids panics if another
    // test already initialized a subscriber.
    let config = crawl_frontier::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "crawl-frontier-test".to_string(),
        log_level: "debug".to_string(),
    };
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    let _guard = crawl_frontier::telemetry::init_telemetry(config);
}

#[test]
fn worker_span_creates_and_records_items() {
    let id = Uuid::new_v4();
    let span = crawl_frontier::telemetry::worker::start_worker_span("taptap:queue", &id);
    let item = WorkItem::new("http://example.com/").callback("parse");
    crawl_frontier::telemetry::worker::record_item(&span, &item);
    crawl_frontier::telemetry::worker::record_items_processed(&span, 1);
}

#[test]
fn metric_instruments_build_without_provider() {
    use opentelemetry::KeyValue;
    crawl_frontier::telemetry::metrics::queue_operations()
        .add(1, &[KeyValue::new("operation", "push")]);
    crawl_frontier::telemetry::metrics::pop_wait_ms().record(1.5, &[]);
}
