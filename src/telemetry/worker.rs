//! Worker loop span helpers.
//!
//! Provides span creation for consumers draining a frontier, and an event
//! for each item they pull.

use crate::model::WorkItem;
use tracing::Span;
use uuid::Uuid;

/// Start a span for one worker's consume loop.
///
/// The `frontier.items` field is declared empty and can be filled in when
/// the loop finishes.
pub fn start_worker_span(queue_key: &str, worker_id: &Uuid) -> Span {
    tracing::info_span!(
        "frontier.worker",
        "frontier.queue" = queue_key,
        "frontier.worker_id" = %worker_id,
        "frontier.items" = tracing::field::Empty,
    )
}

/// Record that the worker pulled `item`, as an event scoped to `span`.
pub fn record_item(span: &Span, item: &WorkItem) {
    span.in_scope(|| {
        tracing::info!(
            url = %item.url,
            method = %item.method,
            priority = item.priority,
            callback = item.callback.as_deref().unwrap_or("-"),
            "work_item"
        );
    });
}

/// Fill in the item count once the loop ends.
pub fn record_items_processed(span: &Span, count: u64) {
    span.record("frontier.items", count);
}
