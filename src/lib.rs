//! # crawl-frontier
//!
//! Crawl frontier shared by many worker processes through one Redis
//! instance.
//!
//! Provides work queues with FIFO, LIFO and priority ordering, a Bloom
//! filter for URL dedup, pluggable work item codecs, and OpenTelemetry
//! observability.

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod frontier;
pub mod model;
pub mod queue;
pub mod store;
pub mod telemetry;
