//! Tracing subscriber setup, optionally exporting to an OTLP collector.
//!
//! Without an endpoint only the fmt layer is installed. With one, spans,
//! metrics and log events are also shipped over gRPC.

pub mod metrics;
pub mod worker;

use crate::error::{Error, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, MetricExporter, SpanExporter, WithExportConfig as _};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const TRACER_NAME: &str = "crawl-frontier";

pub struct TelemetryConfig {
    /// OTLP gRPC endpoint, e.g. "http://localhost:4317".
    pub endpoint: Option<String>,
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Keeps the export pipelines alive. Dropping it flushes and shuts them down.
pub struct TelemetryGuard {
    pipeline: Option<OtlpPipeline>,
}

impl TelemetryGuard {
    pub fn force_flush(&self) {
        if let Some(pipeline) = &self.pipeline {
            pipeline.force_flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.shutdown();
        }
    }
}

/// One provider per signal, all pointed at the same collector.
struct OtlpPipeline {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    logger: SdkLoggerProvider,
}

impl OtlpPipeline {
    fn build(endpoint: &str, service_name: String) -> Result<Self> {
        let resource = Resource::builder().with_service_name(service_name).build();

        let spans = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(exporter_error("span"))?;
        let metrics = MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(exporter_error("metric"))?;
        let logs = LogExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(exporter_error("log"))?;

        let tracer = SdkTracerProvider::builder()
            .with_batch_exporter(spans)
            .with_resource(resource.clone())
            .build();
        let meter = SdkMeterProvider::builder()
            .with_periodic_exporter(metrics)
            .with_resource(resource.clone())
            .build();
        let logger = SdkLoggerProvider::builder()
            .with_batch_exporter(logs)
            .with_resource(resource)
            .build();

        // Instruments in `metrics` resolve through the global provider.
        opentelemetry::global::set_meter_provider(meter.clone());

        Ok(Self {
            tracer,
            meter,
            logger,
        })
    }

    fn force_flush(&self) {
        let _ = self.tracer.force_flush();
        let _ = self.meter.force_flush();
        let _ = self.logger.force_flush();
    }

    fn shutdown(self) {
        let _ = self.logger.shutdown();
        let _ = self.meter.shutdown();
        let _ = self.tracer.shutdown();
    }
}

fn exporter_error<E: std::fmt::Display>(signal: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Other(format!("failed to create OTLP {signal} exporter: {e}"))
}

/// Install the global tracing subscriber.
///
/// Hold the returned guard until exit. Fails if an exporter cannot be built
/// or a global subscriber is already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let pipeline = config
        .endpoint
        .as_deref()
        .map(|endpoint| OtlpPipeline::build(endpoint, config.service_name.clone()))
        .transpose()?;
    let trace_layer = pipeline
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer.tracer(TRACER_NAME)));
    let log_layer = pipeline
        .as_ref()
        .map(|p| OpenTelemetryTracingBridge::new(&p.logger));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(trace_layer)
        .with(log_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))?;

    Ok(TelemetryGuard { pipeline })
}
