//! Logging and OpenTelemetry export.
//!
//! The fmt subscriber is always installed. Spans and metrics are shipped over
//! OTLP/gRPC only when [`Config::otlp_enabled`] is set.

use anyhow::Context;
use opentelemetry::{global, trace::TracerProvider};
use opentelemetry_otlp::{MetricExporter, SpanExporter};
use opentelemetry_sdk::{Resource, metrics::SdkMeterProvider, trace::SdkTracerProvider};
use tracing_subscriber::{
    EnvFilter, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::Config;

pub const SERVICE_NAME: &str = "records-service";

/// OTLP pipelines that must be flushed before exit.
pub struct Exporters {
    spans: SdkTracerProvider,
    metrics: SdkMeterProvider,
}

impl Exporters {
    fn connect() -> anyhow::Result<Self> {
        let resource = resource();

        let spans = SdkTracerProvider::builder()
            .with_batch_exporter(
                SpanExporter::builder()
                    .with_tonic()
                    .build()
                    .context("Failed to create OTLP span exporter")?,
            )
            .with_resource(resource.clone())
            .build();

        let metrics = SdkMeterProvider::builder()
            .with_periodic_exporter(
                MetricExporter::builder()
                    .with_tonic()
                    .build()
                    .context("Failed to create OTLP metric exporter")?,
            )
            .with_resource(resource)
            .build();

        // Counters in `AppState` are created from the global meter.
        global::set_meter_provider(metrics.clone());

        Ok(Self { spans, metrics })
    }

    pub fn shutdown(self) {
        if let Err(error) = self.spans.shutdown() {
            tracing::warn!(%error, "failed to flush spans");
        }
        if let Err(error) = self.metrics.shutdown() {
            tracing::warn!(%error, "failed to flush metrics");
        }
    }
}

fn resource() -> Resource {
    Resource::builder().with_service_name(SERVICE_NAME).build()
}

/// Install the global subscriber. The caller owns the returned exporters and
/// shuts them down on exit.
pub fn init_telemetry(config: &Config) -> anyhow::Result<Option<Exporters>> {
    let exporters = if config.otlp_enabled {
        Some(Exporters::connect()?)
    } else {
        None
    };

    let otel_layer = exporters
        .as_ref()
        .map(|e| tracing_opentelemetry::layer().with_tracer(e.spans.tracer(SERVICE_NAME)));
    let fmt_layer = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(exporters)
}
