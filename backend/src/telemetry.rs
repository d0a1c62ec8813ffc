//! Telemetry initialization: tracing subscriber with optional OpenTelemetry export.
//!
//! Logs go to stdout, human-readable by default or one JSON object per line
//! when `LOG_FORMAT=json`. When `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are
//! also exported over OTLP.

use tracing::Subscriber;
use tracing_subscriber::{
    layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::Config;
use crate::error::{AppError, Result};

const DEFAULT_FILTER: &str = "tier1_analytics_backend=debug,tower_http=debug,sqlx::query=info";

/// Initialize the global tracing subscriber from configuration.
///
/// The returned guard, if any, must be held for the lifetime of the
/// application so pending spans are flushed on shutdown.
pub fn init_tracing(config: &Config) -> Result<Option<OtelGuard>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let json = config.log_format.eq_ignore_ascii_case("json");

    match config.otel_endpoint.as_deref() {
        Some(endpoint) => {
            let guard = init_with_otel(endpoint, &config.otel_service_name, env_filter, json)?;
            tracing::info!(
                otel_endpoint = endpoint,
                service_name = %config.otel_service_name,
                "OpenTelemetry tracing enabled"
            );
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer(json))
                .try_init()
                .map_err(|e| AppError::Internal(format!("Failed to init tracing: {}", e)))?;
            Ok(None)
        }
    }
}

fn fmt_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    }
}

/// Shuts down the OTel tracer provider on drop, flushing pending spans.
pub struct OtelGuard {
    provider: opentelemetry_sdk::trace::SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("Failed to shutdown OTel tracer provider: {e:?}");
        }
    }
}

fn init_with_otel(
    endpoint: &str,
    service_name: &str,
    env_filter: EnvFilter,
    json: bool,
) -> Result<OtelGuard> {
    use opentelemetry::trace::TracerProvider;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::{SpanExporter, WithExportConfig};
    use opentelemetry_sdk::trace::{BatchSpanProcessor, SdkTracerProvider};
    use opentelemetry_sdk::Resource;

    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create OTLP span exporter: {}", e)))?;

    let resource = Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", service_name.to_owned()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION").to_owned()),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .build();

    let tracer = provider.tracer("tier1-analytics");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer(json))
        .with(otel_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to init tracing: {}", e)))?;

    Ok(OtelGuard { provider })
}
