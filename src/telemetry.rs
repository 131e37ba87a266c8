use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::AppConfig;

const DEFAULT_FILTER: &str = "info,tours=debug,tower_http=debug,sqlx=warn";

/// Keeps the span exporter alive until `shutdown`.
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    /// Flushes pending spans.
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "failed to flush spans");
            }
        }
    }
}

fn tracer_provider(config: &AppConfig) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
    let resource = Resource::builder_empty()
        .with_attribute(KeyValue::new(SERVICE_NAME, config.telemetry_service_name.clone()))
        .with_attribute(KeyValue::new(
            SERVICE_VERSION,
            config.telemetry_service_version.clone(),
        ))
        .with_attribute(KeyValue::new(
            "deployment.environment.name",
            config.environment.as_str(),
        ))
        .build();

    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.telemetry_otlp_endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Installs the global subscriber. Development logs are pretty-printed,
/// production logs are JSON; OTLP spans are exported when enabled.
pub fn init(config: &AppConfig) -> Telemetry {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = if config.environment.is_development() {
        fmt::layer().pretty().boxed()
    } else {
        fmt::layer().json().boxed()
    };

    let (provider, exporter_error) = if config.telemetry_enabled {
        match tracer_provider(config) {
            Ok(provider) => (Some(provider), None),
            Err(e) => (None, Some(e)),
        }
    } else {
        (None, None)
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| OpenTelemetryLayer::new(p.tracer(config.telemetry_service_name.clone())));

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .with(otel_layer)
        .init();

    if let Some(provider) = &provider {
        opentelemetry::global::set_tracer_provider(provider.clone());
        tracing::info!(
            service = %config.telemetry_service_name,
            endpoint = %config.telemetry_otlp_endpoint,
            "OpenTelemetry initialized"
        );
    }
    if let Some(e) = exporter_error {
        tracing::warn!(error = %e, "failed to initialize OpenTelemetry, logging only");
    }

    Telemetry { provider }
}
