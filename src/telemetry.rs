use std::sync::Mutex;
use std::time::Instant;

use once_cell::sync::Lazy;
use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Request, Response,
    fairing::{Fairing, Info, Kind},
};
use tonic::metadata::MetadataMap;
use tracing::{Span, info_span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const OTLP_ENDPOINT_VAR: &str = "OTLP_ENDPOINT";
pub const OTLP_API_KEY_VAR: &str = "OTLP_API_KEY";

static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

pub struct TelemetryFairing;

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request telemetry",
            kind: Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let method = request.method().to_string();
        let path = request.uri().path().to_string();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, path),
            http.method = method,
            http.uri = request.uri().to_string(),
            http.status_code = tracing::field::Empty,
            http.duration_ms = tracing::field::Empty,
        );

        request.local_cache(|| RequestTiming {
            span,
            started: Instant::now(),
        });
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let timing = request.local_cache(|| RequestTiming {
            span: info_span!("http_request"),
            started: Instant::now(),
        });

        let elapsed_ms = timing.started.elapsed().as_millis() as i64;
        let status = response.status().code;

        timing.span.record("http.status_code", status);
        timing.span.record("http.duration_ms", elapsed_ms);

        let _entered = timing.span.enter();
        if status >= 500 {
            tracing::error!("Completed request in {}ms with status {}", elapsed_ms, status);
        } else if status >= 400 {
            tracing::warn!("Completed request in {}ms with status {}", elapsed_ms, status);
        } else {
            tracing::info!("Completed request in {}ms with status {}", elapsed_ms, status);
        }
    }

    async fn on_shutdown(&self, _rocket: &rocket::Rocket<rocket::Orbit>) {
        shutdown_telemetry();
    }
}

struct RequestTiming {
    span: Span,
    started: Instant,
}

fn resource() -> Resource {
    let environment =
        std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment),
            ],
            SCHEMA_URL,
        )
        .build()
}

fn init_tracer_provider(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let mut metadata = MetadataMap::new();
    if let Ok(api_key) = std::env::var(OTLP_API_KEY_VAR) {
        metadata.insert("x-honeycomb-team", api_key.parse()?);
    }

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots())
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build())
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`), a
/// fmt layer, and span export over OTLP when `OTLP_ENDPOINT` is set.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let tracer_provider = match std::env::var(OTLP_ENDPOINT_VAR) {
        Ok(endpoint) => match init_tracer_provider(&endpoint) {
            Ok(provider) => Some(provider),
            Err(err) => {
                eprintln!("OTLP exporter disabled: {:#}", err);
                None
            }
        },
        Err(_) => None,
    };

    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer("laptime-tracker")));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init();

    if let Err(err) = installed {
        eprintln!("Tracing subscriber already installed: {}", err);
        return;
    }

    if let Some(tracer_provider) = tracer_provider {
        tracing::info!("Exporting traces over OTLP");
        if let Ok(mut guard) = TELEMETRY_GUARD.lock() {
            *guard = Some(OtelGuard { tracer_provider });
        }
    }
}

pub fn shutdown_telemetry() {
    let guard = match TELEMETRY_GUARD.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };

    if guard.is_some() {
        tracing::info!("Shutting down telemetry");
    }
    drop(guard);
}
