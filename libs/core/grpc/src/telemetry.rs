//! Logger and tracer provider wiring.
//!
//! [`Telemetry::init_with_provider`] finishes a caller-supplied
//! `TracerProviderBuilder` (which carries the span processors and exporters)
//! with a resource tagged by service name and version, and installs the
//! `tracing` subscriber with an OpenTelemetry bridge layer. From then on every
//! `tracing` span is also an OpenTelemetry span, and log events carry the
//! active span context.
//!
//! [`Telemetry::init`] is the same with a bare builder: spans are created
//! and propagated but not exported.

use core_config::Environment;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracerProvider, TracerProviderBuilder};
use tracing::debug;

use crate::error::{GrpcError, GrpcResult};

/// Instrumentation scope name for spans created by this crate.
pub const TRACER_NAME: &str = "grpc-server";

/// Handle on the process telemetry.
#[derive(Clone)]
pub struct Telemetry {
    service_name: String,
    version: String,
    tracer_provider: SdkTracerProvider,
    bridges_tracing: bool,
}

impl Telemetry {
    /// Initialize logging and tracing for `service_name` without an exporter.
    pub fn init(service_name: &str, version: &str, environment: &Environment) -> Self {
        Self::init_with_provider(
            service_name,
            version,
            environment,
            SdkTracerProvider::builder(),
        )
    }

    /// Initialize logging and tracing from a provider builder.
    ///
    /// Attach exporters to `builder` before passing it in, e.g.
    /// `SdkTracerProvider::builder().with_batch_exporter(exporter)`. Its
    /// resource is replaced by one carrying `service.name` and
    /// `service.version`.
    ///
    /// Only the first call in a process installs the subscriber; that call's
    /// provider becomes the global one and backs every `tracing` span. Later
    /// calls return a standalone provider (see [`Telemetry::bridges_tracing`]).
    pub fn init_with_provider(
        service_name: &str,
        version: &str,
        environment: &Environment,
        builder: TracerProviderBuilder,
    ) -> Self {
        let resource = Resource::builder()
            .with_service_name(service_name.to_string())
            .with_attribute(KeyValue::new("service.version", version.to_string()))
            .build();

        let tracer_provider = builder.with_resource(resource).build();

        let tracer = tracer_provider.tracer(TRACER_NAME);
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        let bridges_tracing = core_config::tracing::init_tracing(environment, otel_layer);
        if bridges_tracing {
            global::set_text_map_propagator(TraceContextPropagator::new());
            global::set_tracer_provider(tracer_provider.clone());
        }
        debug!(
            service = service_name,
            version,
            bridges_tracing,
            "Telemetry initialized"
        );

        Self {
            service_name: service_name.to_string(),
            version: version.to_string(),
            tracer_provider,
            bridges_tracing,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The tracer provider built for this service.
    ///
    /// `tracing` spans only reach it when [`Telemetry::bridges_tracing`] is true.
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    /// Whether this provider is the one behind the global subscriber.
    pub fn bridges_tracing(&self) -> bool {
        self.bridges_tracing
    }

    /// Flush pending spans and shut the tracer provider down.
    pub fn shutdown(&self) -> GrpcResult<()> {
        self.tracer_provider
            .shutdown()
            .map_err(|e| GrpcError::Telemetry(e.to_string()))
    }
}
