//! The server bootstrap.
//!
//! `init` does everything that can fail early (telemetry, config, binding the
//! listener, health service); `start` only serves.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use core_config::{Environment, FromEnv};
use opentelemetry_sdk::trace::{SdkTracerProvider, TracerProviderBuilder};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::body::Body;
use tonic::codegen::Service;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tonic::transport::Server;
use tracing::{Instrument, Span, error, info, info_span, warn};

use super::config::ServerConfig;
use crate::error::{GrpcError, GrpcResult};
use crate::health::HealthRegistry;
use crate::interceptors::server_span;
use crate::telemetry::Telemetry;

/// A bound gRPC server with health checks and telemetry wired in.
///
/// # Example
///
/// ```ignore
/// use grpc_server::{GrpcServer, shutdown_signal};
/// use rpc::tasks::tasks_service_server::TasksServiceServer;
///
/// let (init_span, mut server) = GrpcServer::init("tasks", env!("CARGO_PKG_VERSION")).await?;
/// server.register_service(TasksServiceServer::new(my_impl));
/// drop(init_span);
///
/// server.start_with_shutdown(&Span::current(), shutdown_signal()).await?;
/// ```
pub struct GrpcServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    routes: RoutesBuilder,
    health: HealthRegistry,
    telemetry: Telemetry,
    config: ServerConfig,
}

impl GrpcServer {
    /// Bootstrap a server from the environment.
    ///
    /// Loads `.env` if present, then reads `APP_ENV` and the `SERVICE_*`
    /// variables (see [`ServerConfig`]). Returns the `initialization` span
    /// alongside the server; drop it once the caller's own setup is done.
    pub async fn init(service_name: &str, version: &str) -> GrpcResult<(Span, Self)> {
        core_config::load_dotenv();

        let environment = Environment::from_env();
        let config = ServerConfig::from_env()?;

        Self::init_with_config(service_name, version, &environment, config).await
    }

    /// Bootstrap a server from an explicit configuration.
    pub async fn init_with_config(
        service_name: &str,
        version: &str,
        environment: &Environment,
        config: ServerConfig,
    ) -> GrpcResult<(Span, Self)> {
        Self::init_with_tracer_provider(
            service_name,
            version,
            environment,
            config,
            SdkTracerProvider::builder(),
        )
        .await
    }

    /// Bootstrap a server whose spans go to the exporters on `tracer_provider`.
    ///
    /// ```ignore
    /// let provider = SdkTracerProvider::builder().with_batch_exporter(exporter);
    /// let (init_span, server) =
    ///     GrpcServer::init_with_tracer_provider("tasks", "1.0.0", &env, config, provider).await?;
    /// ```
    pub async fn init_with_tracer_provider(
        service_name: &str,
        version: &str,
        environment: &Environment,
        config: ServerConfig,
        tracer_provider: TracerProviderBuilder,
    ) -> GrpcResult<(Span, Self)> {
        let telemetry =
            Telemetry::init_with_provider(service_name, version, environment, tracer_provider);

        let init_span = info_span!("initialization", service = service_name, version);
        let server = Self::bind(telemetry, config)
            .instrument(init_span.clone())
            .await?;

        Ok((init_span, server))
    }

    async fn bind(telemetry: Telemetry, config: ServerConfig) -> GrpcResult<Self> {
        let addr = config.addr_string();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(address = %addr, error = %source, "Failed to listen");
                return Err(GrpcError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr()?;

        let (health, health_service) = HealthRegistry::new().await;
        let mut routes = RoutesBuilder::default();
        routes.add_service(health_service);
        info!("Health check service enabled (grpc.health.v1.Health)");

        Ok(Self {
            listener,
            local_addr,
            routes,
            health,
            telemetry,
            config,
        })
    }

    /// Register a generated service implementation.
    ///
    /// The service's name is tracked by the health service and reported as
    /// `SERVING` once the server starts.
    pub fn register_service<S>(&mut self, svc: S) -> &mut Self
    where
        S: Service<http::Request<Body>, Response = http::Response<Body>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.routes.add_service(svc);
        self.health.track(S::NAME);
        info!(service = S::NAME, "Registered gRPC service");
        self
    }

    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until the transport fails.
    pub async fn start(self, parent: &Span) -> GrpcResult<()> {
        self.start_with_shutdown(parent, std::future::pending()).await
    }

    /// Serve until `signal` resolves, then shut down gracefully.
    ///
    /// On shutdown every health status flips to `NOT_SERVING` before in-flight
    /// requests are drained, and the tracer provider is flushed afterwards.
    pub async fn start_with_shutdown<F>(self, parent: &Span, signal: F) -> GrpcResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            listener,
            local_addr,
            routes,
            health,
            telemetry,
            config,
        } = self;

        let start_span = info_span!(parent: parent, "start");
        info!(parent: &start_span, address = %local_addr, "Listening");

        health.mark_all_serving().instrument(start_span.clone()).await;

        let mut server = Self::configure(&config);
        let draining_health = health.clone();
        let shutdown = async move {
            signal.await;
            info!("Shutdown signal received");
            draining_health.mark_all_not_serving().await;
        };

        let result = server
            .add_routes(routes.routes())
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .instrument(start_span)
            .await;

        {
            let _shutdown_span = info_span!(parent: parent, "shutdown").entered();
            if let Err(e) = telemetry.shutdown() {
                warn!(error = %e, "Failed to shutdown trace provider");
            }
        }

        match result {
            Ok(()) => {
                info!(address = %local_addr, "Server stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to serve");
                Err(GrpcError::Serve(e))
            }
        }
    }

    fn configure(config: &ServerConfig) -> Server {
        let mut server = Server::builder()
            .trace_fn(server_span)
            .http2_keepalive_interval(config.http2_keepalive_interval);

        if let Some(timeout) = config.request_timeout {
            server = server.timeout(timeout);
        }
        if let Some(limit) = config.concurrency_limit_per_connection {
            server = server.concurrency_limit_per_connection(limit);
        }

        server
    }
}
