//! End-to-end checks against a real listener on an ephemeral port.

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;

use core_config::Environment;
use grpc_server::{GrpcError, GrpcResult, GrpcServer, ServerConfig};
use opentelemetry::trace::{Tracer as _, TracerProvider as _};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::Code;
use tonic::body::Body;
use tonic::codegen::Service;
use tonic::server::NamedService;
use tonic::transport::Channel;
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;

/// A service that answers every call with UNIMPLEMENTED; only its name matters here.
#[derive(Clone)]
struct Echo;

impl NamedService for Echo {
    const NAME: &'static str = "test.v1.Echo";
}

impl Service<http::Request<Body>> for Echo {
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _request: http::Request<Body>) -> Self::Future {
        ready(Ok(tonic::Status::unimplemented("echo").into_http()))
    }
}

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<GrpcResult<()>>,
}

async fn boot() -> Running {
    let config = ServerConfig::new().with_host("127.0.0.1").with_port(0);
    let (init_span, mut server) =
        GrpcServer::init_with_config("health-test", "0.0.0", &Environment::Development, config)
            .await
            .expect("server should bind an ephemeral port");
    server.register_service(Echo);

    let addr = server.local_addr();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .start_with_shutdown(&init_span, async {
                let _ = stopped.await;
            })
            .await
    });

    Running { addr, stop, handle }
}

async fn client(addr: SocketAddr) -> HealthClient<Channel> {
    let channel = Channel::from_shared(format!("http://{addr}"))
        .expect("address should be a valid URI")
        .connect()
        .await
        .expect("client should connect");
    HealthClient::new(channel)
}

async fn status_of(health: &mut HealthClient<Channel>, service: &str) -> ServingStatus {
    health
        .check(HealthCheckRequest {
            service: service.to_string(),
        })
        .await
        .expect("health check should succeed")
        .into_inner()
        .status()
}

/// Read watch updates until `expected` arrives.
async fn wait_for_status(
    updates: &mut tonic::Streaming<tonic_health::pb::HealthCheckResponse>,
    expected: ServingStatus,
) {
    let wait = async {
        while let Some(update) = updates.message().await.expect("watch stream should stay open") {
            if update.status() == expected {
                return;
            }
        }
        panic!("watch stream ended before reaching {expected:?}");
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {expected:?}"));
}

#[tokio::test]
async fn test_listener_bound_before_start() {
    let running = boot().await;
    assert_ne!(running.addr.port(), 0);
    assert!(running.addr.ip().is_loopback());

    // A plain TCP connect succeeds against the bound port
    tokio::net::TcpStream::connect(running.addr)
        .await
        .expect("port should accept connections");

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_health_reports_serving_for_empty_service() {
    let running = boot().await;
    let mut health = client(running.addr).await;

    assert_eq!(status_of(&mut health, "").await, ServingStatus::Serving);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_registered_service_reports_serving() {
    let running = boot().await;
    let mut health = client(running.addr).await;

    assert_eq!(status_of(&mut health, Echo::NAME).await, ServingStatus::Serving);
    assert_eq!(status_of(&mut health, "").await, ServingStatus::Serving);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_flips_health_to_not_serving() {
    let running = boot().await;
    let mut health = client(running.addr).await;

    let mut overall = health
        .watch(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .unwrap()
        .into_inner();
    let mut echo = health
        .watch(HealthCheckRequest {
            service: Echo::NAME.to_string(),
        })
        .await
        .unwrap()
        .into_inner();

    wait_for_status(&mut overall, ServingStatus::Serving).await;
    wait_for_status(&mut echo, ServingStatus::Serving).await;

    running.stop.send(()).unwrap();

    wait_for_status(&mut overall, ServingStatus::NotServing).await;
    wait_for_status(&mut echo, ServingStatus::NotServing).await;

    // Close the open watch streams so the graceful drain can finish
    drop(overall);
    drop(echo);
    drop(health);
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_health_unknown_service_is_not_found() {
    let running = boot().await;
    let mut health = client(running.addr).await;

    let status = health
        .check(HealthCheckRequest {
            service: "does.not.Exist".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    running.stop.send(()).unwrap();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_graceful_shutdown_returns_ok_and_releases_port() {
    let running = boot().await;
    running.stop.send(()).unwrap();

    let result = running.handle.await.expect("server task should not panic");
    assert!(result.is_ok());

    // Once serving ends the port can be bound again
    tokio::net::TcpListener::bind(running.addr)
        .await
        .expect("port should be released after shutdown");
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let config = ServerConfig::new().with_host("127.0.0.1").with_port(port);
    let result =
        GrpcServer::init_with_config("bind-test", "0.0.0", &Environment::Development, config).await;

    match result {
        Err(GrpcError::Bind { addr, .. }) => assert_eq!(addr, format!("127.0.0.1:{port}")),
        Err(other) => panic!("expected bind error, got {other}"),
        Ok(_) => panic!("expected bind error, got a bound server"),
    }
}

#[tokio::test]
async fn test_tracer_provider_builder_reaches_server_telemetry() {
    let exporter = InMemorySpanExporter::default();
    let config = ServerConfig::new().with_host("127.0.0.1").with_port(0);
    let (_init_span, server) = GrpcServer::init_with_tracer_provider(
        "export-test",
        "0.0.0",
        &Environment::Development,
        config,
        SdkTracerProvider::builder().with_simple_exporter(exporter.clone()),
    )
    .await
    .expect("server should bind an ephemeral port");

    server
        .telemetry()
        .tracer_provider()
        .tracer("export-test")
        .in_span("warmup", |_cx| {});

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "warmup");
}
