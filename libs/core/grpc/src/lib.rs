//! # gRPC Server Library
//!
//! Bootstraps a tonic gRPC server the same way for every service in the
//! monorepo: one TCP listener on `SERVICE_PORT`, the standard health service,
//! a tracing span per RPC, and an OpenTelemetry tracer provider behind the
//! `tracing` subscriber.
//!
//! ## Quick Start
//!
//! ```ignore
//! use grpc_server::{GrpcServer, shutdown_signal};
//! use rpc::tasks::tasks_service_server::TasksServiceServer;
//!
//! let (init_span, mut server) = GrpcServer::init("tasks", env!("CARGO_PKG_VERSION")).await?;
//! server.register_service(TasksServiceServer::new(my_impl));
//! drop(init_span);
//! server.start_with_shutdown(&Span::current(), shutdown_signal()).await?;
//! ```
//!
//! ## With Explicit Configuration
//!
//! ```ignore
//! use core_config::Environment;
//! use grpc_server::{GrpcServer, ServerConfig};
//! use std::time::Duration;
//!
//! let config = ServerConfig::new()
//!     .with_port(50051)
//!     .with_request_timeout(Duration::from_secs(30));
//!
//! let (init_span, server) =
//!     GrpcServer::init_with_config("tasks", "1.0.0", &Environment::Production, config).await?;
//! drop(init_span);
//! server.start(&Span::current()).await?;
//! ```
//!
//! ## Environment
//!
//! - `SERVICE_PORT`: port to bind (empty or unset: any free port)
//! - `SERVICE_HOST`: host to bind (default `0.0.0.0`)
//! - `APP_ENV`: `production` for JSON logs
//! - `RUST_LOG`: log filter
//!
//! A `.env` file is loaded first when present.
//!
//! Spans are exported only through a provider passed to
//! [`GrpcServer::init_with_tracer_provider`].

pub mod error;
pub mod health;
pub mod interceptors;
pub mod server;
pub mod telemetry;

// Re-export main types and functions for convenience
pub use error::{GrpcError, GrpcResult};
pub use health::HealthRegistry;
pub use interceptors::server_span;
pub use server::{GrpcServer, ServerConfig, shutdown_signal};
pub use telemetry::Telemetry;
