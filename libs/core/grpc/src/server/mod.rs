//! gRPC Server Bootstrap
//!
//! Binds the listener, registers the standard health service, wires tracing
//! and telemetry, and serves whatever services the caller registers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use grpc_server::server::{GrpcServer, shutdown_signal};
//! use rpc::tasks::tasks_service_server::TasksServiceServer;
//!
//! // SERVICE_PORT=50051
//! let (init_span, mut server) = GrpcServer::init("tasks", "1.0.0").await?;
//! server.register_service(TasksServiceServer::new(my_impl));
//! drop(init_span);
//!
//! server.start_with_shutdown(&Span::current(), shutdown_signal()).await?;
//! ```

mod builder;
mod config;
mod signal;

pub use builder::GrpcServer;
pub use config::ServerConfig;
pub use signal::shutdown_signal;
