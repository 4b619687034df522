//! Minimal gRPC server exposing only `grpc.health.v1.Health`.
//!
//! Useful as a health-check target and as a smoke test of the bootstrap library:
//!
//! ```text
//! SERVICE_PORT=50051 cargo run -p grpc_health_server
//! grpcurl -plaintext localhost:50051 grpc.health.v1.Health/Check
//! ```

use std::future::Future;

use eyre::{Result, WrapErr};
use grpc_server::GrpcServer;
use tracing::{Span, info};

pub const SERVICE_NAME: &str = "grpc-health-server";

/// Boot the server from the environment and serve until `signal` resolves.
///
/// The `initialization` span is closed before serving starts.
pub async fn run<F>(signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let (init_span, server) = GrpcServer::init(SERVICE_NAME, env!("CARGO_PKG_VERSION"))
        .await
        .wrap_err("Failed to initialize gRPC server")?;

    info!(parent: &init_span, address = %server.local_addr(), "Initialization complete");
    drop(init_span);

    server
        .start_with_shutdown(&Span::current(), signal)
        .await
        .wrap_err("gRPC server failed")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_stops_on_signal() {
        // SERVICE_PORT is unset in the test environment, so any free port is used
        let result = run(async {}).await;
        assert!(result.is_ok(), "run failed: {result:?}");
    }
}
