use core_config::ConfigError;
use thiserror::Error;

pub type GrpcResult<T> = Result<T, GrpcError>;

/// Errors that can occur while bootstrapping or running the gRPC server
#[derive(Error, Debug)]
pub enum GrpcError {
  /// Server configuration could not be loaded from the environment
  #[error("Invalid configuration: {0}")]
  Config(#[from] ConfigError),

  /// The TCP listener could not be bound
  #[error("Failed to listen on {addr}: {source}")]
  Bind {
    addr: String,
    #[source]
    source: std::io::Error,
  },

  /// The transport stopped with an error while serving
  #[error("Failed to serve: {0}")]
  Serve(#[from] tonic::transport::Error),

  /// The tracer provider could not be flushed or shut down
  #[error("Telemetry error: {0}")]
  Telemetry(String),

  /// Socket-level failure outside of bind (e.g. reading the local address)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}
