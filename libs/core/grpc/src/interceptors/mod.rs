//! Server-side instrumentation hooks

pub mod tracing;

pub use self::tracing::{HeaderExtractor, server_span, split_path};
