use eyre::Result;
use grpc_server::shutdown_signal;

#[tokio::main]
async fn main() -> Result<()> {
    core_config::tracing::install_color_eyre();
    grpc_health_server::run(shutdown_signal()).await
}
