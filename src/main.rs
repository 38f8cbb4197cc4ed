use probe_demo::{AppConfig, AppState, Error, Server, SystemMetrics, app};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logger();

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr();
    info!(
        app = %config.app_name,
        version = %config.app_version,
        disk_mount = %config.disk_mount.display(),
        metrics_timeout_ms = config.metrics_timeout_ms,
        "starting",
    );

    let router = app::router(AppState::new(config, SystemMetrics));
    Server::bind(&addr)?.serve(router).await
}

/// `RUST_LOG` wins; otherwise `info`.
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_line_number(true)
        .compact()
        .init();
}
