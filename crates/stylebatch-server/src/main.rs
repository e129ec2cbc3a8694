//! # Stylebatch Server
//!
//! Entry point: loads configuration, installs logging, builds the
//! composition root and serves until Ctrl+C or SIGTERM.

use stylebatch_config::ConfigLoader;
use stylebatch_core::{
    telemetry::{init_telemetry, shutdown_telemetry},
    BatchResult,
};
use stylebatch_server::{app::Application, startup::print_startup_info};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("stylebatch-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> BatchResult<()> {
    let config = ConfigLoader::from_default_location()?.into_config();

    init_telemetry(&config.observability.telemetry(&config.app.name))?;

    info!("Starting Stylebatch Server...");
    info!("Version: {}", config.app.version);
    info!("Environment: {}", config.app.environment);

    let app = Application::build(config.clone()).await?;
    print_startup_info(&config);

    let result = app.run(shutdown_signal()).await;

    shutdown_telemetry();
    info!("Server shutdown complete");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
