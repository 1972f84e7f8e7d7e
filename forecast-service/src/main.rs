use common::tracing::init_from_env;
use forecast_service::config::Config;
use forecast_service::handlers::{self, AppState};
use forecast_service::providers::ProviderRegistry;
use forecast_service::services::LookupContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_from_env();

    let config = Config::from_env().inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    let providers = Arc::new(ProviderRegistry::from_config(&config)?);
    let context = LookupContext::in_memory(config.request_timeout);

    let app = handlers::router(AppState { providers, context });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Forecast service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Forecast service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    warn!("Draining in-flight requests before exit");
}
