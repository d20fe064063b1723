mod app_state;
mod config;
mod router;
mod routes;

use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app_state::AppState;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("Failed to read configuration: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Failed to serve: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diary_api=debug,tower_http=debug".into()),
        )
        .with(fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339()))
        .init();

    let settings = config::read_config()?;
    let app_state = AppState::from_settings(&settings);
    if app_state.configured().is_err() {
        tracing::warn!("Password or store not configured; every verification will fail with 500");
    }

    let app = router::create(app_state, &settings.application);

    let address = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = TcpListener::bind(&address).await?;
    info!(
        "Listening on {} (gate mode: {})",
        address, settings.gate.mode
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
