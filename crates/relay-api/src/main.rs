//! 신호 릴레이 서버.
//!
//! 설정을 로드하고 텔레그램 게이트웨이를 구성한 뒤 웹훅 서버를 시작합니다.

use std::sync::Arc;

use relay_api::{create_app, setup_metrics_recorder, AppState};
use relay_core::{init_logging, LogConfig, RelaySettings};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // .env는 없어도 된다
    let _ = dotenvy::dotenv();

    init_logging(LogConfig::from_env())?;

    let settings = RelaySettings::load()?;
    let addr = settings.socket_addr()?;

    let metrics_handle = setup_metrics_recorder()?;
    let state = Arc::new(AppState::from_settings(&settings)?);

    if settings.cors_origins.is_none() {
        warn!("CORS_ORIGINS not set, allowing any origin");
    }
    let app = create_app(state.clone(), Some(metrics_handle), settings.cors_origins.as_deref());

    info!(%addr, profiles = ?state.profile_names(), "Signal relay listening");
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        open_signals = state.registry.len().await,
        "Server stopped gracefully"
    );
    Ok(())
}

/// Ctrl+C 또는 SIGTERM을 기다립니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
