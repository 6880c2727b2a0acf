//! HTTP front-ends: the document-automation service and the predictive
//! analytics service. Both share settings, storage and telemetry.

pub mod error;
pub mod form;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use insight_core::Settings;
use tokio::signal;

pub use error::ApiError;
pub use state::AppState;

/// `/healthz`, `/v1/extract`, `/v1/admin/validate`
pub fn doc_automation_router(state: AppState) -> Router {
    let limit = state.settings.max_upload_bytes;
    let router = Router::new()
        .route("/healthz", get(routes::health::health_check))
        .route("/v1/extract", post(routes::extract::extract))
        .route("/v1/admin/validate", post(routes::admin::validate))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state);
    telemetry::with_http_layers(router)
}

/// `/healthz`, `/v1/forecast`, `/v1/churn`
pub fn predictive_router(state: AppState) -> Router {
    let limit = state.settings.max_upload_bytes;
    let router = Router::new()
        .route("/healthz", get(routes::health::health_check))
        .route("/v1/forecast", post(routes::forecast::forecast))
        .route("/v1/churn", post(routes::churn::churn))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state);
    telemetry::with_http_layers(router)
}

/// Bind `settings.bind_addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve(settings: &Settings, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "could not listen for Ctrl+C");
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
                tracing::error!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
