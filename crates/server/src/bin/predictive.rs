use anyhow::Context;
use insight_core::Settings;
use insight_server::{predictive_router, serve, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    telemetry::init_subscriber("predictive", &settings.log_filter)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting predictive");

    let state = AppState::from_settings(settings.clone()).context("preparing data directory")?;
    serve(&settings, predictive_router(state)).await
}
