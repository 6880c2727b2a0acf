use anyhow::Context;
use insight_core::Settings;
use insight_server::{doc_automation_router, serve, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    telemetry::init_subscriber("doc-automation", &settings.log_filter)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting doc-automation");

    let state = AppState::from_settings(settings.clone()).context("preparing data directory")?;
    serve(&settings, doc_automation_router(state)).await
}
