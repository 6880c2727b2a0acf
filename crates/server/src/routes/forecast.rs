//! `POST /v1/forecast`

use axum::{extract::Multipart, Json};
use insight_predict::{forecast_table, Forecast, ForecastRequest, Frequency, Table};

use crate::error::Result;
use crate::form::UploadForm;

pub async fn forecast(multipart: Multipart) -> Result<Json<Forecast>> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.require_file()?;

    let defaults = ForecastRequest::default();
    let horizon = form.parse("horizon", defaults.horizon)?;
    let freq = match form.text("freq").map(str::trim) {
        None | Some("") => defaults.freq,
        Some(raw) => raw.parse::<Frequency>()?,
    };
    if let Some(model) = form.text("model") {
        tracing::debug!(model, "model selection is ignored; using seasonal ARIMA");
    }
    let request = ForecastRequest { horizon, freq };

    let forecast = tokio::task::spawn_blocking(move || -> Result<Forecast> {
        let table = Table::from_upload(&upload.bytes, &upload.file_name)?;
        Ok(forecast_table(&table, &request)?)
    })
    .await??;

    Ok(Json(forecast))
}
