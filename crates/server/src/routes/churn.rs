//! `POST /v1/churn`

use axum::{extract::Multipart, Json};
use insight_predict::{score_churn, ChurnScore, Table};
use serde::Serialize;

use crate::error::Result;
use crate::form::UploadForm;

#[derive(Debug, Serialize)]
pub struct ChurnResponse {
    pub results: Vec<ChurnScore>,
}

pub async fn churn(multipart: Multipart) -> Result<Json<ChurnResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.require_file()?;

    let results = tokio::task::spawn_blocking(move || -> Result<Vec<ChurnScore>> {
        let table = Table::from_upload(&upload.bytes, &upload.file_name)?;
        Ok(score_churn(&table)?)
    })
    .await??;

    Ok(Json(ChurnResponse { results }))
}
