//! `POST /v1/extract`: OCR an upload, extract fields, persist CSV and JSON,
//! optionally append the values to a spreadsheet.

use std::path::Path;

use axum::{
    extract::{Multipart, State},
    Json,
};
use insight_ocr::{Field, FieldKey};
use insight_sheets::push_row;
use serde::Serialize;

use crate::error::Result;
use crate::form::{Upload, UploadForm};
use crate::state::AppState;

pub const SHEETS_WORKSHEET: &str = "Sheet1";

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub fields: Vec<Field>,
    pub summary: serde_json::Value,
    pub csv_path: String,
    pub json_path: String,
}

#[derive(Serialize)]
struct StoredField<'a> {
    key: FieldKey,
    val: Option<&'a str>,
    confidence: f32,
}

#[derive(Serialize)]
struct StoredExtraction<'a> {
    text: &'a str,
    fields: Vec<StoredField<'a>>,
}

pub async fn extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let Upload { file_name, bytes } = form.require_file()?;
    let push_to_sheets = form.flag("push_to_sheets")?;
    let use_cloud = form.flag("use_cloud")?;
    let sheet_id = form.text("sheet_id").map(str::trim).filter(|s| !s.is_empty());
    if use_cloud || form.text("schema_yaml").is_some() {
        tracing::debug!(use_cloud, "cloud OCR and custom schemas are not supported; ignoring");
    }

    let saved = state.storage.save_upload(&bytes, &file_name).await?;

    let pipeline = state.pipeline.clone();
    let locale = state.settings.default_locale.clone();
    let name = file_name.clone();
    let (ocr, extraction) =
        tokio::task::spawn_blocking(move || pipeline.process(&bytes, &name, None, &locale))
            .await??;

    let stem = saved
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let csv_path = state.storage.output_path(&format!("{stem}-extracted"), "csv");
    let json_path = state.storage.output_path(&format!("{stem}-extracted"), "json");

    let rows = extraction.fields.iter().map(|f| {
        [
            f.key.as_str().to_string(),
            f.value.clone().unwrap_or_default(),
            f.confidence.to_string(),
        ]
    });
    state
        .storage
        .write_csv(&csv_path, &["key", "val", "confidence"], rows)
        .await?;

    let stored = StoredExtraction {
        text: &ocr.text,
        fields: extraction
            .fields
            .iter()
            .map(|f| StoredField {
                key: f.key,
                val: f.value.as_deref(),
                confidence: f.confidence,
            })
            .collect(),
    };
    state.storage.write_json(&json_path, &stored).await?;

    if let (true, Some(sheet_id)) = (push_to_sheets, sheet_id) {
        let mut row = Vec::with_capacity(extraction.fields.len() + 1);
        row.push(file_name.clone());
        row.extend(extraction.fields.iter().map(|f| f.value.clone().unwrap_or_default()));
        if let Err(e) = push_row(state.sheets.as_deref(), sheet_id, SHEETS_WORKSHEET, &row).await {
            tracing::warn!(error = %e, sheet_id, "sheets_push_failed");
        }
    }

    tracing::info!(
        file = %file_name,
        pages = ocr.pages,
        fields = extraction.fields.len(),
        "document extracted"
    );

    Ok(Json(ExtractResponse {
        summary: ocr.summary(),
        text: ocr.text,
        fields: extraction.fields,
        csv_path: display(&csv_path),
        json_path: display(&json_path),
    }))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
