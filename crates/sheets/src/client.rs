use insight_core::Settings;
use reqwest::{Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::credentials::ServiceAccount;
use crate::grid::{cell_ref, column_letter, plan_upsert, quote_sheet};
use crate::SheetsError;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Google Sheets v4 client authenticated as a service account.
pub struct SheetsClient {
    http: reqwest::Client,
    account: ServiceAccount,
    api_base: String,
}

impl SheetsClient {
    pub fn new(account: ServiceAccount) -> Self {
        Self {
            http: reqwest::Client::new(),
            account,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// `None` when no credentials are configured.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, SheetsError> {
        match settings.google_sheets_creds_json.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => {
                Ok(Some(Self::new(ServiceAccount::load(source)?)))
            }
            _ => Ok(None),
        }
    }

    /// Exchange a freshly signed assertion for an access token.
    async fn access_token(&self) -> Result<String, SheetsError> {
        let assertion = self.account.assertion(chrono::Utc::now().timestamp())?;
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = check(response).await?.json().await?;
        Ok(token.access_token)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| SheetsError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Url(self.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Append one row after the last used row of `worksheet`.
    pub async fn append_row(
        &self,
        sheet_id: &str,
        worksheet: &str,
        row: &[String],
    ) -> Result<bool, SheetsError> {
        let range = format!("{}!A1:append", quote_sheet(worksheet));
        let url = self.url(&[sheet_id, "values", &range])?;
        let token = self.access_token().await?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("valueInputOption", "USER_ENTERED"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        check(response).await?;
        tracing::debug!(sheet_id, worksheet, cells = row.len(), "row appended");
        Ok(true)
    }

    /// Write `data` into the row keyed by `key_val` in column `key_col`,
    /// adding the row and any missing header columns.
    pub async fn upsert_by_key(
        &self,
        sheet_id: &str,
        worksheet: &str,
        key_col: &str,
        key_val: &str,
        data: &[(String, String)],
    ) -> Result<bool, SheetsError> {
        let token = self.access_token().await?;

        let url = self.url(&[sheet_id, "values", &quote_sheet(worksheet)])?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;
        let current: ValueRange = check(response).await?.json().await?;
        let rows: Vec<Vec<String>> = current
            .values
            .iter()
            .map(|r| r.iter().map(cell_text).collect())
            .collect();

        let plan = plan_upsert(&rows, key_col, key_val, data)?;

        let mut updates = Vec::with_capacity(plan.cells.len() + 1);
        if plan.header_changed {
            let end = column_letter(plan.header.len() - 1);
            updates.push(json!({
                "range": format!("{}!A1:{end}1", quote_sheet(worksheet)),
                "values": [plan.header],
            }));
        }
        for (col, value) in &plan.cells {
            updates.push(json!({
                "range": cell_ref(worksheet, *col, plan.row),
                "values": [[value]],
            }));
        }

        let url = self.url(&[sheet_id, "values:batchUpdate"])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(&json!({ "valueInputOption": "USER_ENTERED", "data": updates }))
            .send()
            .await?;
        check(response).await?;
        tracing::debug!(sheet_id, worksheet, row = plan.row, "row upserted");
        Ok(true)
    }
}

/// Append a row if a client is configured; `Ok(false)` otherwise.
pub async fn push_row(
    client: Option<&SheetsClient>,
    sheet_id: &str,
    worksheet: &str,
    row: &[String],
) -> Result<bool, SheetsError> {
    match client {
        Some(client) => client.append_row(sheet_id, worksheet, row).await,
        None => Ok(false),
    }
}

async fn check(response: Response) -> Result<Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetsError::Api {
        status: status.as_u16(),
        body,
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
