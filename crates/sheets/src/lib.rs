//! Best-effort Google Sheets sync for extracted records.

pub mod client;
pub mod credentials;
pub mod grid;

use std::path::PathBuf;
use thiserror::Error;

pub use client::{push_row, SheetsClient};
pub use credentials::ServiceAccount;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("Could not read credentials file {path}: {source}")]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid service account JSON: {0}")]
    Credentials(#[from] serde_json::Error),
    #[error("Could not sign token request: {0}")]
    Auth(#[from] jsonwebtoken::errors::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Invalid API URL: {0}")]
    Url(String),
    #[error("Key column '{0}' not found in header row")]
    MissingKeyColumn(String),
}
