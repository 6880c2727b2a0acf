use std::path::{Path, PathBuf};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::SheetsError;

/// OAuth scopes requested for every token.
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.file";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// The fields of a Google service-account key file that token exchange needs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// JWT claims of a service-account token request.
#[derive(Debug, Serialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccount {
    pub fn from_json(text: &str) -> Result<Self, SheetsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Inline JSON if the value looks like an object, otherwise a file path.
    pub fn load(source: &str) -> Result<Self, SheetsError> {
        let source = source.trim();
        if source.starts_with('{') {
            return Self::from_json(source);
        }
        let path = Path::new(source);
        let text = std::fs::read_to_string(path).map_err(|e| SheetsError::CredentialsFile {
            path: PathBuf::from(path),
            source: e,
        })?;
        Self::from_json(&text)
    }

    pub fn claims(&self, issued_at: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: self.token_uri.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        }
    }

    /// RS256-signed assertion for the JWT bearer grant.
    pub fn assertion(&self, issued_at: i64) -> Result<String, SheetsError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &self.claims(issued_at),
            &key,
        )?)
    }
}
