use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;

use crate::error::{ApiError, Result};

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart form drained into memory: the `file` part plus text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    file: Option<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "file" {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                form.file = Some(Upload { file_name, bytes });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn require_file(&mut self) -> Result<Upload> {
        self.file
            .take()
            .ok_or_else(|| ApiError::Unprocessable("field 'file' is required".to_string()))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Absent means `false`; accepts the usual truthy/falsy spellings.
    pub fn flag(&self, name: &str) -> Result<bool> {
        let Some(raw) = self.text(name) else {
            return Ok(false);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "f" | "no" | "n" | "off" | "" => Ok(false),
            _ => Err(ApiError::Unprocessable(format!(
                "field '{name}' must be a boolean, got '{raw}'"
            ))),
        }
    }

    pub fn parse<T: FromStr>(&self, name: &str, default: T) -> Result<T> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                ApiError::Unprocessable(format!("field '{name}' has an invalid value '{raw}'"))
            }),
        }
    }
}
