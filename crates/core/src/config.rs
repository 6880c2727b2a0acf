use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an optional TOML settings file.
pub const CONFIG_PATH_VAR: &str = "INSIGHT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

/// Process-wide settings, loaded once at startup and shared read-only.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub default_locale: String,
    pub admin_api_key: Option<String>,
    /// Service-account credentials: inline JSON or a path to a JSON file.
    pub google_sheets_creds_json: Option<String>,
    /// Root of the `uploads/`, `outputs/` and `metrics/` directories.
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub tesseract_lang: String,
    pub tesseract_psm: u8,
    pub tesseract_oem: u8,
    pub tesseract_data_path: Option<String>,
    pub pdf_dpi: u32,
    pub max_upload_bytes: usize,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            admin_api_key: None,
            google_sheets_creds_json: None,
            data_dir: PathBuf::from("./data"),
            bind_addr: "0.0.0.0:8000".to_string(),
            tesseract_lang: "ara+eng".to_string(),
            tesseract_psm: 6,
            tesseract_oem: 3,
            tesseract_data_path: None,
            pdf_dpi: 300,
            max_upload_bytes: 25 * 1024 * 1024,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then the `INSIGHT_CONFIG` file if set, then `.env` and the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case outside development.
        let _ = dotenvy::dotenv();

        let mut settings = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay values from an environment lookup. Unset keys keep their
    /// current value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DEFAULT_LOCALE") {
            self.default_locale = v;
        }
        if let Some(v) = lookup("ADMIN_API_KEY") {
            self.admin_api_key = Some(v);
        }
        if let Some(v) = lookup("GOOGLE_SHEETS_CREDS_JSON") {
            self.google_sheets_creds_json = Some(v);
        }
        if let Some(v) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("TESSERACT_LANG") {
            self.tesseract_lang = v;
        }
        if let Some(v) = lookup("TESSDATA_PREFIX") {
            self.tesseract_data_path = Some(v);
        }
        if let Some(v) = lookup("TESSERACT_PSM") {
            self.tesseract_psm = parse_value("TESSERACT_PSM", &v)?;
        }
        if let Some(v) = lookup("TESSERACT_OEM") {
            self.tesseract_oem = parse_value("TESSERACT_OEM", &v)?;
        }
        if let Some(v) = lookup("PDF_DPI") {
            self.pdf_dpi = parse_value("PDF_DPI", &v)?;
        }
        if let Some(v) = lookup("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_value("MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = lookup("RUST_LOG") {
            self.log_filter = v;
        }
        Ok(())
    }

    /// The configured admin key; an empty value counts as unset.
    pub fn admin_api_key(&self) -> Option<&str> {
        self.admin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_service_defaults() {
        let s = Settings::default();
        assert_eq!(s.default_locale, "en");
        assert_eq!(s.tesseract_lang, "ara+eng");
        assert_eq!(s.tesseract_psm, 6);
        assert_eq!(s.tesseract_oem, 3);
        assert!(s.admin_api_key().is_none());
    }

    #[test]
    fn env_overrides_defaults() {
        let mut s = Settings::default();
        s.apply_env(env_from(&[
            ("DEFAULT_LOCALE", "ar"),
            ("ADMIN_API_KEY", "s3cret"),
            ("PDF_DPI", "150"),
            ("DATA_DIR", "/srv/insight"),
        ]))
        .unwrap();
        assert_eq!(s.default_locale, "ar");
        assert_eq!(s.admin_api_key(), Some("s3cret"));
        assert_eq!(s.pdf_dpi, 150);
        assert_eq!(s.data_dir, PathBuf::from("/srv/insight"));
    }

    #[test]
    fn invalid_number_is_reported() {
        let mut s = Settings::default();
        let err = s.apply_env(env_from(&[("MAX_UPLOAD_BYTES", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "MAX_UPLOAD_BYTES"));
    }

    #[test]
    fn empty_admin_key_counts_as_unset() {
        let mut s = Settings::default();
        s.apply_env(env_from(&[("ADMIN_API_KEY", "  ")])).unwrap();
        assert!(s.admin_api_key().is_none());
    }

    #[test]
    fn toml_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insight.toml");
        std::fs::write(&path, "default_locale = \"ar\"\npdf_dpi = 200\n").unwrap();
        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.default_locale, "ar");
        assert_eq!(s.pdf_dpi, 200);
        assert_eq!(s.bind_addr, Settings::default().bind_addr);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "pdf_dpi = \"high\"").unwrap();
        assert!(matches!(Settings::from_file(&path), Err(ConfigError::Parse { .. })));
    }
}
