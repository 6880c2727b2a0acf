use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::slug::safe_filename;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io { path: path.to_path_buf(), source }
}

/// Flat on-disk layout: `uploads/`, `outputs/`, `metrics/` under one root.
///
/// Files are write-once and never cleaned up. Two writers deriving the same
/// name race and the last one wins.
#[derive(Debug, Clone)]
pub struct Storage {
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
    metrics_dir: PathBuf,
}

impl Storage {
    /// Create the three directories if they do not exist yet.
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        let storage = Self {
            uploads_dir: data_dir.join("uploads"),
            outputs_dir: data_dir.join("outputs"),
            metrics_dir: data_dir.join("metrics"),
        };
        for dir in [&storage.uploads_dir, &storage.outputs_dir, &storage.metrics_dir] {
            std::fs::create_dir_all(dir).map_err(io_at(dir))?;
        }
        Ok(storage)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs_dir
    }

    pub fn metrics_dir(&self) -> &Path {
        &self.metrics_dir
    }

    /// Persist an upload as `uploads/{YYYYMMDD-HHMMSS}-{slug}`.
    pub async fn save_upload(
        &self,
        content: &[u8],
        original_name: &str,
    ) -> Result<PathBuf, StorageError> {
        self.save_upload_at(content, original_name, Utc::now()).await
    }

    pub async fn save_upload_at(
        &self,
        content: &[u8],
        original_name: &str,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, StorageError> {
        let stamp = at.format("%Y%m%d-%H%M%S");
        let path = self
            .uploads_dir
            .join(format!("{stamp}-{}", safe_filename(original_name)));
        tokio::fs::write(&path, content).await.map_err(io_at(&path))?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "upload saved");
        Ok(path)
    }

    /// `outputs/{slug(stem)}.{ext}`
    pub fn output_path(&self, stem: &str, ext: &str) -> PathBuf {
        self.outputs_dir.join(format!("{}.{ext}", safe_filename(stem)))
    }

    /// Write a header row followed by `rows`. The header is written even when
    /// there are no rows.
    pub async fn write_csv<I, R>(
        &self,
        path: &Path,
        header: &[&str],
        rows: I,
    ) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator,
        R::Item: AsRef<[u8]>,
    {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| StorageError::Io { path: path.to_path_buf(), source: e.into_error() })?;
        tokio::fs::write(path, bytes).await.map_err(io_at(path))
    }

    /// Compact JSON; non-ASCII text is written as-is.
    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value)?;
        tokio::fs::write(path, bytes).await.map_err(io_at(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn open_creates_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        assert!(storage.uploads_dir().is_dir());
        assert!(storage.outputs_dir().is_dir());
        assert!(storage.metrics_dir().is_dir());
    }

    #[tokio::test]
    async fn upload_name_is_timestamp_and_slug() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 5).unwrap();

        let path = storage.save_upload_at(b"data", "My Invoice.pdf", at).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "20240115-093005-My-Invoice-pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[tokio::test]
    async fn same_second_same_name_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 5).unwrap();

        let a = storage.save_upload_at(b"first", "a.png", at).await.unwrap();
        let b = storage.save_upload_at(b"second", "a.png", at).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(std::fs::read(&b).unwrap(), b"second");
    }

    #[test]
    fn output_path_slugs_stem() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let path = storage.output_path("scan 01-extracted", "json");
        assert_eq!(path, storage.outputs_dir().join("scan-01-extracted.json"));
    }

    #[tokio::test]
    async fn csv_has_header_even_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let path = storage.output_path("empty", "csv");

        storage
            .write_csv(&path, &["key", "val", "confidence"], Vec::<Vec<String>>::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "key,val,confidence\n");
    }

    #[tokio::test]
    async fn csv_rows_are_quoted_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let path = storage.output_path("rows", "csv");

        storage
            .write_csv(&path, &["key", "val"], vec![vec!["amount", "1,250.00"]])
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "key,val\namount,\"1,250.00\"\n"
        );
    }

    #[tokio::test]
    async fn json_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let path = storage.output_path("ar", "json");

        storage
            .write_json(&path, &serde_json::json!({"text": "المجموع"}))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"text\":\"المجموع\"}");
    }
}
