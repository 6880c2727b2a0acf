use std::io::Write;
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract is not installed (install tesseract-ocr or enable the `tesseract` feature)")]
    NotAvailable,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns one preprocessed page (PNG bytes) into text.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        (**self).recognize(image_bytes)
    }
}

/// Engine knobs shared by the Tesseract backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TesseractOptions {
    /// Language packs, e.g. `ara+eng`.
    pub lang: String,
    pub oem: u8,
    pub psm: u8,
    pub data_path: Option<String>,
}

/// Tesseract's own default engine mode (LSTM with legacy fallback).
pub const DEFAULT_OEM: u8 = 3;

impl TesseractOptions {
    /// The linked backend can only run the engine's default mode.
    pub fn uses_default_oem(&self) -> bool {
        self.oem == DEFAULT_OEM
    }
}

impl Default for TesseractOptions {
    fn default() -> Self {
        Self {
            lang: "ara+eng".to_string(),
            oem: DEFAULT_OEM,
            psm: 6,
            data_path: None,
        }
    }
}

// ── Fixed-text backend ────────────────────────────────────────────────────────

/// Ignores the image and returns `text`. Lets the pipeline and the HTTP layer
/// run without an OCR engine installed.
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Tesseract CLI backend (default) ───────────────────────────────────────────

/// Shells out to the `tesseract` binary, one process per page.
pub struct TesseractCli {
    options: TesseractOptions,
}

impl TesseractCli {
    pub fn new(options: TesseractOptions) -> Self {
        Self { options }
    }

    fn command(&self, image_path: &std::path::Path) -> Command {
        let mut cmd = Command::new("tesseract");
        cmd.arg(image_path)
            .arg("stdout")
            .args(["-l", &self.options.lang])
            .args(["--oem", &self.options.oem.to_string()])
            .args(["--psm", &self.options.psm.to_string()]);
        if let Some(dir) = &self.options.data_path {
            cmd.args(["--tessdata-dir", dir]);
        }
        cmd
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile()?;
        file.write_all(image_bytes)?;
        file.flush()?;

        let output = match self.command(file.path()).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::NotAvailable)
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ── Linked libtesseract (`tesseract` feature) ─────────────────────────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError, TesseractOptions};
    use leptess::{LepTess, Variable};

    /// Links libtesseract directly instead of spawning a process.
    ///
    /// `leptess` initialises the engine with its default OCR engine mode and
    /// offers no way to pick another, so `options.oem` is not applied here.
    /// Language, data path and page segmentation mode are.
    pub struct TesseractRecognizer {
        options: TesseractOptions,
    }

    impl TesseractRecognizer {
        pub fn new(options: TesseractOptions) -> Self {
            if !options.uses_default_oem() {
                tracing::warn!(
                    oem = options.oem,
                    "linked tesseract backend ignores the engine mode; using the default"
                );
            }
            Self { options }
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<String, OcrError> {
            let mut lt = LepTess::new(self.options.data_path.as_deref(), &self.options.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_variable(Variable::TesseditPagesegMode, &self.options.psm.to_string())
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))
        }
    }
}

/// The production backend for this build: linked libtesseract when the
/// `tesseract` feature is on, the CLI otherwise.
pub fn default_backend(options: TesseractOptions) -> Box<dyn OcrBackend> {
    #[cfg(feature = "tesseract")]
    {
        Box::new(tesseract_backend::TesseractRecognizer::new(options))
    }
    #[cfg(not(feature = "tesseract"))]
    {
        Box::new(TesseractCli::new(options))
    }
}
