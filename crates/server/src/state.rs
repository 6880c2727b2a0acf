use std::sync::Arc;

use insight_core::Settings;
use insight_ocr::{default_backend, DocumentPipeline, OcrBackend, TesseractOptions};
use insight_sheets::SheetsClient;
use insight_storage::{Storage, StorageError};

pub type Pipeline = DocumentPipeline<Box<dyn OcrBackend>>;

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub storage: Storage,
    pub pipeline: Arc<Pipeline>,
    pub sheets: Option<Arc<SheetsClient>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        recognizer: Box<dyn OcrBackend>,
        sheets: Option<SheetsClient>,
    ) -> Result<Self, StorageError> {
        let storage = Storage::open(&settings.data_dir)?;
        let pipeline = DocumentPipeline::new(recognizer, settings.pdf_dpi);
        Ok(Self {
            settings: Arc::new(settings),
            storage,
            pipeline: Arc::new(pipeline),
            sheets: sheets.map(Arc::new),
        })
    }

    /// Production wiring: the Tesseract backend and, if credentials are
    /// configured and readable, a Sheets client.
    pub fn from_settings(settings: Settings) -> Result<Self, StorageError> {
        let recognizer = default_backend(TesseractOptions {
            lang: settings.tesseract_lang.clone(),
            oem: settings.tesseract_oem,
            psm: settings.tesseract_psm,
            data_path: settings.tesseract_data_path.clone(),
        });

        let sheets = match SheetsClient::from_settings(&settings) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "sheets credentials unusable, sync disabled");
                None
            }
        };
        tracing::info!(
            data_dir = %settings.data_dir.display(),
            sheets = sheets.is_some(),
            admin = settings.admin_api_key().is_some(),
            "state initialised"
        );

        Self::new(settings, recognizer, sheets)
    }
}
