pub mod document;
pub mod extract;
pub mod fuzzy;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;

pub use document::{DocumentError, DocumentKind};
pub use extract::Extractor;
pub use pipeline::{DocumentPipeline, OcrOutput, PipelineError};
pub use preprocess::{prepare_for_ocr, PreprocessError};
pub use recognizer::{
    default_backend, MockRecognizer, OcrBackend, OcrError, TesseractCli, TesseractOptions,
};
pub use types::{Extraction, Field, FieldKey};
