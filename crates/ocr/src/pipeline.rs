use serde::Serialize;
use thiserror::Error;

use crate::document::{self, DocumentError};
use crate::extract::Extractor;
use crate::preprocess;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::Extraction;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

impl PipelineError {
    /// True when the upload itself is at fault rather than the OCR toolchain.
    /// A PDF that `pdftoppm` rejects or renders to nothing counts as bad input.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            PipelineError::Document(DocumentError::Decode(_) | DocumentError::Rasterize(_))
        )
    }
}

/// Text recognized across every page of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrOutput {
    /// Page texts joined with a single newline.
    pub text: String,
    pub pages: usize,
}

impl OcrOutput {
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({ "pages": self.pages })
    }
}

/// Orchestrates: decode → per-page binarize → OCR → extract.
pub struct DocumentPipeline<R: OcrBackend> {
    recognizer: R,
    pdf_dpi: u32,
}

impl<R: OcrBackend> DocumentPipeline<R> {
    pub fn new(recognizer: R, pdf_dpi: u32) -> Self {
        Self { recognizer, pdf_dpi }
    }

    /// OCR an uploaded document. Blocking: callers on an async runtime
    /// should run it on a blocking thread.
    pub fn ocr_document(&self, data: &[u8], file_name: &str) -> Result<OcrOutput, PipelineError> {
        let pages = document::load_pages(data, file_name, self.pdf_dpi)?;

        let mut texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let png = preprocess::prepare_for_ocr(page)?;
            let text = self.recognizer.recognize(&png)?;
            tracing::debug!(page = index + 1, chars = text.chars().count(), "page recognized");
            texts.push(text);
        }

        Ok(OcrOutput {
            text: texts.join("\n"),
            pages: texts.len(),
        })
    }

    /// OCR a document and extract fields from the recognized text.
    pub fn process(
        &self,
        data: &[u8],
        file_name: &str,
        schema: Option<&str>,
        locale: &str,
    ) -> Result<(OcrOutput, Extraction), PipelineError> {
        let ocr = self.ocr_document(data, file_name)?;
        let extraction = Extractor::extract(&ocr.text, schema, locale);
        Ok((ocr, extraction))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use crate::types::FieldKey;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    struct FailingRecognizer;

    impl OcrBackend for FailingRecognizer {
        fn recognize(&self, _image_bytes: &[u8]) -> Result<String, OcrError> {
            Err(OcrError::NotAvailable)
        }
    }

    #[test]
    fn image_upload_is_a_single_page() {
        let pipeline = DocumentPipeline::new(MockRecognizer::new("hello"), 300);
        let out = pipeline.ocr_document(&tiny_png(), "scan.png").unwrap();
        assert_eq!(out.text, "hello");
        assert_eq!(out.pages, 1);
        assert_eq!(out.summary(), serde_json::json!({"pages": 1}));
    }

    #[test]
    fn process_extracts_from_recognized_text() {
        let pipeline = DocumentPipeline::new(
            MockRecognizer::new("Invoice total: 1,250.00 USD call +1 555-1234"),
            300,
        );
        let (ocr, extraction) = pipeline.process(&tiny_png(), "scan.png", None, "en").unwrap();
        assert_eq!(ocr.pages, 1);
        assert_eq!(extraction.value(FieldKey::Total), Some("1,250.00"));
        assert_eq!(extraction.text, ocr.text);
    }

    #[test]
    fn undecodable_upload_is_bad_input() {
        let pipeline = DocumentPipeline::new(MockRecognizer::new("x"), 300);
        let err = pipeline.ocr_document(b"garbage", "scan.jpg").unwrap_err();
        assert!(err.is_bad_input());
    }

    #[test]
    fn rejected_pdf_is_bad_input() {
        let err = PipelineError::from(DocumentError::Rasterize(
            "Syntax Error: Couldn't read xref table".to_string(),
        ));
        assert!(err.is_bad_input());
        assert!(PipelineError::from(DocumentError::Rasterize("no pages rendered".into()))
            .is_bad_input());
    }

    #[test]
    fn missing_toolchain_is_not_bad_input() {
        assert!(!PipelineError::from(DocumentError::ToolNotFound).is_bad_input());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!PipelineError::from(DocumentError::Io(io)).is_bad_input());
    }

    #[test]
    fn engine_failure_is_not_bad_input() {
        let pipeline = DocumentPipeline::new(FailingRecognizer, 300);
        let err = pipeline.ocr_document(&tiny_png(), "scan.png").unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::NotAvailable)));
        assert!(!err.is_bad_input());
    }
}
