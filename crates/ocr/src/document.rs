use std::path::Path;
use std::process::Command;

use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Could not decode upload as an image: {0}")]
    Decode(String),
    #[error("pdftoppm not found; install poppler-utils to OCR PDF uploads")]
    ToolNotFound,
    #[error("PDF rasterization failed: {0}")]
    Rasterize(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How an upload gets turned into page images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

impl DocumentKind {
    /// Decided by the uploaded file name's extension, case-insensitively.
    pub fn from_file_name(name: &str) -> Self {
        let is_pdf = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }
}

/// Decode an upload into one image per page, in page order.
pub fn load_pages(data: &[u8], file_name: &str, dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
    match DocumentKind::from_file_name(file_name) {
        DocumentKind::Pdf => rasterize_pdf(data, dpi),
        DocumentKind::Image => image::load_from_memory(data)
            .map(|img| vec![img])
            .map_err(|e| DocumentError::Decode(e.to_string())),
    }
}

/// Render every page of a PDF with `pdftoppm` into a scratch directory.
fn rasterize_pdf(data: &[u8], dpi: u32) -> Result<Vec<DynamicImage>, DocumentError> {
    let scratch = tempfile::TempDir::new()?;
    let pdf_path = scratch.path().join("input.pdf");
    std::fs::write(&pdf_path, data)?;

    let output = match Command::new("pdftoppm")
        .args(["-png", "-r", &dpi.to_string()])
        .arg(&pdf_path)
        .arg(scratch.path().join("page"))
        .output()
    {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(DocumentError::ToolNotFound),
        Err(e) => return Err(DocumentError::Io(e)),
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocumentError::Rasterize(stderr.trim().to_string()));
    }

    let pages = page_images(scratch.path())?;
    if pages.is_empty() {
        return Err(DocumentError::Rasterize("no pages rendered".to_string()));
    }
    tracing::debug!(pages = pages.len(), dpi, "pdf rasterized");

    pages
        .iter()
        .map(|p| image::open(p).map_err(|e| DocumentError::Decode(e.to_string())))
        .collect()
}

/// `page-1.png`, `page-01.png`, `page-001.png`… sorted by page number.
fn page_images(dir: &Path) -> Result<Vec<std::path::PathBuf>, DocumentError> {
    let mut pages: Vec<(u32, std::path::PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let is_png = path.extension().is_some_and(|e| e == "png");
            let number = stem.strip_prefix("page-")?.parse().ok()?;
            is_png.then_some((number, path))
        })
        .collect();
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, p)| p).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_file_name("scan.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("invoice.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_file_name("receipt.jpg"), DocumentKind::Image);
        assert_eq!(DocumentKind::from_file_name("noext"), DocumentKind::Image);
    }

    #[test]
    fn image_upload_is_one_page() {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_fn(3, 3, |_, _| Luma([9u8])));
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let pages = load_pages(&png, "photo.png", 300).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].width(), 3);
    }

    #[test]
    fn undecodable_image_is_decode_error() {
        let err = load_pages(b"definitely not pixels", "photo.jpg", 300).unwrap_err();
        assert!(matches!(err, DocumentError::Decode(_)));
    }

    #[test]
    fn page_files_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-02.png", "page-01.png", "input.pdf", "page-x.png"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let names: Vec<String> = page_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-01.png", "page-02.png", "page-10.png"]);
    }
}
