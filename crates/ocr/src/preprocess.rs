use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use thiserror::Error;

/// Neighbourhood size of the adaptive threshold, in pixels.
pub const THRESHOLD_BLOCK: u32 = 31;
/// Constant subtracted from the local mean before thresholding.
pub const THRESHOLD_C: f32 = 2.0;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Binarize a decoded page and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(img: &DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    encode_as_png(DynamicImage::ImageLuma8(binarize(img)))
}

/// Grayscale → 3×3 median blur → Gaussian adaptive threshold.
pub fn binarize(img: &DynamicImage) -> GrayImage {
    let gray = img.to_luma8();
    let smoothed = median_blur_3x3(&gray);
    adaptive_threshold_gaussian(&smoothed, THRESHOLD_BLOCK, THRESHOLD_C)
}

/// Median of each 3×3 neighbourhood, edges replicated.
fn median_blur_3x3(src: &GrayImage) -> GrayImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    ImageBuffer::from_fn(w, h, |x, y| {
        let mut window = [0u8; 9];
        let mut i = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                window[i] = src.get_pixel(sx, sy)[0];
                i += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}

/// White where a pixel is brighter than its Gaussian-weighted local mean
/// minus `c`, black elsewhere.
fn adaptive_threshold_gaussian(src: &GrayImage, block: u32, c: f32) -> GrayImage {
    // Kernel width → sigma, the usual rule for a block of this size.
    let sigma = 0.3 * ((block as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let mean = image::imageops::blur(src, sigma);

    ImageBuffer::from_fn(src.width(), src.height(), |x, y| {
        let value = src.get_pixel(x, y)[0] as f32;
        let threshold = mean.get_pixel(x, y)[0] as f32 - c;
        Luma([if value > threshold { 255 } else { 0 }])
    })
}

fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}
