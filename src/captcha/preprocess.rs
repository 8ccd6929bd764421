//! Image cleanup applied before OCR.
//!
//! One pure function shared by the live solver and accuracy measurement.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageBuffer, ImageFormat, Luma};

use super::CaptchaError;

/// Gaussian sigma of the blur applied after the gray conversion.
const BLUR_SIGMA: f32 = 1.0;

/// Contrast boost, in the units of `imageops::contrast`.
const CONTRAST_BOOST: f32 = 25.0;

/// Resize by `factor`, grayscale, blur, boost contrast, despeckle.
pub fn preprocess(image: &DynamicImage, factor: f64) -> GrayImage {
    let width = scaled(image.width(), factor);
    let height = scaled(image.height(), factor);

    let resized = image.resize_exact(width, height, FilterType::Triangle);
    let gray = resized.to_luma8();

    let softened = imageops::blur(&gray, BLUR_SIGMA);
    let boosted = imageops::contrast(&softened, CONTRAST_BOOST);

    despeckle(&boosted)
}

/// Encode a processed image as PNG for the OCR engine.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, CaptchaError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| CaptchaError::Image(e.to_string()))?;
    Ok(buf.into_inner())
}

fn scaled(dimension: u32, factor: f64) -> u32 {
    ((dimension as f64 * factor).round() as u32).max(1)
}

/// 3x3 median filter with edge clamping.
fn despeckle(image: &GrayImage) -> GrayImage {
    let (w, h) = image.dimensions();
    ImageBuffer::from_fn(w, h, |x, y| {
        let mut window = [0u8; 9];
        let mut n = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                window[n] = image.get_pixel(nx, ny)[0];
                n += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}
