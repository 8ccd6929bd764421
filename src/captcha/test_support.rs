//! Fakes shared by the captcha unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{GrayImage, Luma};

use super::ocr::{OcrEngine, OcrError};
use super::preprocess::encode_png;
use crate::models::CaptchaChallenge;

/// OCR fake whose answer depends on the width of the image it receives,
/// which in turn depends on the resize factor.
#[derive(Clone)]
pub struct WidthKeyedOcr {
    answers: HashMap<u32, String>,
    fallback: String,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl WidthKeyedOcr {
    pub fn new(fallback: &str) -> Self {
        Self {
            answers: HashMap::new(),
            fallback: fallback.to_string(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn answer(mut self, width: u32, text: &str) -> Self {
        self.answers.insert(width, text.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for WidthKeyedOcr {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OcrError::OcrFailed("scripted failure".to_string()));
        }
        let width = image::load_from_memory(png)
            .map_err(|e| OcrError::OcrFailed(e.to_string()))?
            .width();
        Ok(self
            .answers
            .get(&width)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// A data-URI challenge holding a blank PNG `width` pixels wide.
pub fn challenge_of_width(width: u32) -> CaptchaChallenge {
    let png = encode_png(&GrayImage::from_pixel(width, 40, Luma([200]))).unwrap();
    CaptchaChallenge::new(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
