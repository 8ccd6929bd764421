//! OCR engine abstraction and the Tesseract backend.

use std::io::Write;
use std::process::Command;

use thiserror::Error;

/// Characters the captcha is drawn from. Й, О and Ё never appear.
pub const CAPTCHA_WHITELIST: &str =
    "АБВГДЕЖЗИКЛМНПРСТУФХЦЧШЩЪЫЬЭЮЯабвгдежзиклмнпрстуфхцчшщъыьэюя0123456789";

/// Page segmentation mode "assume a single uniform block of text".
const PSM_SINGLE_BLOCK: &str = "6";

/// Errors that can occur during OCR.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recognises text in an already preprocessed PNG image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError>;

    fn is_available(&self) -> bool {
        true
    }
}

/// Tesseract invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", "rus")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, png: &[u8]) -> Result<String, OcrError> {
        let mut input = tempfile::Builder::new()
            .prefix("captcha-")
            .suffix(".png")
            .tempfile()?;
        input.write_all(png)?;
        input.flush()?;

        let whitelist = format!("tessedit_char_whitelist={}", CAPTCHA_WHITELIST);
        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--psm", PSM_SINGLE_BLOCK])
            .args(["-c", &whitelist])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(format!("{} not found (install tesseract-ocr)", self.binary)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_excludes_ambiguous_letters() {
        for c in ['Й', 'й', 'О', 'о', 'Ё', 'ё'] {
            assert!(!CAPTCHA_WHITELIST.contains(c), "{c} must not be whitelisted");
        }
        assert_eq!(CAPTCHA_WHITELIST.chars().filter(|c| c.is_ascii_digit()).count(), 10);
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let ocr = TesseractOcr::new("definitely-not-a-tesseract-binary", "rus");
        assert!(!ocr.is_available());
        assert!(matches!(
            ocr.recognize(b"not an image"),
            Err(OcrError::BackendNotAvailable(_))
        ));
    }
}
