//! Captcha solving: preprocessing, OCR and the adaptive factor search.
//!
//! Also holds the bookkeeping around live attempts (`CaptchaGatherer`) and
//! the ledger they are written to.

mod gatherer;
mod ledger;
mod ocr;
mod preprocess;
mod solver;

#[cfg(test)]
pub(crate) mod test_support;

use thiserror::Error;

pub use gatherer::CaptchaGatherer;
pub use ledger::{CaptchaLedger, JsonlCaptchaLedger, LedgerEntry, LedgerError};
pub use ocr::{OcrEngine, OcrError, TesseractOcr, CAPTCHA_WHITELIST};
pub use preprocess::{encode_png, preprocess};
pub use solver::{CaptchaSolver, FactorSchedule, CODE_LENGTH};

/// Errors raised by the solver.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("invalid captcha challenge: {0}")]
    InvalidChallenge(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("factor schedule must be a non-empty list of positive numbers")]
    InvalidSchedule,
}
