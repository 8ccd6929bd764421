//! Adaptive captcha solver.
//!
//! Each challenge is decoded once and then pushed through the preprocessing
//! pipeline at a sequence of resize factors until the OCR engine yields a
//! code of the expected length. The last attempt wins when none does.

use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, warn};

use super::ocr::OcrEngine;
use super::preprocess::{encode_png, preprocess};
use super::CaptchaError;
use crate::models::{AccuracyReport, CaptchaAttempt, CaptchaChallenge, CaptchaSample, ScoredSample};

/// Length of every code the site draws.
pub const CODE_LENGTH: usize = 5;

/// Ordered resize factors tried by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSchedule(Vec<f64>);

impl FactorSchedule {
    pub fn new(factors: Vec<f64>) -> Result<Self, CaptchaError> {
        if factors.is_empty() || factors.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(CaptchaError::InvalidSchedule);
        }
        Ok(Self(factors))
    }

    pub fn factors(&self) -> &[f64] {
        &self.0
    }
}

impl Default for FactorSchedule {
    /// 0.7, 0.4, 0.53, then 0.6 to 2.7 in steps of 0.1.
    fn default() -> Self {
        let mut factors = vec![0.7, 0.4, 0.53];
        factors.extend((6..=27).map(|tenths| tenths as f64 / 10.0));
        Self(factors)
    }
}

/// Turns captcha images into text.
#[derive(Clone)]
pub struct CaptchaSolver {
    ocr: Arc<dyn OcrEngine>,
    schedule: FactorSchedule,
}

impl CaptchaSolver {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self::with_schedule(ocr, FactorSchedule::default())
    }

    pub fn with_schedule(ocr: Arc<dyn OcrEngine>, schedule: FactorSchedule) -> Self {
        Self { ocr, schedule }
    }

    /// Solve a challenge, stopping at the first code of `CODE_LENGTH` characters.
    ///
    /// When no factor produces one, the attempt made with the last factor is
    /// returned rather than an error.
    pub fn solve(&self, challenge: &CaptchaChallenge) -> Result<CaptchaAttempt, CaptchaError> {
        let image = decode_image(challenge)?;

        let mut last = None;
        for &factor in self.schedule.factors() {
            let code = self.recognize(&image, factor)?;
            debug!("OCR at factor {:.2} gave {:?}", factor, code);

            if code.chars().count() == CODE_LENGTH {
                return Ok(CaptchaAttempt {
                    challenge: challenge.clone(),
                    code,
                    factor,
                });
            }
            last = Some((code, factor));
        }

        let (code, factor) = last.ok_or(CaptchaError::InvalidSchedule)?;
        debug!("No {}-character code found, keeping {:?}", CODE_LENGTH, code);
        Ok(CaptchaAttempt {
            challenge: challenge.clone(),
            code,
            factor,
        })
    }

    /// Solve a labelled sample and compare with its reference answer.
    pub fn score(&self, sample: &CaptchaSample) -> Result<ScoredSample, CaptchaError> {
        let attempt = self.solve(&sample.challenge)?;
        Ok(ScoredSample::new(
            attempt.code,
            sample.reference.clone(),
            attempt.factor,
            sample.created_at,
        ))
    }

    /// Run the full solver over every sample.
    ///
    /// Samples whose image cannot be decoded count as failures; OCR errors abort.
    pub fn measure_accuracy(&self, samples: &[CaptchaSample]) -> Result<AccuracyReport, CaptchaError> {
        let mut scored = Vec::with_capacity(samples.len());
        for sample in samples {
            match self.score(sample) {
                Ok(result) => scored.push(result),
                Err(CaptchaError::InvalidChallenge(reason)) => {
                    warn!("Undecodable sample ({}): {}", sample.reference, reason);
                    scored.push(ScoredSample::new(
                        String::new(),
                        sample.reference.clone(),
                        0.0,
                        sample.created_at,
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(AccuracyReport::new(scored))
    }

    fn recognize(&self, image: &DynamicImage, factor: f64) -> Result<String, CaptchaError> {
        let processed = preprocess(image, factor);
        let png = encode_png(&processed)?;
        let text = self.ocr.recognize(&png)?;
        Ok(text.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

fn decode_image(challenge: &CaptchaChallenge) -> Result<DynamicImage, CaptchaError> {
    let bytes = challenge
        .decode()
        .ok_or_else(|| CaptchaError::InvalidChallenge("payload is not base64".to_string()))?;
    image::load_from_memory(&bytes).map_err(|e| CaptchaError::InvalidChallenge(e.to_string()))
}
