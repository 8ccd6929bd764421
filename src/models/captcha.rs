//! Captcha challenges, solving attempts and scored samples.

use std::cmp::Ordering;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Encoded captcha image exactly as the site delivered it.
///
/// The payload is base64, optionally prefixed with a data-URI header
/// (`data:image/jpeg;base64,`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptchaChallenge(String);

impl CaptchaChallenge {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The base64 part with any data-URI header removed.
    pub fn payload(&self) -> &str {
        match self.0.split_once(',') {
            Some((_, blob)) => blob.trim(),
            None => self.0.trim(),
        }
    }

    /// Decode the image bytes. Returns `None` when the payload is not base64.
    pub fn decode(&self) -> Option<Vec<u8>> {
        let payload: String = self
            .payload()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if payload.is_empty() {
            return None;
        }
        STANDARD.decode(payload).ok()
    }
}

/// One solving attempt. Doubles as the resubmission token while live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptchaAttempt {
    pub challenge: CaptchaChallenge,
    pub code: String,
    pub factor: f64,
}

/// A challenge paired with its human-verified answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaSample {
    pub challenge: CaptchaChallenge,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

/// Result of solving a labelled sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSample {
    pub recognized: String,
    pub reference: String,
    pub factor: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl ScoredSample {
    pub fn new(
        recognized: String,
        reference: String,
        factor: f64,
        created_at: Option<NaiveDateTime>,
    ) -> Self {
        let success = recognized.to_lowercase() == reference.to_lowercase();
        Self {
            recognized,
            reference,
            factor,
            success,
            created_at,
        }
    }

    /// Oldest first; undated samples go last.
    pub fn compare_by_date(a: &Self, b: &Self) -> Ordering {
        match (a.created_at, b.created_at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Aggregate over a set of scored samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub samples: Vec<ScoredSample>,
    pub resolved: usize,
}

impl AccuracyReport {
    pub fn new(samples: Vec<ScoredSample>) -> Self {
        let resolved = samples.iter().filter(|s| s.success).count();
        Self { samples, resolved }
    }

    /// Share of correctly solved samples, in percent with two decimals.
    pub fn percent_resolved(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let percent = self.resolved as f64 / self.samples.len() as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_strips_data_uri() {
        let challenge = CaptchaChallenge::new("data:image/jpeg;base64,aGVsbG8=");
        assert_eq!(challenge.payload(), "aGVsbG8=");
        assert_eq!(challenge.decode(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_payload_without_prefix() {
        let challenge = CaptchaChallenge::new("aGVsbG8=");
        assert_eq!(challenge.decode(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(CaptchaChallenge::new("data:image/png;base64,!!!").decode(), None);
        assert_eq!(CaptchaChallenge::new("data:image/png;base64,").decode(), None);
    }

    #[test]
    fn test_scored_sample_is_case_insensitive() {
        let sample = ScoredSample::new("аБв12".into(), "АбВ12".into(), 0.7, None);
        assert!(sample.success);
        let sample = ScoredSample::new("аБв13".into(), "АбВ12".into(), 0.7, None);
        assert!(!sample.success);
    }

    #[test]
    fn test_compare_by_date() {
        let at = |d: u32| {
            chrono::NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
        };
        let mut samples = vec![
            ScoredSample::new("x".into(), "x".into(), 0.7, None),
            ScoredSample::new("b".into(), "b".into(), 0.7, at(9)),
            ScoredSample::new("a".into(), "a".into(), 0.7, at(2)),
        ];
        samples.sort_by(ScoredSample::compare_by_date);
        let order: Vec<&str> = samples.iter().map(|s| s.reference.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "x"]);
    }

    #[test]
    fn test_percent_resolved() {
        let report = AccuracyReport::new(vec![
            ScoredSample::new("a".into(), "a".into(), 0.7, None),
            ScoredSample::new("b".into(), "c".into(), 0.7, None),
            ScoredSample::new("d".into(), "d".into(), 0.7, None),
        ]);
        assert_eq!(report.resolved, 2);
        assert_eq!(report.percent_resolved(), 66.67);
        assert_eq!(AccuracyReport::new(Vec::new()).percent_resolved(), 0.0);
    }
}
