//! Data models for fsspacquire.

mod captcha;
mod proceeding;
mod request;

pub use captcha::{AccuracyReport, CaptchaAttempt, CaptchaChallenge, CaptchaSample, ScoredSample};
pub use proceeding::{normalize_termination, ProceedingBatch, RawProceedingRecord, RequestKind};
pub use request::RequestSpec;
