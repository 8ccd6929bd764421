//! fsspacquire - enforcement proceeding acquisition from the FSSP bailiff service.
//!
//! The search form of `is.fssp.gov.ru` is gated by an image captcha and
//! throttles aggressively. This crate drives it end to end: an OCR-based
//! captcha solver, a protocol client that handles resubmission, pagination
//! and busy pages through rotating proxies, and a batch orchestrator with a
//! resumable, observable progress file.

pub mod captcha;
pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod proxy;
pub mod tracker;
