//! Per-session state of the protocol client.

use chrono::Utc;
use rand::Rng;

use crate::proxy::ProxyEndpoint;

/// Range of each of the two random blocks in the callback name.
const NONCE_BLOCK: std::ops::RangeInclusive<u64> = 3_000_575_945..=9_000_575_945;

/// JSONP callback name plus the matching cache-busting timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    pub callback: String,
    pub timestamp: i64,
}

impl Nonce {
    /// `jQuery<20 digits>_<unix seconds>`.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let timestamp = Utc::now().timestamp();
        let callback = format!(
            "jQuery{}{}_{}",
            rng.random_range(NONCE_BLOCK),
            rng.random_range(NONCE_BLOCK),
            timestamp
        );
        Self {
            callback,
            timestamp,
        }
    }
}

/// Everything that lives for one proxy binding.
#[derive(Debug, Clone)]
pub struct Session {
    pub proxy: ProxyEndpoint,
    pub nonce: Nonce,
    /// Requests sent since the last definitive answer.
    pub attempts: u32,
    /// Cookies captured when the last captcha was served.
    pub cookies: Vec<(String, String)>,
}

impl Session {
    pub fn new(proxy: ProxyEndpoint) -> Self {
        Self {
            proxy,
            nonce: Nonce::generate(),
            attempts: 0,
            cookies: Vec::new(),
        }
    }

    pub fn renew_nonce(&mut self) {
        self.nonce = Nonce::generate();
    }

    /// Seconds to wait before resubmitting a captcha, growing with the attempt count.
    pub fn captcha_backoff_secs(&self) -> u64 {
        (self.attempts as f64 / 3.1).floor() as u64 + 1
    }
}
