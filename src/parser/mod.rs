//! Response parsing for the bailiff search endpoint.
//!
//! A response travels through three stages: the JSONP envelope is unwrapped,
//! the page is classified (captcha, empty, results) and, for results, the
//! table is turned into records.

use thiserror::Error;

/// Lazily compiled CSS selector, one static per call site.
macro_rules! selector {
    ($css:expr) => {{
        static SELECTOR: std::sync::OnceLock<scraper::Selector> = std::sync::OnceLock::new();
        SELECTOR.get_or_init(|| scraper::Selector::parse($css).expect("selector is valid"))
    }};
}

mod envelope;
mod page;
mod records;

pub use envelope::unwrap_envelope;
pub use page::{inspect_page, PageOutcome};
pub use records::ResponseParser;

/// Errors raised while interpreting a response.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not the expected envelope. Worth retrying.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The page layout no longer matches what the parser understands.
    #[error("page structure mismatch: {0}")]
    StructureMismatch(String),
}

impl ParseError {
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::StructureMismatch(_))
    }
}
