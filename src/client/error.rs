//! Error taxonomy of the protocol client.

use thiserror::Error;

use super::transport::TransportError;
use crate::captcha::CaptchaError;
use crate::parser::ParseError;

/// Why a query did not produce a batch.
///
/// Everything except `StructureMismatch` is worth retrying with the same spec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport failure via {proxy}: {source}")]
    Transport {
        proxy: String,
        #[source]
        source: TransportError,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0} consecutive attempts without a result, session reset")]
    CircuitBreaker(u32),

    #[error("bailiff service reports the request is still being processed")]
    ServerBusy,

    #[error("captcha solving failed: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("page structure mismatch: {0}")]
    StructureMismatch(String),
}

impl ProtocolError {
    /// Fatal errors mean the site changed; retrying cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StructureMismatch(_))
    }
}

impl From<ParseError> for ProtocolError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::MalformedResponse(msg) => Self::MalformedResponse(msg),
            ParseError::StructureMismatch(msg) => Self::StructureMismatch(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_structure_mismatch_is_fatal() {
        assert!(ProtocolError::from(ParseError::StructureMismatch("x".into())).is_fatal());
        assert!(!ProtocolError::from(ParseError::MalformedResponse("x".into())).is_fatal());
        assert!(!ProtocolError::ServerBusy.is_fatal());
        assert!(!ProtocolError::CircuitBreaker(10).is_fatal());
        assert!(!ProtocolError::Captcha(CaptchaError::InvalidChallenge("x".into())).is_fatal());
    }
}
