//! Tracks the live captcha attempt until the site tells us whether it was right.

use std::sync::Arc;

use tracing::warn;

use super::ledger::{CaptchaLedger, LedgerEntry, LedgerError};
use crate::models::{CaptchaAttempt, CaptchaChallenge};

/// Holds at most one pending attempt and flushes it to a ledger once its
/// outcome is known.
pub struct CaptchaGatherer {
    ledger: Arc<dyn CaptchaLedger>,
    pending: Option<CaptchaAttempt>,
}

impl CaptchaGatherer {
    pub fn new(ledger: Arc<dyn CaptchaLedger>) -> Self {
        Self {
            ledger,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<&CaptchaAttempt> {
        self.pending.as_ref()
    }

    /// Remember the attempt about to be submitted.
    pub fn set_pending(&mut self, attempt: CaptchaAttempt) {
        self.pending = Some(attempt);
    }

    /// Record the pending attempt, if any, and clear it.
    ///
    /// Ledger failures are logged; they never interrupt a query.
    pub fn resolve(&mut self, is_resolved: bool) {
        let Some(attempt) = self.pending.take() else {
            return;
        };
        if let Err(e) = self.ledger.record(&LedgerEntry::solved(&attempt, is_resolved)) {
            warn!("Failed to record captcha outcome: {}", e);
        }
    }

    /// Record a challenge nobody has tried yet.
    pub fn store_unlabelled(&self, challenge: CaptchaChallenge) -> Result<(), LedgerError> {
        self.ledger.record(&LedgerEntry::unlabelled(challenge))
    }
}
