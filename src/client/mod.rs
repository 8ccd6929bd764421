//! Protocol client for the bailiff search service.
//!
//! One call to [`SiteProtocolClient::fetch`] drives a single query to
//! completion: captcha challenges are solved and resubmitted, result pages
//! are walked, and every outcome is classified as a batch, a retryable
//! error or a fatal one.

mod error;
mod pause;
mod query;
mod session;
mod transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, error, info, warn};

pub use error::ProtocolError;
pub use pause::{jitter, Pause, RecordingPause, TokioPause};
pub use query::SearchQuery;
pub use session::{Nonce, Session};
pub use transport::{
    ReqwestTransport, SiteTransport, TransportError, TransportSettings, BROWSER_USER_AGENTS,
};

use crate::captcha::{
    CaptchaError, CaptchaGatherer, CaptchaSolver, LedgerError, OcrError, CODE_LENGTH,
};
use crate::models::{CaptchaAttempt, CaptchaChallenge, ProceedingBatch, RequestSpec};
use crate::parser::{inspect_page, unwrap_envelope, PageOutcome};
use crate::proxy::ProxyPool;
use crate::tracker::now;

/// The site starts refusing after a few minutes of steady captcha fetching.
const STREAM_WINDOW: Duration = Duration::from_secs(4 * 60);
const STREAM_BREAK: Duration = Duration::from_secs(15);
const SERVER_ERROR_PAUSE: Duration = Duration::from_secs(3);
const FETCH_INTERVAL: Duration = Duration::from_secs(1);

/// Timing and threshold knobs of the protocol.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Consecutive requests without a definitive answer before the session is dropped.
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
    pub busy_cooldown: Duration,
    /// Random pause range (seconds) after a transport failure.
    pub transport_backoff: (u64, u64),
    /// Random pause range (seconds) before resubmitting a captcha.
    pub resubmit_jitter: (u64, u64),
    pub solver_failure_pause: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            breaker_threshold: 10,
            breaker_cooldown: Duration::from_secs(180),
            busy_cooldown: Duration::from_secs(180),
            transport_backoff: (10, 15),
            resubmit_jitter: (3, 4),
            solver_failure_pause: Duration::from_secs(30),
        }
    }
}

/// Next request to send within one query.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Submission {
    code: Option<String>,
    page: Option<u32>,
    renew_nonce: bool,
}

impl Submission {
    fn first() -> Self {
        Self {
            code: None,
            page: None,
            renew_nonce: true,
        }
    }

    fn with_code(&self, code: Option<String>) -> Self {
        Self {
            code,
            page: self.page,
            renew_nonce: false,
        }
    }

    fn page(page: u32) -> Self {
        Self {
            code: None,
            page: Some(page),
            renew_nonce: false,
        }
    }
}

/// Drives queries against the site through one session at a time.
pub struct SiteProtocolClient {
    transport: Box<dyn SiteTransport>,
    proxies: Arc<ProxyPool>,
    solver: Arc<CaptchaSolver>,
    gatherer: CaptchaGatherer,
    pause: Arc<dyn Pause>,
    settings: ClientSettings,
    session: Session,
}

impl SiteProtocolClient {
    /// Create the client and bind its first session to the next proxy.
    pub async fn connect(
        mut transport: Box<dyn SiteTransport>,
        proxies: Arc<ProxyPool>,
        solver: Arc<CaptchaSolver>,
        gatherer: CaptchaGatherer,
        pause: Arc<dyn Pause>,
        settings: ClientSettings,
    ) -> Result<Self, ProtocolError> {
        let session = bind_session(transport.as_mut(), &proxies).await?;
        Ok(Self {
            transport,
            proxies,
            solver,
            gatherer,
            pause,
            settings,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn gatherer(&self) -> &CaptchaGatherer {
        &self.gatherer
    }

    /// Run one query to completion.
    pub async fn fetch(&mut self, spec: &RequestSpec) -> Result<ProceedingBatch, ProtocolError> {
        let mut batch = ProceedingBatch::new();
        batch.mark_started(now());

        let mut submission = Submission::first();
        loop {
            if self.session.attempts >= self.settings.breaker_threshold {
                let attempts = self.session.attempts;
                warn!(
                    "{}: {} attempts without an answer, dropping session via {}",
                    spec.label(),
                    attempts,
                    self.session.proxy.address()
                );
                self.session.attempts = 0;
                if let Err(e) = self.renew_session().await {
                    warn!("Could not bind a new session: {}", e);
                }
                self.pause.pause(self.settings.breaker_cooldown).await;
                return Err(ProtocolError::CircuitBreaker(attempts));
            }

            if submission.renew_nonce {
                self.session.renew_nonce();
            }
            let query = SearchQuery::build(
                spec,
                &self.session.nonce,
                submission.code.as_deref(),
                submission.page,
            );

            self.session.attempts += 1;
            debug!(
                "{}: request #{} page {:?} via {}",
                spec.label(),
                self.session.attempts,
                submission.page,
                self.session.proxy.address()
            );

            let body = match self.transport.search(&query).await {
                Ok(body) => body,
                Err(source) => return Err(self.transport_failure(source).await),
            };

            let fragment = unwrap_envelope(&body)?;
            let outcome = match inspect_page(&fragment) {
                Ok(outcome) => outcome,
                Err(e) => {
                    // No captcha on the page, so the last code was accepted.
                    if e.is_structural() {
                        self.gatherer.resolve(true);
                        error!("{}: {}", spec.label(), e);
                    }
                    return Err(e.into());
                }
            };

            if !matches!(outcome, PageOutcome::Captcha(_)) {
                self.gatherer.resolve(true);
            }

            let challenge = match outcome {
                PageOutcome::Captcha(challenge) => challenge,
                PageOutcome::Empty { busy } => {
                    self.session.attempts = 0;
                    if busy {
                        warn!("{}: site busy, cooling down", spec.label());
                        self.pause.pause(self.settings.busy_cooldown).await;
                        return Err(ProtocolError::ServerBusy);
                    }
                    debug!("{}: no (more) proceedings", spec.label());
                    return Ok(finish(batch, spec));
                }
                PageOutcome::Records {
                    batch: page,
                    next_page,
                } => {
                    debug!("{}: {} records on page {:?}", spec.label(), page.len(), submission.page);
                    batch.extend(page);

                    match next_page {
                        Some(next) => {
                            submission = Submission::page(next);
                            continue;
                        }
                        None => {
                            self.session.attempts = 0;
                            info!("{}: {} proceedings", spec.label(), batch.len());
                            return Ok(finish(batch, spec));
                        }
                    }
                }
            };

            self.session.cookies = self.transport.cookies();
            let attempt = match self.solve(challenge).await {
                Ok(attempt) => attempt,
                Err(e) => {
                    warn!("{}: captcha solver failed: {}", spec.label(), e);
                    self.pause.pause(self.settings.solver_failure_pause).await;
                    return Err(e.into());
                }
            };

            self.gatherer.resolve(false);
            let code = (attempt.code.chars().count() == CODE_LENGTH).then(|| attempt.code.clone());
            debug!(
                "{}: captcha read as {:?} (factor {:.2})",
                spec.label(),
                attempt.code,
                attempt.factor
            );
            self.gatherer.set_pending(attempt);

            let backoff = Duration::from_secs(self.session.captcha_backoff_secs());
            self.pause.pause(backoff).await;
            let (min, max) = self.settings.resubmit_jitter;
            self.pause.pause(jitter(min, max)).await;

            submission = submission.with_code(code);
        }
    }

    /// Ask the site for a new captcha image outside of any query.
    pub async fn fetch_fresh_challenge(&mut self) -> Result<CaptchaChallenge, ProtocolError> {
        let body = match self.transport.fetch_challenge().await {
            Ok(body) => body,
            Err(source) => {
                return Err(ProtocolError::Transport {
                    proxy: self.session.proxy.address(),
                    source,
                })
            }
        };

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| ProtocolError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        json.get("image")
            .and_then(Value::as_str)
            .map(CaptchaChallenge::new)
            .ok_or_else(|| ProtocolError::MalformedResponse("missing `image` field".to_string()))
    }

    /// Store `count` fresh challenges in the ledger, unlabelled.
    ///
    /// Fetch failures are logged and retried after a pause; only a ledger
    /// failure ends the loop. `on_stored` sees the running total.
    pub async fn gather_challenges(
        &mut self,
        count: usize,
        mut on_stored: impl FnMut(usize),
    ) -> Result<usize, LedgerError> {
        let mut gathered = 0;
        let mut stream_start = Instant::now();
        while gathered < count {
            if stream_start.elapsed() >= STREAM_WINDOW {
                debug!("Captcha stream open for {:?}, taking a break", STREAM_WINDOW);
                self.pause.pause(STREAM_BREAK).await;
                stream_start = Instant::now();
            }

            let challenge = match self.fetch_fresh_challenge().await {
                Ok(challenge) => challenge,
                Err(ProtocolError::Transport { source, .. }) if source.is_server_error() => {
                    warn!("Captcha fetch hit a server error: {}", source);
                    self.pause.pause(SERVER_ERROR_PAUSE).await;
                    continue;
                }
                Err(e) => {
                    warn!("Captcha fetch failed: {}", e);
                    self.pause.pause(FETCH_INTERVAL).await;
                    continue;
                }
            };

            self.gatherer.store_unlabelled(challenge)?;
            gathered += 1;
            on_stored(gathered);
            self.pause.pause(FETCH_INTERVAL).await;
        }
        Ok(gathered)
    }

    /// Drop the current session and bind a new one to the next proxy.
    pub async fn renew_session(&mut self) -> Result<(), ProtocolError> {
        self.session = bind_session(self.transport.as_mut(), &self.proxies).await?;
        Ok(())
    }

    async fn transport_failure(&mut self, source: TransportError) -> ProtocolError {
        let proxy = self.session.proxy.address();
        warn!("Request #{} via {} failed: {}", self.session.attempts, proxy, source);

        let (min, max) = self.settings.transport_backoff;
        self.pause.pause(jitter(min, max)).await;

        let attempts = self.session.attempts;
        match self.renew_session().await {
            Ok(()) => {
                // The attempt count spans sessions until a definitive answer.
                self.session.attempts = attempts;
                info!("Switched to proxy {}", self.session.proxy.address());
            }
            Err(e) => warn!("Could not bind a new session: {}", e),
        }
        ProtocolError::Transport { proxy, source }
    }

    async fn solve(&self, challenge: CaptchaChallenge) -> Result<CaptchaAttempt, CaptchaError> {
        let solver = Arc::clone(&self.solver);
        tokio::task::spawn_blocking(move || solver.solve(&challenge))
            .await
            .map_err(|e| CaptchaError::Ocr(OcrError::OcrFailed(format!("solver task failed: {}", e))))?
    }
}

async fn bind_session(
    transport: &mut dyn SiteTransport,
    proxies: &ProxyPool,
) -> Result<Session, ProtocolError> {
    let proxy = proxies.next().clone();
    transport
        .reset_session(&proxy)
        .await
        .map_err(|source| ProtocolError::Transport {
            proxy: proxy.address(),
            source,
        })?;
    Ok(Session::new(proxy))
}

fn finish(mut batch: ProceedingBatch, spec: &RequestSpec) -> ProceedingBatch {
    batch.tag(spec.client_id, spec.request_id);
    batch.mark_finished(now());
    batch
}
