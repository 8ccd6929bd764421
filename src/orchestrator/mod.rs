//! Batch orchestration over a queue of request specs.
//!
//! Each spec is retried until it yields a batch; only a fatal protocol
//! error stops the run. Pauses escalate with the number of attempts spent
//! on the current spec, and every outcome is committed to the tracker.

mod progress;
mod sink;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

pub use progress::{BatchProgress, NullProgress};
pub use sink::{JsonlSink, MemorySink, ProceedingSink, SinkError};

use crate::client::{jitter, Pause, ProtocolError, SiteProtocolClient};
use crate::models::{ProceedingBatch, RequestSpec};
use crate::tracker::{ProgressTracker, TrackerError};

/// Anything that can answer a request spec with a batch.
#[async_trait]
pub trait ProceedingSource: Send {
    async fn fetch(&mut self, spec: &RequestSpec) -> Result<ProceedingBatch, ProtocolError>;
}

#[async_trait]
impl ProceedingSource for SiteProtocolClient {
    async fn fetch(&mut self, spec: &RequestSpec) -> Result<ProceedingBatch, ProtocolError> {
        SiteProtocolClient::fetch(self, spec).await
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("another batch run is active (pid {pid})")]
    AlreadyRunning { pid: u32 },

    #[error("client #{client_id}: {source}")]
    Fatal {
        client_id: i64,
        #[source]
        source: ProtocolError,
    },

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Pause schedule between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts past this number get a random pause first.
    pub soft_threshold: u32,
    pub soft_jitter: (u64, u64),
    /// Attempts past this number additionally get a long cooldown.
    pub hard_threshold: u32,
    pub hard_pause: Duration,
    pub success_pause: Duration,
    pub retry_jitter: (u64, u64),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            soft_threshold: 10,
            soft_jitter: (5, 10),
            hard_threshold: 50,
            hard_pause: Duration::from_secs(300),
            success_pause: Duration::from_secs(1),
            retry_jitter: (1, 4),
        }
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub records: usize,
    pub retries: u64,
}

pub struct BatchOrchestrator<S> {
    source: S,
    tracker: ProgressTracker,
    sink: Box<dyn ProceedingSink>,
    pause: Arc<dyn Pause>,
    policy: RetryPolicy,
}

impl<S: ProceedingSource> BatchOrchestrator<S> {
    pub fn new(
        source: S,
        tracker: ProgressTracker,
        sink: Box<dyn ProceedingSink>,
        pause: Arc<dyn Pause>,
    ) -> Self {
        Self {
            source,
            tracker,
            sink,
            pause,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn into_parts(self) -> (S, Box<dyn ProceedingSink>) {
        (self.source, self.sink)
    }

    /// Process every spec in order.
    pub async fn run(
        &mut self,
        specs: &[RequestSpec],
        progress: &mut dyn BatchProgress,
    ) -> Result<BatchSummary, BatchError> {
        if let Some(state) = self.tracker.state()? {
            return Err(BatchError::AlreadyRunning {
                pid: state.process_id,
            });
        }
        self.tracker.start()?;
        progress.begin(specs.len());

        let result = self.run_queue(specs, progress).await;
        progress.finish();

        if let Err(e) = self.tracker.end() {
            warn!("Failed to close tracker: {}", e);
        }
        result
    }

    async fn run_queue(
        &mut self,
        specs: &[RequestSpec],
        progress: &mut dyn BatchProgress,
    ) -> Result<BatchSummary, BatchError> {
        let mut summary = BatchSummary::default();

        for spec in specs {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                self.escalate(attempt).await;
                progress.attempt(spec, attempt);

                match self.source.fetch(spec).await {
                    Ok(batch) => {
                        self.sink.store(&batch)?;
                        self.tracker.commit(None)?;
                        progress.item_done(spec, batch.len());

                        summary.completed += 1;
                        summary.records += batch.len();
                        info!("{}: stored {} proceedings", spec.label(), batch.len());

                        self.pause.pause(self.policy.success_pause).await;
                        break;
                    }
                    Err(e) if e.is_fatal() => {
                        error!("{}: fatal error, stopping run: {}", spec.label(), e);
                        return Err(BatchError::Fatal {
                            client_id: spec.client_id,
                            source: e,
                        });
                    }
                    Err(e) => {
                        warn!("{}: attempt {} failed: {}", spec.label(), attempt, e);
                        self.tracker.commit(Some(&e.to_string()))?;
                        progress.retry(spec, &e);
                        summary.retries += 1;

                        let (min, max) = self.policy.retry_jitter;
                        self.pause.pause(jitter(min, max)).await;
                    }
                }
            }
        }

        Ok(summary)
    }

    async fn escalate(&self, attempt: u32) {
        if attempt > self.policy.soft_threshold {
            let (min, max) = self.policy.soft_jitter;
            self.pause.pause(jitter(min, max)).await;
        }
        if attempt > self.policy.hard_threshold {
            warn!("Attempt {}: long cooldown", attempt);
            self.pause.pause(self.policy.hard_pause).await;
        }
    }
}
