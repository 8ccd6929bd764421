//! Awaitable pauses, swappable so tests can record instead of sleeping.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested pauses and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingPause {
    log: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Duration> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.recorded().iter().sum()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut log) = self.log.lock() {
            log.push(duration);
        }
    }
}

/// A whole number of seconds drawn uniformly from `min..=max`.
pub fn jitter(min_secs: u64, max_secs: u64) -> Duration {
    Duration::from_secs(rand::rng().random_range(min_secs..=max_secs.max(min_secs)))
}
