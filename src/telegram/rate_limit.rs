use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limiter wait cancelled")]
pub struct Cancelled;

/// Token bucket guarding upstream calls. A rate of zero disables limiting.
#[derive(Debug)]
pub struct TokenBucket {
    rate_per_sec: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            rate_per_sec: f64::from(rate_per_sec),
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Waits for a token, or gives up as soon as `stop` flips to `true`.
    pub async fn acquire(&self, stop: &mut watch::Receiver<bool>) -> Result<(), Cancelled> {
        if *stop.borrow() {
            return Err(Cancelled);
        }

        let wait = self.reserve(Instant::now());
        if wait.is_zero() {
            return Ok(());
        }

        tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limiter delaying upstream call");

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = stopped(stop) => {
                self.release();
                Err(Cancelled)
            }
        }
    }

    /// Takes one token (possibly going into debt) and returns how long the
    /// caller has to wait before that token is actually available.
    fn reserve(&self, now: Instant) -> Duration {
        if self.rate_per_sec <= 0.0 {
            return Duration::ZERO;
        }

        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let elapsed = now.saturating_duration_since(state.refilled_at).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_sec).min(self.burst);
        state.refilled_at = now;
        state.tokens -= 1.0;

        if state.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-state.tokens / self.rate_per_sec)
        }
    }

    fn release(&self) {
        if self.rate_per_sec <= 0.0 {
            return;
        }

        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.tokens = (state.tokens + 1.0).min(self.burst);
    }
}

/// Resolves once `stop` reads `true`; never resolves if the sender is gone.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            // Sender gone: nobody can cancel any more.
            std::future::pending::<()>().await;
        }
    }
}
