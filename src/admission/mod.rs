//! Admission control for outbound upstream calls.
//!
//! Two caps apply at once: a sustained rate (see [`Pacer`]) and a
//! concurrency cap (a semaphore of `max_concurrent` slots). Callers first
//! queue for a slot, then for a rate token; both queues are FIFO, and a
//! caller holding a slot waits for the token while other callers queue
//! behind it. Dropping an `acquire` future at any point (timeout,
//! cancellation) releases whatever it held without consuming a token.

pub mod pacer;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;
use crate::error::UpstreamError;

pub use pacer::{Pacer, RATE_WINDOW};

/// Permission to perform one outbound call.
///
/// The concurrency slot is returned when the ticket is dropped.
#[derive(Debug)]
pub struct Ticket {
    id: u64,
    granted_at: Instant,
    _permit: OwnedSemaphorePermit,
}

impl Ticket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

/// Limiter counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    /// Calls to `acquire*`, granted or not
    pub acquire_calls: u64,
    pub granted: u64,
    /// Waits abandoned through timeout or cancellation
    pub timeouts: u64,
    pub in_flight: usize,
    pub max_concurrent: usize,
}

pub struct RateLimiter {
    slots: Arc<Semaphore>,
    pacer: Mutex<Pacer>,
    max_concurrent: usize,
    acquire_timeout: Option<Duration>,
    acquire_calls: AtomicU64,
    granted: AtomicU64,
    timeouts: AtomicU64,
}

fn admission_cancelled() -> UpstreamError {
    UpstreamError::rate_limit_timeout("admission wait cancelled")
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let max_concurrent = config.max_concurrent.clamp(1, Semaphore::MAX_PERMITS);

        Self {
            slots: Arc::new(Semaphore::new(max_concurrent)),
            pacer: Mutex::new(Pacer::new(
                config.requests_per_second,
                config.burst,
                Instant::now(),
            )),
            max_concurrent,
            acquire_timeout: config.acquire_timeout(),
            acquire_calls: AtomicU64::new(0),
            granted: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    /// Wait for admission, bounded by the configured acquire timeout
    pub async fn acquire(&self) -> Result<Ticket, UpstreamError> {
        self.acquire_cancellable(&CancellationToken::new()).await
    }

    /// Wait for admission until granted, timed out or `cancel` fires
    pub async fn acquire_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Ticket, UpstreamError> {
        self.acquire_calls.fetch_add(1, Ordering::Relaxed);

        let admit = self.admit();
        let result = match self.acquire_timeout {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(admission_cancelled()),
                res = tokio::time::timeout(limit, admit) => match res {
                    Ok(ticket) => ticket,
                    Err(_) => Err(UpstreamError::rate_limit_timeout(format!(
                        "admission wait exceeded {}ms",
                        limit.as_millis()
                    ))),
                },
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(admission_cancelled()),
                res = admit => res,
            },
        };

        if let Err(e) = &result {
            self.timeouts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("⏳ Admission abandoned: {}", e.message);
        }
        result
    }

    async fn admit(&self) -> Result<Ticket, UpstreamError> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| UpstreamError::rate_limit_timeout("rate limiter closed"))?;

        let mut pacer = self.pacer.lock().await;
        let granted_at = loop {
            let now = Instant::now();
            match pacer.wait_until(now) {
                None => {
                    pacer.record(now);
                    break now;
                }
                Some(ready) => tokio::time::sleep_until(ready).await,
            }
        };
        drop(pacer);

        let id = self.granted.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("🎫 Ticket {} granted", id);

        Ok(Ticket {
            id,
            granted_at,
            _permit: permit,
        })
    }

    /// Return a ticket early; dropping it has the same effect
    pub fn release(&self, ticket: Ticket) {
        tracing::trace!("Ticket {} released", ticket.id);
        drop(ticket);
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn stats(&self) -> LimiterStats {
        let available = self.slots.available_permits();
        LimiterStats {
            acquire_calls: self.acquire_calls.load(Ordering::Relaxed),
            granted: self.granted.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            in_flight: self.max_concurrent.saturating_sub(available),
            max_concurrent: self.max_concurrent,
        }
    }
}
