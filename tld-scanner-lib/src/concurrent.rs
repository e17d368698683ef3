//! Concurrency primitives for the scan engine.
//!
//! Two independent gates sit in front of every lookup:
//! - a [`Governor`] that bounds how many lookups are in flight, and
//! - a [`RateLimit`] that spaces lookups globally, whatever the worker count.

use crate::error::ScanError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Interval, MissedTickBehavior};

/// A shared pacing gate.
///
/// Callers invoke [`RateLimit::wait`] immediately before issuing a lookup.
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Block until the caller may issue its next request.
    async fn wait(&self);
}

/// Ticking limiter: one caller passes per tick, ticks are `period` apart.
///
/// Waiters queue on a fair mutex, so ticks are handed out first-come
/// first-served.
pub struct IntervalLimiter {
    ticker: Mutex<Interval>,
    period: Duration,
}

impl IntervalLimiter {
    /// Start a ticker with the given period.
    ///
    /// Must be called from within a tokio runtime. `period` must be non-zero;
    /// use [`rate_limiter`] to get a no-op limiter for zero.
    pub fn new(period: Duration) -> Self {
        let mut ticker = tokio::time::interval(period);
        // A late tick must not be followed by a burst of catch-up ticks.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker: Mutex::new(ticker),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl RateLimit for IntervalLimiter {
    async fn wait(&self) {
        let mut ticker = self.ticker.lock().await;
        ticker.tick().await;
    }
}

/// Limiter that never blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

#[async_trait]
impl RateLimit for Unlimited {
    async fn wait(&self) {}
}

/// Build the limiter for a period; zero yields [`Unlimited`].
pub fn rate_limiter(period: Duration) -> Arc<dyn RateLimit> {
    if period.is_zero() {
        Arc::new(Unlimited)
    } else {
        Arc::new(IntervalLimiter::new(period))
    }
}

/// Counting admission gate bounding in-flight lookups.
#[derive(Debug, Clone)]
pub struct Governor {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// A held governor slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct Admission {
    _permit: OwnedSemaphorePermit,
}

impl Governor {
    /// Create a governor admitting at most `workers` holders at once.
    pub fn new(workers: usize) -> Result<Self, ScanError> {
        if workers == 0 {
            return Err(ScanError::config("Worker count must be at least 1"));
        }
        Ok(Self {
            slots: Arc::new(Semaphore::new(workers)),
            capacity: workers,
        })
    }

    /// Wait for a free slot.
    pub async fn admit(&self) -> Result<Admission, ScanError> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScanError::internal("Concurrency governor closed"))?;
        Ok(Admission { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
