//! Cancellable minimum-interval throttle for remote writes
//!
//! Consecutive `acquire` calls are spaced at least `min_interval` apart
//! (the first one passes immediately). A cancelled wait returns
//! `SyncError::Cancelled` at once and consumes no slot.

use crate::error::{SyncError, SyncResult};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct WriteThrottle {
    /// `None` when the interval is zero
    limiter: Option<DirectLimiter>,
    min_interval: Duration,
}

impl WriteThrottle {
    pub fn new(min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval)
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));
        Self {
            limiter,
            min_interval,
        }
    }

    /// Wait for the next write slot
    pub async fn acquire(&self, cancel: &CancellationToken) -> SyncResult<()> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        if limiter.check().is_ok() {
            return Ok(());
        }

        debug!(interval = ?self.min_interval, "Write throttle: waiting for next slot");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SyncError::Cancelled),
            _ = limiter.until_ready() => Ok(()),
        }
    }
}
