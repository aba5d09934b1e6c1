//! Injectable clock for time-dependent logic.
//!
//! The backfill cutoff and the pipe drain poll both depend on wall-clock
//! time. Routing them through a trait lets tests drive the synchronizer
//! without real sleeps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Source of wall-clock time and sleeps.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the current task for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the system time and tokio's timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
