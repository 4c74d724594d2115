//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Tick pacing for streaming sessions."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// Fixed-period tick source. The first tick fires one full period after
/// construction; late ticks are delayed rather than bunched up.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
