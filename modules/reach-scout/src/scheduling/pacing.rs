use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Global spacing between work items. One limiter is shared by every worker,
/// so adding workers adds overlap, not request rate.
pub struct Pacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl Pacer {
    /// A zero interval disables pacing.
    pub fn new(interval: Duration) -> Self {
        let limiter = Quota::with_period(interval).map(RateLimiter::direct);
        Self { limiter }
    }

    /// Wait for the next slot. The first call after a quiet period returns at once.
    pub async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn zero_interval_never_waits() {
        let pacer = Pacer::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..100 {
            pacer.pace().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn consecutive_slots_are_spaced() {
        let pacer = Pacer::new(Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..4 {
            pacer.pace().await;
        }
        // first slot is free, the next three wait ~20ms each
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
