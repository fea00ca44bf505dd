//! Request pacing
//!
//! A single `Pacer` is shared by everything that talks to the catalog host,
//! so the minimum spacing holds across pairs and across the vocabulary
//! request. The first request goes out immediately.

use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use std::time::Duration;
use tracing::debug;

pub struct Pacer {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    delay: Duration,
}

impl Pacer {
    /// At most one request per `delay`; a zero delay disables pacing
    pub fn new(delay: Duration) -> Self {
        let limiter = Quota::with_period(delay).map(RateLimiter::direct);
        Self { limiter, delay }
    }

    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next request may be issued
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!("Politeness delay ({:?}) before next request", self.delay);
                limiter.until_ready().await;
            }
        }
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer").field("delay", &self.delay).finish()
    }
}
