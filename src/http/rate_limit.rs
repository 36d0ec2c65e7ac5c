//! Client-side request pacing
//!
//! Cronometer's export endpoints are meant for a browser, not a script. A
//! windowed export over several years issues one request per window, so
//! every request waits on a token bucket (`governor`) before it is sent.

use crate::error::{Error, Result};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::trace;

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Request pacing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Requests allowed back to back before pacing starts
    pub burst_size: u32,
}

/// Two requests a second with a burst of three covers a full login plus
/// the first export window without waiting.
impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            burst_size: 3,
        }
    }
}

impl RateLimiterConfig {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    fn quota(&self) -> Result<Quota> {
        let rate = NonZeroU32::new(self.requests_per_second)
            .ok_or_else(|| Error::config("rate limit must allow at least one request per second"))?;
        let burst = NonZeroU32::new(self.burst_size)
            .ok_or_else(|| Error::config("rate limit burst size must be at least 1"))?;
        Ok(Quota::per_second(rate).allow_burst(burst))
    }
}

/// Token bucket shared by clones of one client
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    /// Build a limiter, rejecting a zero rate or burst
    pub fn new(config: &RateLimiterConfig) -> Result<Self> {
        Ok(Self {
            limiter: Arc::new(Governor::direct(config.quota()?)),
            config: *config,
        })
    }

    /// Settings the limiter was built with
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Wait until the next request may go out
    pub async fn wait(&self) {
        if let Err(not_until) = self.limiter.check() {
            let delay = not_until.wait_time_from(DefaultClock::default().now());
            trace!(?delay, "Pacing request");
            self.limiter.until_ready().await;
        }
    }

    /// Whether a request could go out right now, consuming a permit if so
    pub(crate) fn ready_now(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.config.requests_per_second)
            .field("burst_size", &self.config.burst_size)
            .finish()
    }
}
