//! Capped exponential backoff with jitter for external lookups.
//!
//! Every caller gets a fixed attempt budget; once it is spent the caller must
//! report the lookup as unavailable instead of retrying forever.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.base_delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(250), Duration::from_secs(4))
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    max: Duration,
    current: Duration,
    jitter_ratio: f64,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        let max = max.max(base);
        Self {
            max,
            current: base,
            jitter_ratio: 0.2,
        }
    }

    /// Delay to wait before the next attempt. The first call waits the base
    /// delay; each later call waits twice as long, up to the cap.
    pub fn fail(&mut self) -> Duration {
        let delay = add_jitter(self.current, self.jitter_ratio);
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(0.0..=1.0).contains(&ratio) {
        return delay;
    }

    let delay_ms = delay.as_millis();
    if delay_ms == 0 {
        return delay;
    }

    let jitter_ms_max = ((delay_ms as f64) * ratio) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let jitter_ms = (now_nanos as u128) % (jitter_ms_max + 1);
    delay + Duration::from_millis(jitter_ms as u64)
}
