//! In-memory fixed-window rate limiter for the login endpoint.
//!
//! Failed attempts are counted per key (client address or account) inside
//! a rolling window; a successful login clears the key. Process-local by
//! design: login throttling is independent of the sales core and does not
//! need cross-instance coordination.

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    attempts: u32,
}

#[derive(Debug)]
pub struct LoginRateLimiter {
    config: RateLimitConfig,
    state: DashMap<String, WindowState>,
}

impl LoginRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: DashMap::new(),
        }
    }

    /// True when the key has exhausted its attempts for the current
    /// window.
    pub fn is_blocked(&self, key: &str) -> bool {
        match self.state.get(key) {
            Some(entry) => {
                entry.window_start.elapsed() < self.config.window
                    && entry.attempts >= self.config.max_attempts
            }
            None => false,
        }
    }

    /// Records a failed attempt and returns the count inside the current
    /// window.
    pub fn register_failure(&self, key: &str) -> u32 {
        let mut entry = self.state.entry(key.to_string()).or_insert(WindowState {
            window_start: Instant::now(),
            attempts: 0,
        });
        if entry.window_start.elapsed() >= self.config.window {
            entry.window_start = Instant::now();
            entry.attempts = 0;
        }
        entry.attempts += 1;
        entry.attempts
    }

    /// Clears the key after a successful login.
    pub fn reset(&self, key: &str) {
        self.state.remove(key);
    }
}
