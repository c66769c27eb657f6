//! Per-(agent, user) request admission control.
//!
//! Fixed 60-second windows anchored at the first request of the window.
//! Check-and-increment is a single atomic decision under the window's own
//! lock, so two racing requests on the same key can never both consume the
//! final slot.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

pub const WINDOW: Duration = Duration::from_secs(60);

/// Outcome of one admission decision, also the wire shape of the
/// rate-limit status endpoint and the 403 error details.
#[derive(Debug, Clone, Serialize)]
pub struct Admission {
    pub admitted: bool,
    pub current_requests: u32,
    pub limit: u32,
    pub remaining: u32,
    /// When the active window rolls over.
    pub reset_time: DateTime<Utc>,
}

/// The limiter store failed in a way that prevents a decision. Callers choose
/// between fail-open and fail-closed handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit store unavailable: {0}")]
    StoreUnavailable(String),
}

struct WindowState {
    count: u32,
    window_start: Instant,
    resets_at: DateTime<Utc>,
}

impl WindowState {
    fn fresh(window: Duration) -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
            resets_at: Utc::now() + chrono::Duration::from_std(window).unwrap_or_default(),
        }
    }
}

pub struct RateLimiter {
    windows: DashMap<(String, String), Mutex<WindowState>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    /// Limiter with a custom window length, for tests that exercise rollover.
    pub fn with_window(window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            window,
        }
    }

    /// Decides admission for one request and counts it if admitted.
    pub fn check_and_increment(
        &self,
        agent_id: &str,
        user_id: &str,
        limit: u32,
    ) -> Result<Admission, RateLimitError> {
        let key = (agent_id.to_string(), user_id.to_string());
        let entry = self
            .windows
            .entry(key)
            .or_insert_with(|| Mutex::new(WindowState::fresh(self.window)));
        let mut state = entry.lock();

        if state.window_start.elapsed() >= self.window {
            *state = WindowState::fresh(self.window);
        }

        let admitted = state.count < limit;
        if admitted {
            state.count += 1;
        } else {
            debug!(agent_id, user_id, limit, "request rejected by rate limit");
        }

        Ok(Admission {
            admitted,
            current_requests: state.count,
            limit,
            remaining: limit.saturating_sub(state.count),
            reset_time: state.resets_at,
        })
    }

    /// Current window usage without consuming a slot. A key with no live
    /// window reports zero usage and a rollover one full window away.
    pub fn snapshot(&self, agent_id: &str, user_id: &str, limit: u32) -> Admission {
        let key = (agent_id.to_string(), user_id.to_string());
        match self.windows.get(&key) {
            Some(entry) => {
                let state = entry.lock();
                // A stale window reads as empty; its recorded rollover is in
                // the past, so report when a window started now would roll.
                let (count, reset_time) = if state.window_start.elapsed() >= self.window {
                    (
                        0,
                        Utc::now() + chrono::Duration::from_std(self.window).unwrap_or_default(),
                    )
                } else {
                    (state.count, state.resets_at)
                };
                Admission {
                    admitted: count < limit,
                    current_requests: count,
                    limit,
                    remaining: limit.saturating_sub(count),
                    reset_time,
                }
            }
            None => Admission {
                admitted: limit > 0,
                current_requests: 0,
                limit,
                remaining: limit,
                reset_time: Utc::now() + chrono::Duration::from_std(self.window).unwrap_or_default(),
            },
        }
    }

    /// Number of tracked (agent, user) windows.
    pub fn active_windows(&self) -> usize {
        self.windows.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
