//! Fixed-window request quota for one source.

use std::time::Duration;

use tokio::time::Instant;

/// Longest cool-down a single 429 can impose.
pub const MAX_BLOCK: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-source request counter. Owned by exactly one [`crate::RateLimitedClient`].
///
/// The window restarts once `now - window_start >= window_duration`.
/// Besides the local limit the quota can be blocked outright until a given
/// instant, which is how an upstream 429 is honoured.
#[derive(Debug, Clone)]
pub struct SourceQuota {
    window_start: Instant,
    requests_used: u32,
    limit: u32,
    window_duration: Duration,
    blocked_until: Option<Instant>,
}

impl SourceQuota {
    #[must_use]
    pub fn new(limit: u32, window_duration: Duration) -> Self {
        Self::starting_at(Instant::now(), limit, window_duration)
    }

    #[must_use]
    pub fn starting_at(now: Instant, limit: u32, window_duration: Duration) -> Self {
        Self {
            window_start: now,
            requests_used: 0,
            limit,
            window_duration,
            blocked_until: None,
        }
    }

    #[must_use]
    pub fn requests_used(&self) -> u32 {
        self.requests_used
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn window_duration(&self) -> Duration {
        self.window_duration
    }

    fn roll_window(&mut self, now: Instant) {
        if now.saturating_duration_since(self.window_start) >= self.window_duration {
            self.window_start = now;
            self.requests_used = 0;
        }
        if self.blocked_until.is_some_and(|until| now >= until) {
            self.blocked_until = None;
        }
    }

    /// Reserve one request slot.
    ///
    /// # Errors
    ///
    /// Returns the time to wait before a slot frees up when the window is
    /// exhausted or the quota is blocked.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.roll_window(now);

        if let Some(until) = self.blocked_until {
            return Err(until.saturating_duration_since(now));
        }

        if self.requests_used >= self.limit {
            let elapsed = now.saturating_duration_since(self.window_start);
            return Err(self.window_duration.saturating_sub(elapsed));
        }

        self.requests_used += 1;
        Ok(())
    }

    /// Give back a slot reserved by [`Self::try_acquire`] whose call failed.
    pub fn release(&mut self) {
        self.requests_used = self.requests_used.saturating_sub(1);
    }

    /// Refuse every request until `now + wait`.
    ///
    /// `wait` is capped at [`MAX_BLOCK`]; upstream `Retry-After` values are
    /// untrusted.
    pub fn block_for(&mut self, now: Instant, wait: Duration) {
        let wait = wait.min(MAX_BLOCK);
        let until = now
            .checked_add(wait)
            .or_else(|| now.checked_add(self.window_duration))
            .unwrap_or(now);
        self.blocked_until = Some(self.blocked_until.map_or(until, |cur| cur.max(until)));
    }

    /// Time left in the current window.
    #[must_use]
    pub fn remaining_window(&self, now: Instant) -> Duration {
        self.window_duration
            .saturating_sub(now.saturating_duration_since(self.window_start))
    }
}
