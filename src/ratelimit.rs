//! Sliding-window rate limiter with escalating bans.
//!
//! Grounded in `server/src/voice/rate_limit.rs` (`VoiceRateLimiter`'s
//! `RwLock<HashMap<..>>` + periodic `cleanup()` shape) and
//! `server/src/ratelimit/limiter.rs` (the ban/allowlist/`retry_after`
//! accounting idiom), adapted from the teacher's fixed-interval and
//! Redis-backed admission checks to spec.md §4.2's in-memory sliding window
//! with an escalating ban threshold.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::warn;

/// Tunables for [`RateLimiter`]. Defaults are illustrative; callers are
/// expected to size these for their own admission policy.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    /// Maximum requests allowed per window before throttling begins.
    pub limit: u32,
    /// Sliding window width.
    pub window: Duration,
    /// Extra requests beyond `limit` within the window that trigger a ban.
    pub ban_threshold: u32,
    /// Duration of a ban once triggered.
    pub ban_duration: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
            ban_threshold: 20,
            ban_duration: Duration::from_secs(300),
        }
    }
}

/// Outcome of a [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    pub allowed: bool,
    /// Milliseconds until the caller may retry; `None` when allowed.
    pub retry_after: Option<Duration>,
    /// Requests still permitted in the current window; `None` when denied.
    pub remaining: Option<u32>,
}

/// Read-only view of an identifier's current admission state.
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub count_in_window: usize,
    pub banned_until: Option<Instant>,
}

#[derive(Debug, Default)]
struct Entry {
    timestamps: Vec<Instant>,
    banned_until: Option<Instant>,
}

/// Sliding-window admission limiter keyed by an arbitrary string identifier
/// (user id, connection id, IP — the caller decides).
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: RwLock<HashMap<String, Entry>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Check and, if admitted, record a request for `identifier`.
    ///
    /// Implements spec.md §4.2's five-step algorithm: live ban short-circuits
    /// first, then the window is trimmed, then (in order) the ban threshold,
    /// the plain limit, and finally admission.
    pub async fn check(&self, identifier: &str) -> CheckResult {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let entry = entries.entry(identifier.to_string()).or_default();

        if let Some(banned_until) = entry.banned_until {
            if now < banned_until {
                return CheckResult {
                    allowed: false,
                    retry_after: Some(banned_until - now),
                    remaining: None,
                };
            }
            entry.banned_until = None;
        }

        let window_start = now.checked_sub(self.config.window).unwrap_or(now);
        entry.timestamps.retain(|t| *t >= window_start);

        let retained = entry.timestamps.len() as u32;

        if retained >= self.config.limit + self.config.ban_threshold {
            let banned_until = now + self.config.ban_duration;
            entry.banned_until = Some(banned_until);
            warn!(
                identifier,
                retained, "identifier exceeded ban threshold; banning"
            );
            return CheckResult {
                allowed: false,
                retry_after: Some(self.config.ban_duration),
                remaining: None,
            };
        }

        if retained >= self.config.limit {
            let oldest = entry.timestamps.first().copied().unwrap_or(now);
            let retry_after = self
                .config
                .window
                .checked_sub(now.saturating_duration_since(oldest))
                .unwrap_or(Duration::ZERO);
            return CheckResult {
                allowed: false,
                retry_after: Some(retry_after),
                remaining: None,
            };
        }

        entry.timestamps.push(now);
        CheckResult {
            allowed: true,
            retry_after: None,
            remaining: Some(self.config.limit - retained - 1),
        }
    }

    /// Clear all tracked state (timestamps and ban) for `identifier`.
    pub async fn reset(&self, identifier: &str) {
        self.entries.write().await.remove(identifier);
    }

    /// Read-only snapshot of an identifier's state, if any requests have
    /// been recorded for it.
    pub async fn get_stats(&self, identifier: &str) -> Option<RateLimiterStats> {
        let entries = self.entries.read().await;
        entries.get(identifier).map(|entry| RateLimiterStats {
            count_in_window: entry.timestamps.len(),
            banned_until: entry.banned_until,
        })
    }

    /// `true` if `identifier` is currently within a live ban.
    pub async fn get_banned(&self, identifier: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(identifier)
            .and_then(|e| e.banned_until)
            .is_some_and(|until| Instant::now() < until)
    }

    /// Number of identifiers with any tracked state.
    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drop empty timestamp lists and expired bans. Intended to run on a
    /// `window`-period timer (see [`RateLimiter::spawn_sweeper`]).
    pub async fn sweep(&self) {
        let now = Instant::now();
        let window_start = now.checked_sub(self.config.window).unwrap_or(now);
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| {
            entry.timestamps.retain(|t| *t >= window_start);
            let ban_live = entry.banned_until.is_some_and(|until| now < until);
            ban_live || !entry.timestamps.is_empty()
        });
    }

    /// Spawn a background task that calls [`Self::sweep`] every `window`.
    /// The returned handle should be aborted on shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        let interval = limiter.config.window;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                limiter.sweep().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, ban_threshold: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            limit,
            window: Duration::from_millis(1000),
            ban_threshold,
            ban_duration: Duration::from_millis(500),
        })
    }

    #[tokio::test]
    async fn allows_up_to_limit_then_denies_without_recording() {
        let rl = limiter(3, 2);
        for _ in 0..3 {
            assert!(rl.check("x").await.allowed);
        }
        let denied = rl.check("x").await;
        assert!(!denied.allowed);
        assert!(denied.retry_after.is_some());

        let stats = rl.get_stats("x").await.unwrap();
        assert_eq!(stats.count_in_window, 3);
    }

    #[tokio::test]
    async fn crossing_ban_threshold_bans_identifier() {
        let rl = limiter(3, 2);
        for _ in 0..3 {
            assert!(rl.check("x").await.allowed);
        }
        // Two denials beyond the limit — not yet banned.
        assert!(!rl.check("x").await.allowed);
        assert!(!rl.check("x").await.allowed);
        // The 6th call (limit + ban_threshold) bans.
        let banned = rl.check("x").await;
        assert!(!banned.allowed);
        assert!(rl.get_banned("x").await);

        // Subsequent calls stay denied for the ban's duration.
        let still_banned = rl.check("x").await;
        assert!(!still_banned.allowed);
        assert!(still_banned.retry_after.is_some());
    }

    #[tokio::test]
    async fn ban_expires_and_admits_again() {
        let rl = limiter(1, 0);
        assert!(rl.check("x").await.allowed);
        // 2nd call crosses limit+ban_threshold (1+0) immediately.
        assert!(!rl.check("x").await.allowed);
        assert!(rl.get_banned("x").await);

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert!(!rl.get_banned("x").await);
        assert!(rl.check("x").await.allowed);
    }

    #[tokio::test]
    async fn independent_identifiers_do_not_interfere() {
        let rl = limiter(1, 0);
        assert!(rl.check("a").await.allowed);
        assert!(rl.check("b").await.allowed);
    }

    #[tokio::test]
    async fn reset_clears_ban_and_timestamps() {
        let rl = limiter(1, 0);
        assert!(rl.check("x").await.allowed);
        assert!(!rl.check("x").await.allowed);
        rl.reset("x").await;
        assert!(rl.get_stats("x").await.is_none());
        assert!(rl.check("x").await.allowed);
    }

    #[tokio::test]
    async fn sweep_removes_empty_and_expired_entries() {
        let rl = limiter(5, 0);
        rl.check("x").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        rl.sweep().await;
        assert_eq!(rl.size().await, 0);
    }
}
