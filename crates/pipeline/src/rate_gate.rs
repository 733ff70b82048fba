//! Per-client admission control.
//!
//! Fixed one-minute window counter per client key. Buckets live in a sharded
//! [`DashMap`], so increment-and-check holds only the lock of the shard that
//! owns the key; unrelated clients never serialize on a global mutex.
//!
//! Stale buckets are evicted by [`RateGate::sweep`], which the server runs on
//! an interval, and opportunistically when the table grows past a threshold.
//! The opportunistic sweep runs at most once per window, so a large table of
//! live clients is not rescanned on every request.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default admission window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Default table size above which `admit` may also sweep.
pub const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// The outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub limit: u32,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Seconds until the window rolls over; zero when allowed.
    pub retry_after_secs: u64,
}

/// Shared admission state. Create once at startup and share by `Arc`.
#[derive(Debug)]
pub struct RateGate {
    window: Duration,
    sweep_threshold: usize,
    buckets: DashMap<String, Bucket>,
    epoch: Instant,
    /// Milliseconds after `epoch` of the last sweep.
    last_sweep_ms: AtomicU64,
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RateGate {
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            sweep_threshold: SWEEP_THRESHOLD,
            buckets: DashMap::new(),
            epoch: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Override the table size above which `admit` may sweep.
    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit one request from `client_key` against `limit` per window.
    pub fn admit(&self, client_key: &str, limit: u32) -> Admission {
        self.admit_at(client_key, limit, Instant::now())
    }

    /// [`admit`](Self::admit) with an explicit clock.
    pub fn admit_at(&self, client_key: &str, limit: u32, now: Instant) -> Admission {
        let admission = {
            let mut bucket = self
                .buckets
                .entry(client_key.to_string())
                .or_insert(Bucket {
                    window_start: now,
                    count: 0,
                });

            if now.saturating_duration_since(bucket.window_start) >= self.window {
                bucket.window_start = now;
                bucket.count = 0;
            }

            if bucket.count < limit {
                bucket.count += 1;
                Admission {
                    allowed: true,
                    limit,
                    remaining: limit - bucket.count,
                    retry_after_secs: 0,
                }
            } else {
                let resets_at = bucket.window_start + self.window;
                let wait = resets_at.saturating_duration_since(now);
                Admission {
                    allowed: false,
                    limit,
                    remaining: 0,
                    retry_after_secs: ceil_secs(wait).max(1),
                }
            }
        };

        // The shard guard above must be released before sweeping.
        self.maybe_sweep(now);

        admission
    }

    /// Sweep if the table is over threshold and no sweep ran this window.
    /// Only the caller that wins the timestamp swap scans the table.
    fn maybe_sweep(&self, now: Instant) {
        if self.buckets.len() <= self.sweep_threshold {
            return;
        }
        let now_ms = self.millis_since_epoch(now);
        let last = self.last_sweep_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(last) < self.window_ms() {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.evict_expired(now);
        }
    }

    /// Evict buckets whose window has expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        self.last_sweep_ms
            .fetch_max(self.millis_since_epoch(now), Ordering::AcqRel);
        self.evict_expired(now)
    }

    fn evict_expired(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| now.saturating_duration_since(b.window_start) < self.window);
        before.saturating_sub(self.buckets.len())
    }

    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn millis_since_epoch(&self, now: Instant) -> u64 {
        to_millis(now.saturating_duration_since(self.epoch))
    }

    fn window_ms(&self) -> u64 {
        to_millis(self.window)
    }
}

fn to_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 { secs + 1 } else { secs }
}
