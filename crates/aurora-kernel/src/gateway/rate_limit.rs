//! Fixed-window rate-limit contract.
//!
//! The counting rule lives in [`apply_hit`], a pure function over the previous
//! record, so every [`RateLimitStore`] backend shares the same semantics and
//! only has to provide atomic per-key read-modify-write.
//!
//! All timestamps are unix milliseconds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Limit and window of one endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Requests allowed per window (must be > 0).
    pub limit: u32,
    /// Window length in seconds (must be > 0).
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self { limit, window_secs }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_secs.saturating_mul(1000)
    }
}

/// Counting record for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Requests counted in the current window.
    pub count: u32,
    /// When the current window rolls over.
    pub reset_at_ms: u64,
    /// Insertion sequence assigned by the store; used for oldest-first eviction.
    pub seq: u64,
}

impl RateLimitRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.reset_at_ms
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Reset instant in unix seconds, rounded up.
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }

    /// Seconds until the window rolls over, at least 1.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000).max(1)
    }
}

/// Count one request against `existing` and return the record to store along
/// with the decision.
///
/// - no record, or the window elapsed: a fresh window with `count = 1`
/// - `count >= limit`: blocked, record untouched (the window is not extended)
/// - otherwise: `count + 1`, `remaining = limit - count`
pub fn apply_hit(
    existing: Option<&RateLimitRecord>,
    policy: &RateLimitPolicy,
    now_ms: u64,
) -> (RateLimitRecord, RateLimitDecision) {
    match existing {
        Some(record) if !record.is_expired(now_ms) => {
            if record.count >= policy.limit {
                (
                    *record,
                    RateLimitDecision {
                        allowed: false,
                        limit: policy.limit,
                        remaining: 0,
                        reset_at_ms: record.reset_at_ms,
                    },
                )
            } else {
                let next = RateLimitRecord {
                    count: record.count + 1,
                    ..*record
                };
                (
                    next,
                    RateLimitDecision {
                        allowed: true,
                        limit: policy.limit,
                        remaining: policy.limit - next.count,
                        reset_at_ms: next.reset_at_ms,
                    },
                )
            }
        }
        _ => {
            let next = RateLimitRecord {
                count: 1,
                reset_at_ms: now_ms.saturating_add(policy.window_ms()),
                seq: existing.map(|r| r.seq).unwrap_or_default(),
            };
            (
                next,
                RateLimitDecision {
                    allowed: true,
                    limit: policy.limit,
                    remaining: policy.limit.saturating_sub(1),
                    reset_at_ms: next.reset_at_ms,
                },
            )
        }
    }
}

/// Storage backend for rate-limit records.
///
/// An in-process map and a shared cache are interchangeable behind this
/// trait. Implementations must make [`update`](Self::update) atomic per key:
/// two concurrent updates of the same key may not lose a count.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<RateLimitRecord>;

    async fn set(&self, key: &str, record: RateLimitRecord);

    /// Returns `true` if a record was removed.
    async fn delete(&self, key: &str) -> bool;

    /// Atomically replace the record for `key` with `f(previous)`.
    ///
    /// Inserting a brand-new key may first evict old records to keep the
    /// store within its capacity.
    async fn update(
        &self,
        key: &str,
        f: &mut (dyn for<'r> FnMut(Option<&'r RateLimitRecord>) -> RateLimitRecord + Send),
    ) -> RateLimitRecord;

    /// Remove every record whose window has elapsed; returns how many.
    async fn sweep(&self, now_ms: u64) -> usize;

    /// Number of tracked keys.
    async fn len(&self) -> usize;
}
