//! Per-endpoint fixed-window rate limiting.
//!
//! Each request is counted under `"{ip}:{session-prefix}:{class}"`, so a
//! client gets an independent budget per endpoint class and per session.

mod store;

pub use store::InMemoryRateLimitStore;

use aurora_kernel::gateway::{
    RateLimitConfig, RateLimitDecision, RateLimitPolicy, RateLimitStore, apply_hit,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Key segment used when the caller has no verified session.
pub const NO_SESSION: &str = "no-session";

/// Number of session-id characters that go into a key.
pub const SESSION_KEY_PREFIX_LEN: usize = 16;

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    whitelist: HashSet<String>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            whitelist: HashSet::new(),
        }
    }

    /// Limiter over an [`InMemoryRateLimitStore`] sized from `config`.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let store = InMemoryRateLimitStore::new(config.max_entries, config.eviction_percent);
        Self::new(Arc::new(store)).with_whitelist(config.whitelist.iter().cloned())
    }

    pub fn with_whitelist(mut self, ips: impl IntoIterator<Item = String>) -> Self {
        self.whitelist.extend(ips);
        self
    }

    pub fn store(&self) -> &Arc<dyn RateLimitStore> {
        &self.store
    }

    pub fn is_whitelisted(&self, ip: &str) -> bool {
        self.whitelist.contains(ip)
    }

    /// Counter key for a caller and endpoint class.
    pub fn key(ip: &str, sid: Option<&str>, class: &str) -> String {
        let session = match sid {
            Some(sid) if !sid.is_empty() => {
                let end = sid
                    .char_indices()
                    .nth(SESSION_KEY_PREFIX_LEN)
                    .map(|(i, _)| i)
                    .unwrap_or(sid.len());
                &sid[..end]
            }
            _ => NO_SESSION,
        };
        format!("{ip}:{session}:{class}")
    }

    /// Count one request now.
    pub async fn check(&self, ip: &str, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(ip, key, policy, now_ms()).await
    }

    pub async fn check_at(
        &self,
        ip: &str,
        key: &str,
        policy: &RateLimitPolicy,
        now_ms: u64,
    ) -> RateLimitDecision {
        if self.is_whitelisted(ip) {
            return RateLimitDecision {
                allowed: true,
                limit: policy.limit,
                remaining: policy.limit,
                reset_at_ms: now_ms.saturating_add(policy.window_ms()),
            };
        }

        let mut decision = None;
        self.store
            .update(key, &mut |existing| {
                let (record, d) = apply_hit(existing, policy, now_ms);
                decision = Some(d);
                record
            })
            .await;

        let decision = decision.unwrap_or(RateLimitDecision {
            allowed: false,
            limit: policy.limit,
            remaining: 0,
            reset_at_ms: now_ms.saturating_add(policy.window_ms()),
        });
        if !decision.allowed {
            debug!(key, limit = policy.limit, "rate limit exceeded");
        }
        decision
    }

    /// Remove every record whose window has elapsed.
    pub async fn sweep(&self) -> usize {
        self.store.sweep(now_ms()).await
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the task is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!(interval_secs = interval.as_secs(), "rate-limit sweeper started");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep().await;
                if removed > 0 {
                    debug!(removed, "swept expired rate-limit records");
                }
            }
        })
    }
}

pub(crate) fn now_ms() -> u64 {
    u64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
    )
    .unwrap_or(u64::MAX)
}
