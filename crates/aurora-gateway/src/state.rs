//! Shared application state for the route handlers

use crate::backend::ProviderSlot;
use crate::store::KEY_STATS;
use aurora_kernel::auth::AdminAuthorizer;
use aurora_kernel::gateway::LocaleConfig;
use aurora_kernel::storage::{JsonStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Usage counters kept under the `stats` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageStats {
    pub results: u64,
    pub questions_generated: u64,
    pub analyses: u64,
    /// Results per four-letter type.
    pub types: BTreeMap<String, u64>,
    pub updated_at: Option<String>,
}

/// State shared across all request handlers
pub struct AppState {
    /// Questions, results, stats and persisted settings
    pub store: Arc<dyn JsonStore>,
    /// Active AI provider, swappable from the admin panel
    pub ai: Arc<ProviderSlot>,
    pub admin: Arc<dyn AdminAuthorizer>,
    pub locales: LocaleConfig,
    /// Add `Secure` to cookies set by handlers
    pub secure_cookies: bool,
    stats_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JsonStore>,
        ai: Arc<ProviderSlot>,
        admin: Arc<dyn AdminAuthorizer>,
        locales: LocaleConfig,
        secure_cookies: bool,
    ) -> Self {
        Self {
            store,
            ai,
            admin,
            locales,
            secure_cookies,
            stats_lock: Mutex::new(()),
        }
    }

    pub async fn stats(&self) -> StoreResult<UsageStats> {
        Ok(match self.store.read(KEY_STATS).await? {
            Some(value) => serde_json::from_value(value)?,
            None => UsageStats::default(),
        })
    }

    /// Read-modify-write the usage counters; concurrent updates are serialized.
    pub async fn update_stats(&self, f: impl FnOnce(&mut UsageStats)) -> StoreResult<UsageStats> {
        let _guard = self.stats_lock.lock().await;
        let mut stats = self.stats().await?;
        f(&mut stats);
        stats.updated_at = Some(chrono::Utc::now().to_rfc3339());
        self.store
            .write(KEY_STATS, &serde_json::to_value(&stats)?)
            .await?;
        Ok(stats)
    }

    /// Whether `locale` is one of the configured locales.
    pub fn supports_locale(&self, locale: &str) -> bool {
        self.locales.locales.iter().any(|l| l == locale)
    }
}
