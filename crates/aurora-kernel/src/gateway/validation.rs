//! Admission configuration container and validation.
//!
//! [`AdmissionConfig`] aggregates every tunable of the admission pipeline and
//! exposes a single [`validate()`](AdmissionConfig::validate) that checks all
//! structural invariants *before* any runtime resources are allocated.
//! Every section deserializes with defaults, so a config file only needs to
//! mention what it changes.

use super::error::GatewayError;
use super::rate_limit::RateLimitPolicy;
use super::session::{SESSION_COOKIE, SESSION_TTL_SECS};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_secs: u64,
    /// Adds `Secure` to the cookie; enable in production.
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: SESSION_COOKIE.to_string(),
            ttl_secs: SESSION_TTL_SECS,
            secure_cookie: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate limiting
// ─────────────────────────────────────────────────────────────────────────────

/// Maps a path prefix to an endpoint class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRoute {
    pub prefix: String,
    pub class: String,
}

impl EndpointRoute {
    pub fn new(prefix: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            class: class.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Ceiling on tracked keys before oldest-first eviction.
    pub max_entries: usize,
    /// Share of tracked keys evicted when the ceiling is hit.
    pub eviction_percent: u8,
    /// Period of the expired-record sweep.
    pub sweep_interval_secs: u64,
    /// Client addresses that are never counted.
    pub whitelist: Vec<String>,
    /// Class used when no route prefix matches.
    pub default_class: String,
    /// Class name to limit/window. Entries in a config file are merged over
    /// the built-in classes.
    #[serde(deserialize_with = "merge_over_default_classes")]
    pub classes: BTreeMap<String, RateLimitPolicy>,
    /// First matching prefix wins.
    pub routes: Vec<EndpointRoute>,
}

pub const CLASS_QUESTIONS: &str = "questions";
pub const CLASS_ANALYSIS: &str = "analysis";
pub const CLASS_GENERAL: &str = "general";

fn default_classes() -> BTreeMap<String, RateLimitPolicy> {
    BTreeMap::from([
        (CLASS_QUESTIONS.to_string(), RateLimitPolicy::new(10, 60)),
        (CLASS_ANALYSIS.to_string(), RateLimitPolicy::new(5, 60)),
        (CLASS_GENERAL.to_string(), RateLimitPolicy::new(60, 60)),
    ])
}

fn merge_over_default_classes<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, RateLimitPolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, RateLimitPolicy>::deserialize(deserializer)?;
    let mut merged = default_classes();
    merged.extend(overrides);
    Ok(merged)
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            eviction_percent: 20,
            sweep_interval_secs: 60,
            whitelist: Vec::new(),
            default_class: CLASS_GENERAL.to_string(),
            classes: default_classes(),
            routes: vec![
                EndpointRoute::new("/api/questions/generate", CLASS_QUESTIONS),
                EndpointRoute::new("/api/analysis", CLASS_ANALYSIS),
            ],
        }
    }
}

impl RateLimitConfig {
    /// Endpoint class for an (already normalized) path.
    pub fn classify(&self, path: &str) -> &str {
        self.routes
            .iter()
            .find(|r| super::types::path_matches(path, &r.prefix))
            .map(|r| r.class.as_str())
            .unwrap_or(&self.default_class)
    }

    pub fn policy(&self, class: &str) -> Option<&RateLimitPolicy> {
        self.classes.get(class)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.max_entries == 0 {
            return Err(GatewayError::InvalidCapacity);
        }
        if !(1..=100).contains(&self.eviction_percent) {
            return Err(GatewayError::InvalidEvictionPercent(self.eviction_percent));
        }
        if self.sweep_interval_secs == 0 {
            return Err(GatewayError::InvalidSweepInterval);
        }
        for (name, policy) in &self.classes {
            if policy.limit == 0 || policy.window_secs == 0 {
                return Err(GatewayError::InvalidRateLimit(name.clone()));
            }
        }
        if !self.classes.contains_key(&self.default_class) {
            return Err(GatewayError::UnknownEndpointClass(self.default_class.clone()));
        }
        for route in &self.routes {
            if !route.prefix.starts_with('/') {
                return Err(GatewayError::InvalidPath(route.prefix.clone()));
            }
            if !self.classes.contains_key(&route.class) {
                return Err(GatewayError::UnknownEndpointClass(route.class.clone()));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CORS, CSP and locale
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins (`scheme://host[:port]`) allowed besides same-origin.
    pub allowed_origins: Vec<String>,
}

fn default_csp() -> BTreeMap<String, Vec<String>> {
    let sources = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    BTreeMap::from([
        ("default-src".to_string(), sources(&["'self'"])),
        (
            "script-src".to_string(),
            sources(&["'self'", "'unsafe-inline'"]),
        ),
        (
            "style-src".to_string(),
            sources(&["'self'", "'unsafe-inline'"]),
        ),
        (
            "img-src".to_string(),
            sources(&["'self'", "data:", "blob:"]),
        ),
        ("font-src".to_string(), sources(&["'self'", "data:"])),
        ("connect-src".to_string(), sources(&["'self'"])),
        ("frame-ancestors".to_string(), sources(&["'none'"])),
        ("base-uri".to_string(), sources(&["'self'"])),
        ("form-action".to_string(), sources(&["'self'"])),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub locales: Vec<String>,
    pub default_locale: String,
    /// Redirect page paths without a locale prefix to the default locale.
    pub redirect: bool,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en".to_string(), "zh".to_string()],
            default_locale: "en".to_string(),
            redirect: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AdmissionConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level admission configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Paths under this prefix are API paths.
    pub api_prefix: String,
    /// Rewritten to `api_prefix` before any policy runs.
    pub versioned_prefix: String,
    pub session: SessionConfig,
    /// POST endpoints that refuse to run without a valid session.
    pub session_required: Vec<String>,
    /// POST endpoints exempt from the JSON content-type rule.
    pub content_type_exempt: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    /// Content-Security-Policy directive name to allowed sources.
    pub csp: BTreeMap<String, Vec<String>>,
    pub locale: LocaleConfig,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            versioned_prefix: "/api/v1".to_string(),
            session: SessionConfig::default(),
            session_required: vec![
                "/api/questions/generate".to_string(),
                "/api/analysis".to_string(),
            ],
            content_type_exempt: vec!["/api/admin/logout".to_string()],
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            csp: default_csp(),
            locale: LocaleConfig::default(),
        }
    }
}

impl AdmissionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: allow an extra CORS origin.
    pub fn with_allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors.allowed_origins.push(origin.into());
        self
    }

    /// Builder: replace the policy of one endpoint class.
    pub fn with_class(mut self, class: impl Into<String>, policy: RateLimitPolicy) -> Self {
        self.rate_limit.classes.insert(class.into(), policy);
        self
    }

    /// Builder: never count this client address.
    pub fn with_whitelisted_ip(mut self, ip: impl Into<String>) -> Self {
        self.rate_limit.whitelist.push(ip.into());
        self
    }

    /// Builder: toggle locale redirects for page paths.
    pub fn with_locale_redirect(mut self, enabled: bool) -> Self {
        self.locale.redirect = enabled;
        self
    }

    /// `true` for paths handled by the API router.
    pub fn is_api_path(&self, path: &str) -> bool {
        super::types::path_matches(path, &self.api_prefix)
    }

    /// Validate all structural invariants of this configuration.
    ///
    /// Returns the *first* detected [`GatewayError`].
    pub fn validate(&self) -> Result<(), GatewayError> {
        for path in [&self.api_prefix, &self.versioned_prefix]
            .into_iter()
            .chain(&self.session_required)
            .chain(&self.content_type_exempt)
        {
            if !path.starts_with('/') {
                return Err(GatewayError::InvalidPath(path.clone()));
            }
        }
        if !super::types::path_matches(&self.versioned_prefix, &self.api_prefix)
            || self.versioned_prefix == self.api_prefix
        {
            return Err(GatewayError::VersionPrefixOutsideApi {
                api: self.api_prefix.clone(),
                versioned: self.versioned_prefix.clone(),
            });
        }

        if self.session.ttl_secs == 0 {
            return Err(GatewayError::InvalidSessionTtl);
        }
        let name = &self.session.cookie_name;
        if name.is_empty()
            || name
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '=' | ';' | ',' | '"'))
        {
            return Err(GatewayError::InvalidCookieName(name.clone()));
        }

        self.rate_limit.validate()?;

        if self.locale.redirect && !self.locale.locales.contains(&self.locale.default_locale) {
            return Err(GatewayError::UnknownDefaultLocale(
                self.locale.default_locale.clone(),
            ));
        }
        Ok(())
    }
}
