//! Gateway error types for `aurora-kernel`.
//!
//! [`GatewayError`] covers failures detectable at *definition time* (bad
//! prefixes, zero limits, dangling class references) plus the single runtime
//! variant a filter may raise. Filter errors never reach a client verbatim:
//! the pipeline turns them into a generic `INTERNAL_ERROR` envelope.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── Paths ───────────────────────────────────────────────────────────────
    /// A configured path or prefix does not start with `/`.
    #[error("'{0}' must be an absolute path starting with '/'")]
    InvalidPath(String),

    /// The versioned API prefix is not nested under the API prefix.
    #[error("versioned prefix '{versioned}' is not under api prefix '{api}'")]
    VersionPrefixOutsideApi { api: String, versioned: String },

    // ── Session ─────────────────────────────────────────────────────────────
    /// Session lifetime is zero.
    #[error("session ttl must be greater than 0 seconds")]
    InvalidSessionTtl,

    /// Session cookie name is empty or contains reserved characters.
    #[error("invalid session cookie name '{0}'")]
    InvalidCookieName(String),

    // ── Rate limits ─────────────────────────────────────────────────────────
    /// An endpoint class has a zero limit or zero window.
    #[error("rate-limit class '{0}' must have a limit and window greater than 0")]
    InvalidRateLimit(String),

    /// A route or the default class refers to a class that is not defined.
    #[error("rate-limit class '{0}' is not defined")]
    UnknownEndpointClass(String),

    /// Tracked-key ceiling is zero.
    #[error("rate-limit capacity must be greater than 0")]
    InvalidCapacity,

    /// Eviction percentage outside 1..=100.
    #[error("eviction percent must be within 1..=100, got {0}")]
    InvalidEvictionPercent(u8),

    /// Sweep interval is zero.
    #[error("sweep interval must be greater than 0 seconds")]
    InvalidSweepInterval,

    // ── Locale ──────────────────────────────────────────────────────────────
    /// Locale redirect is enabled but the default locale is not listed.
    #[error("default locale '{0}' is not in the configured locales")]
    UnknownDefaultLocale(String),

    // ── Runtime ─────────────────────────────────────────────────────────────
    /// A filter failed while processing a request.
    #[error("filter '{filter}' failed: {reason}")]
    FilterFailed { filter: String, reason: String },
}
