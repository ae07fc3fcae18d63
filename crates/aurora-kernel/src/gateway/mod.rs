//! Admission gateway kernel contract.
//!
//! This module defines the *trait interfaces and configuration types* of the
//! request-admission layer. No concrete implementations live here; those
//! belong in `aurora-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              aurora-kernel  (this module)                   │
//! │  AdmissionFilter trait   RateLimitStore trait               │
//! │  SecretProvider trait    AdmissionConfig + validate()       │
//! │  AdmissionRequest/Context  ErrorCode + envelopes            │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              aurora-gateway  (runtime crate)                │
//! │  SessionCodec          InMemoryRateLimitStore + RateLimiter │
//! │  Path/Session/RateLimit/Locale/Policy/Headers/Logging       │
//! │  filters, FilterPipeline, AdmissionGateway (axum)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use aurora_kernel::gateway::{AdmissionConfig, RateLimitPolicy};
//!
//! let config = AdmissionConfig::new()
//!     .with_allowed_origin("https://quiz.example.com")
//!     .with_class("general", RateLimitPolicy::new(120, 60));
//!
//! config.validate().expect("admission config is valid");
//! ```

pub mod envelope;
pub mod error;
pub mod filter;
pub mod rate_limit;
pub mod session;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use envelope::{API_VERSION, ErrorCode, ErrorDetail, ErrorEnvelope, SuccessEnvelope};
pub use error::GatewayError;
pub use filter::{AdmissionFilter, FilterAction, FilterOrder, Rejection};
pub use rate_limit::{
    RateLimitDecision, RateLimitPolicy, RateLimitRecord, RateLimitStore, apply_hit,
};
pub use session::{
    IssuedSession, SESSION_COOKIE, SESSION_TTL_SECS, SecretProvider, SessionClaims,
    SessionVerification,
};
pub use validation::{
    AdmissionConfig, CorsConfig, EndpointRoute, LocaleConfig, RateLimitConfig, SessionConfig,
};

// types module is pub so implementors in aurora-gateway can use the structs
pub mod types;
pub use types::{
    AdmissionContext, AdmissionOutcome, AdmissionRequest, ClientFingerprint, HeaderOp,
    HeaderPatch, HttpMethod, SessionStatus, SyntheticResponse, UNKNOWN_CLIENT_IP, find_cookie,
    path_matches, resolve_client_ip,
};
