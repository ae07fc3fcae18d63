//! Request handlers for the `/api` surface
//!
//! Handlers stay thin: admission (sessions, rate limits, transport rules)
//! has already happened by the time they run.

pub mod admin;
pub mod analysis;
pub mod health;
pub mod questions;
pub mod results;

pub use admin::admin_router;
pub use analysis::analysis_router;
pub use health::health_router;
pub use questions::questions_router;
pub use results::results_router;

use crate::error::ApiError;
use crate::state::AppState;
use aurora_kernel::gateway::{ClientFingerprint, resolve_client_ip};
use axum::{
    Router,
    http::{HeaderMap, header},
    routing::any,
};
use std::sync::Arc;

/// Every `/api` route, plus envelope answers for unknown paths and methods.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health_router())
        .merge(questions_router())
        .merge(analysis_router())
        .merge(results_router())
        .merge(admin_router())
        .route("/api", any(not_found))
        .route("/api/{*rest}", any(not_found))
        .method_not_allowed_fallback(method_not_allowed)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such API endpoint".into())
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("method not supported for this endpoint".into())
}

/// Fingerprint inputs of the caller, resolved the same way as admission.
pub(crate) fn client_fingerprint(headers: &HeaderMap) -> ClientFingerprint {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    ClientFingerprint::new(
        resolve_client_ip(get("x-forwarded-for"), get("x-real-ip")),
        get(header::USER_AGENT.as_str()).unwrap_or_default(),
    )
}

/// All `Cookie` headers joined into one string.
pub(crate) fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The requested locale, or the default one; unknown locales are a bad request.
pub(crate) fn resolve_locale(state: &AppState, requested: Option<&str>) -> Result<String, ApiError> {
    match requested.map(str::trim).filter(|l| !l.is_empty()) {
        None => Ok(state.locales.default_locale.clone()),
        Some(locale) if state.supports_locale(locale) => Ok(locale.to_string()),
        Some(locale) => Err(ApiError::BadRequest(format!("unsupported locale '{locale}'"))),
    }
}
