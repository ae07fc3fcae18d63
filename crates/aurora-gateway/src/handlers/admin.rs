//! Admin panel endpoints
//!
//! POST /api/admin/login       - exchange the password for an admin cookie
//! POST /api/admin/logout      - clear the admin cookie
//! GET  /api/admin/session     - whether the caller is signed in
//! GET  /api/admin/questions   - stored question bank for a locale
//! POST /api/admin/questions   - replace the stored question bank
//! GET  /api/admin/stats       - usage counters
//! GET  /api/admin/ai-config   - active AI settings (never the key)
//! POST /api/admin/ai-config   - update and persist AI settings
//!
//! Everything except login, logout and session requires an admin credential
//! in the `aurora_admin_session` cookie or an `Authorization: Bearer` header.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

use super::questions::{LocaleQuery, locale_bank_key};
use super::{client_fingerprint, cookie_header, resolve_locale};
use crate::auth::{ADMIN_COOKIE, ADMIN_TTL_SECS};
use crate::backend::AiSettings;
use crate::envelope::ApiSuccess;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::personality::{Question, validate_bank};
use crate::session::{format_clear_cookie, format_set_cookie};
use crate::state::{AppState, UsageStats};
use crate::store::{KEY_AI_CONFIG, KEY_RESULTS};
use aurora_kernel::gateway::find_cookie;

/// Bounds accepted for AI settings.
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const MAX_AI_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct BankUpdate {
    pub questions: Vec<Question>,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: UsageStats,
    /// Length of the stored results log.
    pub stored_results: usize,
}

/// AI settings as shown to the admin.
#[derive(Debug, Serialize)]
pub struct AiConfigView {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_key_set: bool,
    pub configured: bool,
}

/// Partial update; absent fields keep their value. An empty `api_key`
/// removes the key.
#[derive(Debug, Default, Deserialize)]
pub struct AiConfigUpdate {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub api_key: Option<String>,
}

impl AiConfigUpdate {
    fn apply(self, mut settings: AiSettings) -> Result<AiSettings, ApiError> {
        if let Some(base_url) = self.base_url {
            settings.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = self.model {
            settings.model = model.trim().to_string();
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            settings.timeout_secs = timeout_secs;
        }
        if let Some(api_key) = self.api_key {
            let api_key = api_key.trim();
            settings.api_key = (!api_key.is_empty()).then(|| api_key.to_string());
        }

        if !(settings.base_url.starts_with("https://") || settings.base_url.starts_with("http://"))
        {
            return Err(ApiError::BadRequest(
                "base_url must be an http(s) URL".into(),
            ));
        }
        if settings.model.is_empty() {
            return Err(ApiError::BadRequest("model must not be empty".into()));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&settings.temperature) {
            return Err(ApiError::BadRequest(format!(
                "temperature must be between 0 and {MAX_TEMPERATURE}"
            )));
        }
        if !(1..=MAX_AI_TIMEOUT_SECS).contains(&settings.timeout_secs) {
            return Err(ApiError::BadRequest(format!(
                "timeout_secs must be between 1 and {MAX_AI_TIMEOUT_SECS}"
            )));
        }
        Ok(settings)
    }
}

fn ai_view(state: &AppState) -> AiConfigView {
    let settings = state.ai.settings();
    AiConfigView {
        api_key_set: settings.has_api_key(),
        configured: state.ai.provider().is_configured(),
        base_url: settings.base_url,
        model: settings.model,
        temperature: settings.temperature,
        timeout_secs: settings.timeout_secs,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential handling
// ─────────────────────────────────────────────────────────────────────────────

/// Bearer token if present, otherwise the admin cookie.
fn admin_credential(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    bearer.or_else(|| find_cookie(&cookie_header(headers), ADMIN_COOKIE).map(str::to_string))
}

fn is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    state.admin.is_authorized(
        admin_credential(headers).as_deref(),
        &client_fingerprint(headers),
    )
}

/// Gate for every protected admin endpoint.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    if !state.admin.is_configured() {
        return Err(ApiError::NotConfigured(
            "admin access is not configured".into(),
        ));
    }
    if !is_admin(state, headers) {
        return Err(ApiError::Unauthorized("admin login required".into()));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if !state.admin.is_configured() {
        return Err(ApiError::NotConfigured(
            "admin access is not configured".into(),
        ));
    }
    let client = client_fingerprint(&headers);
    let Some(token) = state.admin.authenticate(&req.password, &client) else {
        warn!(client_ip = %client.ip, "admin login failed");
        return Err(ApiError::Unauthorized("invalid password".into()));
    };
    info!(client_ip = %client.ip, "admin signed in");

    let cookie = format_set_cookie(ADMIN_COOKIE, &token, ADMIN_TTL_SECS, state.secure_cookies);
    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiSuccess(json!({
            "authenticated": true,
            "token": token,
            "expires_in": ADMIN_TTL_SECS,
        })),
    ))
}

/// POST /api/admin/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            format_clear_cookie(ADMIN_COOKIE, state.secure_cookies),
        )],
        ApiSuccess(json!({ "authenticated": false })),
    )
}

/// GET /api/admin/session
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiSuccess<SessionStatus> {
    ApiSuccess(SessionStatus {
        authenticated: is_admin(&state, &headers),
        configured: state.admin.is_configured(),
    })
}

/// GET /api/admin/questions
pub async fn get_bank(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<ApiSuccess<Value>> {
    require_admin(&state, &headers)?;
    let key = bank_key(&state, query.locale.as_deref())?;
    let questions = state.store.read(&key).await?.unwrap_or_else(|| json!([]));
    Ok(ApiSuccess(json!({ "key": key, "questions": questions })))
}

/// POST /api/admin/questions
pub async fn put_bank(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<BankUpdate>,
) -> ApiResult<ApiSuccess<Value>> {
    require_admin(&state, &headers)?;
    validate_bank(&req.questions)?;
    let key = bank_key(&state, req.locale.as_deref())?;
    state
        .store
        .write(&key, &serde_json::to_value(&req.questions)?)
        .await?;
    info!(key = %key, count = req.questions.len(), "question bank replaced");
    Ok(ApiSuccess(json!({ "key": key, "count": req.questions.len() })))
}

/// Per-locale key when a locale is named, the shared bank otherwise.
fn bank_key(state: &AppState, locale: Option<&str>) -> ApiResult<String> {
    match locale {
        Some(locale) => Ok(locale_bank_key(&resolve_locale(state, Some(locale))?)),
        None => Ok(crate::store::KEY_QUESTIONS.to_string()),
    }
}

/// GET /api/admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ApiSuccess<StatsResponse>> {
    require_admin(&state, &headers)?;
    let stored_results = match state.store.read(KEY_RESULTS).await? {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    };
    Ok(ApiSuccess(StatsResponse {
        stats: state.stats().await?,
        stored_results,
    }))
}

/// GET /api/admin/ai-config
pub async fn get_ai_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ApiSuccess<AiConfigView>> {
    require_admin(&state, &headers)?;
    Ok(ApiSuccess(ai_view(&state)))
}

/// POST /api/admin/ai-config
pub async fn put_ai_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(update): ApiJson<AiConfigUpdate>,
) -> ApiResult<ApiSuccess<AiConfigView>> {
    require_admin(&state, &headers)?;
    let settings = update.apply(state.ai.settings())?;
    let persisted = serde_json::to_value(&settings)?;
    state
        .ai
        .configure(settings)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state.store.write(KEY_AI_CONFIG, &persisted).await?;
    Ok(ApiSuccess(ai_view(&state)))
}

/// Build the admin router sub-tree
pub fn admin_router() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/session", get(session))
        .route("/api/admin/questions", get(get_bank).post(put_bank))
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/ai-config", get(get_ai_config).post(put_ai_config))
}
