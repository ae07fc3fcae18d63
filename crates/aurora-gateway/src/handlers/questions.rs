//! Question bank endpoints
//!
//! GET  /api/questions           - the active bank for a locale
//! POST /api/questions/generate  - ask the AI provider for a fresh batch

use axum::{
    extract::{Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use super::resolve_locale;
use crate::envelope::ApiSuccess;
use crate::error::{ApiError, ApiJson, ApiResult};
use crate::personality::{
    DEFAULT_GENERATED_QUESTIONS, MAX_GENERATED_QUESTIONS, Question, default_questions,
    parse_generated_questions, question_prompt,
};
use crate::state::AppState;
use crate::store::KEY_QUESTIONS;

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

/// Where the returned bank came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BankSource {
    /// Stored for the requested locale.
    Locale,
    /// The shared stored bank.
    Stored,
    Builtin,
    Generated,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
    pub source: BankSource,
    pub locale: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub count: Option<usize>,
    pub locale: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Store key of the per-locale bank.
pub fn locale_bank_key(locale: &str) -> String {
    format!("{KEY_QUESTIONS}-{locale}")
}

/// GET /api/questions
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<ApiSuccess<QuestionsResponse>> {
    let locale = resolve_locale(&state, query.locale.as_deref())?;

    let mut found = None;
    for (key, source) in [
        (locale_bank_key(&locale), BankSource::Locale),
        (KEY_QUESTIONS.to_string(), BankSource::Stored),
    ] {
        if let Some(value) = state.store.read(&key).await? {
            let questions: Vec<Question> = serde_json::from_value(value)
                .map_err(|e| ApiError::Internal(format!("stored bank '{key}' is corrupt: {e}")))?;
            if !questions.is_empty() {
                found = Some((questions, source));
                break;
            }
        }
    }
    let (questions, source) = found.unwrap_or_else(|| (default_questions(), BankSource::Builtin));

    Ok(ApiSuccess(QuestionsResponse {
        questions,
        source,
        locale,
    }))
}

/// POST /api/questions/generate
#[instrument(skip_all)]
pub async fn generate_questions(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<ApiSuccess<QuestionsResponse>> {
    let count = req.count.unwrap_or(DEFAULT_GENERATED_QUESTIONS);
    if !(1..=MAX_GENERATED_QUESTIONS).contains(&count) {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {MAX_GENERATED_QUESTIONS}"
        )));
    }
    let locale = resolve_locale(&state, req.locale.as_deref())?;

    let provider = state.ai.provider();
    let completion = provider
        .complete(state.ai.request(question_prompt(count, &locale)))
        .await?;
    let mut questions = parse_generated_questions(&completion)?;
    questions.truncate(count);

    state
        .update_stats(|s| s.questions_generated += questions.len() as u64)
        .await?;
    info!(count = questions.len(), locale = %locale, "generated question batch");

    Ok(ApiSuccess(QuestionsResponse {
        questions,
        source: BankSource::Generated,
        locale,
    }))
}

/// Build the questions router sub-tree
pub fn questions_router() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/api/questions", get(list_questions))
        .route("/api/questions/generate", post(generate_questions))
}
