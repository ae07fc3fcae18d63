//! AI personality analysis
//!
//! POST /api/analysis         - full analysis in one envelope
//! POST /api/analysis/stream  - the same text as server-sent `delta` events
//!
//! The streaming variant is not enveloped: failures before the first byte
//! still answer with an error envelope, failures mid-stream arrive as a
//! single `error` event. Every stream ends with a `done` event.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
};
use futures::{Stream, StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{instrument, warn};

use super::resolve_locale;
use crate::envelope::ApiSuccess;
use crate::error::{ApiJson, ApiResult};
use crate::personality::{analysis_prompt, normalize_type};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub mbti_type: String,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub mbti_type: String,
    pub locale: String,
    pub analysis: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/analysis
#[instrument(skip_all)]
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AnalysisRequest>,
) -> ApiResult<ApiSuccess<AnalysisResponse>> {
    let mbti_type = normalize_type(&req.mbti_type)?;
    let locale = resolve_locale(&state, req.locale.as_deref())?;

    let analysis = state
        .ai
        .provider()
        .complete(state.ai.request(analysis_prompt(&mbti_type, &locale)))
        .await?;
    state.update_stats(|s| s.analyses += 1).await?;

    Ok(ApiSuccess(AnalysisResponse {
        mbti_type,
        locale,
        analysis,
    }))
}

/// POST /api/analysis/stream
#[instrument(skip_all)]
pub async fn analyze_stream(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AnalysisRequest>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mbti_type = normalize_type(&req.mbti_type)?;
    let locale = resolve_locale(&state, req.locale.as_deref())?;

    let tokens = state
        .ai
        .provider()
        .stream(state.ai.request(analysis_prompt(&mbti_type, &locale)))
        .await?;
    state.update_stats(|s| s.analyses += 1).await?;

    let events = tokens
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            let event = match item {
                Ok(delta) => delta_event(&delta),
                Err(e) => {
                    warn!(error = %e, "analysis stream failed");
                    *failed = true;
                    Event::default().event("error").data(e.to_string())
                }
            };
            future::ready(Some(Ok(event)))
        })
        .chain(stream::once(future::ready(Ok(
            Event::default().event("done").data("[DONE]"),
        ))));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn delta_event(delta: &str) -> Event {
    Event::default()
        .event("delta")
        .json_data(json!({ "delta": delta }))
        .unwrap_or_else(|_| Event::default().event("delta").data(delta))
}

/// Build the analysis router sub-tree
pub fn analysis_router() -> axum::Router<Arc<AppState>> {
    axum::Router::new()
        .route("/api/analysis", post(analyze))
        .route("/api/analysis/stream", post(analyze_stream))
}
