//! Test result submission
//!
//! POST /api/results - score a set of answers and record the outcome

use axum::{Extension, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::resolve_locale;
use crate::admission::AdmissionInfo;
use crate::envelope::ApiSuccess;
use crate::error::{ApiJson, ApiResult};
use crate::personality::{Answer, DimensionScore, compute_type};
use crate::state::AppState;
use crate::store::KEY_RESULTS;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<Answer>,
    pub locale: Option<String>,
}

/// One line of the `results` document.
#[derive(Debug, Serialize)]
struct ResultRecord<'a> {
    id: &'a str,
    mbti_type: &'a str,
    dimensions: &'a [DimensionScore],
    answer_count: usize,
    locale: &'a str,
    session: Option<&'a str>,
    created_at: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub result_id: String,
    pub mbti_type: String,
    pub dimensions: Vec<DimensionScore>,
}

/// POST /api/results
pub async fn submit_result(
    State(state): State<Arc<AppState>>,
    admission: Option<Extension<AdmissionInfo>>,
    ApiJson(req): ApiJson<SubmitRequest>,
) -> ApiResult<ApiSuccess<SubmitResponse>> {
    let locale = resolve_locale(&state, req.locale.as_deref())?;
    let result = compute_type(&req.answers)?;
    let result_id = uuid::Uuid::new_v4().to_string();
    let sid = admission.as_ref().and_then(|Extension(info)| info.sid.as_deref());

    let record = ResultRecord {
        id: &result_id,
        mbti_type: &result.mbti_type,
        dimensions: &result.dimensions,
        answer_count: req.answers.len(),
        locale: &locale,
        session: sid,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    let total = state
        .store
        .append(KEY_RESULTS, serde_json::to_value(&record)?)
        .await?;
    state
        .update_stats(|s| {
            s.results += 1;
            *s.types.entry(result.mbti_type.clone()).or_default() += 1;
        })
        .await?;
    debug!(result_id = %result_id, mbti_type = %result.mbti_type, total, "result recorded");

    Ok(ApiSuccess(SubmitResponse {
        result_id,
        mbti_type: result.mbti_type,
        dimensions: result.dimensions,
    }))
}

/// Build the results router sub-tree
pub fn results_router() -> axum::Router<Arc<AppState>> {
    axum::Router::new().route("/api/results", post(submit_result))
}
