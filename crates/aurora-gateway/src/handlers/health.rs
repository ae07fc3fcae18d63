//! Liveness endpoint
//!
//! GET /api/health - the process is up; reports whether AI is configured

use axum::{extract::State, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::envelope::ApiSuccess;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> ApiSuccess<Value> {
    ApiSuccess(json!({
        "status": "ok",
        "service": "aurora-gateway",
        "ai_configured": state.ai.provider().is_configured(),
    }))
}

/// Build the health router sub-tree
pub fn health_router() -> axum::Router<Arc<AppState>> {
    axum::Router::new().route("/api/health", get(health))
}
