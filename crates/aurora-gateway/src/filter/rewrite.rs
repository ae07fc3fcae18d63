//! Versioned API path normalization: `/api/v1/x` is served as `/api/x`.

use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, FilterAction, FilterOrder, GatewayError, path_matches,
};
use tracing::debug;

pub struct PathRewriteFilter {
    api_prefix: String,
    versioned_prefix: String,
}

impl PathRewriteFilter {
    pub fn new(api_prefix: impl Into<String>, versioned_prefix: impl Into<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            versioned_prefix: versioned_prefix.into(),
        }
    }

    /// Normalized form of `path`, or `None` when it is not versioned.
    pub fn rewrite(&self, path: &str) -> Option<String> {
        if !path_matches(path, &self.versioned_prefix) {
            return None;
        }
        let rest = &path[self.versioned_prefix.len()..];
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let api = self.api_prefix.trim_end_matches('/');
        Some(if rest.is_empty() {
            api.to_string()
        } else {
            format!("{api}/{rest}")
        })
    }
}

#[async_trait]
impl AdmissionFilter for PathRewriteFilter {
    fn name(&self) -> &str {
        "path-rewrite"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::REWRITE
    }

    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        if let Some(path) = self.rewrite(&ctx.request.path) {
            debug!(request_id = %ctx.request.id, from = %ctx.request.path, to = %path, "rewrote versioned path");
            ctx.request.path = path;
        }
        Ok(FilterAction::Continue)
    }
}
