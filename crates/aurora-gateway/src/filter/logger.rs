//! Structured access-logging filter.
//!
//! Emits `tracing` events on both the request and response path, recording
//! request id, method, path, session state, admission outcome, status and
//! round-trip latency.

use super::{ATTR_START_MS, ATTR_STATUS};
use crate::rate_limit::now_ms;
use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, FilterAction, FilterOrder, GatewayError, HeaderPatch,
};
use tracing::{debug, error, info};

/// Logging filter: records inbound requests and outbound responses.
#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdmissionFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        debug!(
            request_id = %ctx.request.id,
            method     = ctx.request.method.as_str(),
            path       = %ctx.request.path,
            original   = %ctx.original_path,
            session    = ?ctx.session,
            class      = ?ctx.endpoint_class,
            "→ admitted request"
        );
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &AdmissionContext,
        _headers: &mut HeaderPatch,
    ) -> Result<(), GatewayError> {
        let start_ms: u64 = ctx.get_attr(ATTR_START_MS).unwrap_or_else(now_ms);
        let latency_ms = now_ms().saturating_sub(start_ms);
        let status: u16 = ctx.get_attr(ATTR_STATUS).unwrap_or_default();

        if status >= 500 {
            error!(
                request_id = %ctx.request.id,
                method     = ctx.request.method.as_str(),
                path       = %ctx.original_path,
                status,
                outcome    = ?ctx.outcome,
                latency_ms,
                "← error response"
            );
        } else {
            info!(
                request_id = %ctx.request.id,
                method     = ctx.request.method.as_str(),
                path       = %ctx.original_path,
                status,
                outcome    = ?ctx.outcome,
                latency_ms,
                "← response"
            );
        }
        Ok(())
    }
}
