//! Admission filters and the pipeline that runs them.

mod headers;
mod locale;
mod logger;
mod policy;
mod rate_limit;
mod rewrite;
mod session;

pub use headers::SecurityHeadersFilter;
pub use locale::LocaleFilter;
pub use logger::LoggingFilter;
pub use policy::TransportPolicyFilter;
pub use rate_limit::RateLimitFilter;
pub use rewrite::PathRewriteFilter;
pub use session::SessionFilter;

use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, AdmissionOutcome, ErrorCode, FilterAction, HeaderPatch,
    Rejection,
};
use std::sync::Arc;
use tracing::error;

/// Context attribute holding the request start time (unix ms).
pub const ATTR_START_MS: &str = "admission.start_ms";
/// Context attribute holding the final HTTP status.
pub const ATTR_STATUS: &str = "admission.status";

/// Ordered list of filters executed as a pipeline.
///
/// Filters are sorted by [`FilterOrder`](aurora_kernel::gateway::FilterOrder)
/// in ascending order (lowest value runs first on the request path).
pub struct FilterPipeline {
    filters: Vec<Arc<dyn AdmissionFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline from a list of filters, sorted by their declared order.
    pub fn new(mut filters: Vec<Arc<dyn AdmissionFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run all `on_request` hooks in ascending order, stopping at the first
    /// action other than `Continue`. Records the outcome on `ctx`.
    ///
    /// A failing filter turns into an `INTERNAL_ERROR` rejection.
    pub async fn run_request(&self, ctx: &mut AdmissionContext) -> FilterAction {
        ctx.set_attr(ATTR_START_MS, &crate::rate_limit::now_ms());
        for filter in &self.filters {
            let action = match filter.on_request(ctx).await {
                Ok(FilterAction::Continue) => continue,
                Ok(action) => action,
                Err(e) => {
                    error!(
                        request_id = %ctx.request.id,
                        filter = filter.name(),
                        error = %e,
                        "admission filter failed"
                    );
                    FilterAction::Reject(Rejection::new(
                        ErrorCode::InternalError,
                        "internal server error",
                    ))
                }
            };
            ctx.outcome = match &action {
                FilterAction::Reject(r) => AdmissionOutcome::Rejected(r.code),
                FilterAction::Respond(_) => AdmissionOutcome::Answered,
                FilterAction::Redirect(_) => AdmissionOutcome::Redirected,
                FilterAction::Continue => AdmissionOutcome::Forwarded,
            };
            return action;
        }
        ctx.outcome = AdmissionOutcome::Forwarded;
        FilterAction::Continue
    }

    /// Run every `on_response` hook in descending order and collect the
    /// header decorations. Hook failures are logged and skipped.
    pub async fn run_response(&self, ctx: &AdmissionContext) -> HeaderPatch {
        let mut patch = HeaderPatch::new();
        for filter in self.filters.iter().rev() {
            if let Err(e) = filter.on_response(ctx, &mut patch).await {
                error!(
                    request_id = %ctx.request.id,
                    filter = filter.name(),
                    error = %e,
                    "admission response hook failed"
                );
            }
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aurora_kernel::gateway::{
        AdmissionRequest, FilterOrder, GatewayError, HttpMethod,
    };
    use parking_lot::Mutex;

    struct Probe {
        name: &'static str,
        order: FilterOrder,
        action: FilterAction,
        fail: bool,
        trace: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AdmissionFilter for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> FilterOrder {
            self.order
        }

        async fn on_request(
            &self,
            _ctx: &mut AdmissionContext,
        ) -> Result<FilterAction, GatewayError> {
            self.trace.lock().push(format!("req:{}", self.name));
            if self.fail {
                return Err(GatewayError::FilterFailed {
                    filter: self.name.into(),
                    reason: "probe".into(),
                });
            }
            Ok(self.action.clone())
        }

        async fn on_response(
            &self,
            _ctx: &AdmissionContext,
            headers: &mut HeaderPatch,
        ) -> Result<(), GatewayError> {
            self.trace.lock().push(format!("resp:{}", self.name));
            headers.append("x-probe", self.name);
            Ok(())
        }
    }

    fn probe(
        name: &'static str,
        order: u32,
        action: FilterAction,
        trace: &Arc<Mutex<Vec<String>>>,
    ) -> Arc<dyn AdmissionFilter> {
        Arc::new(Probe {
            name,
            order: FilterOrder(order),
            action,
            fail: false,
            trace: trace.clone(),
        })
    }

    fn ctx() -> AdmissionContext {
        AdmissionContext::new(AdmissionRequest::new("r1", HttpMethod::Get, "/api/health"))
    }

    #[tokio::test]
    async fn request_hooks_ascend_and_response_hooks_descend() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let pipeline = FilterPipeline::new(vec![
            probe("b", 200, FilterAction::Continue, &trace),
            probe("a", 100, FilterAction::Continue, &trace),
        ]);
        assert_eq!(pipeline.names(), vec!["a", "b"]);

        let mut ctx = ctx();
        assert_eq!(pipeline.run_request(&mut ctx).await, FilterAction::Continue);
        assert_eq!(ctx.outcome, AdmissionOutcome::Forwarded);
        pipeline.run_response(&ctx).await;
        assert_eq!(
            *trace.lock(),
            vec!["req:a", "req:b", "resp:b", "resp:a"]
        );
    }

    #[tokio::test]
    async fn short_circuit_still_runs_every_response_hook() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let reject = FilterAction::Reject(Rejection::new(ErrorCode::Forbidden, "no"));
        let pipeline = FilterPipeline::new(vec![
            probe("first", 1, reject.clone(), &trace),
            probe("second", 2, FilterAction::Continue, &trace),
        ]);

        let mut ctx = ctx();
        assert_eq!(pipeline.run_request(&mut ctx).await, reject);
        assert_eq!(ctx.outcome, AdmissionOutcome::Rejected(ErrorCode::Forbidden));

        let patch = pipeline.run_response(&ctx).await;
        assert_eq!(patch.iter().count(), 2);
        assert!(!trace.lock().contains(&"req:second".to_string()));
    }

    #[tokio::test]
    async fn filter_error_becomes_internal_error() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let pipeline = FilterPipeline::new(vec![Arc::new(Probe {
            name: "broken",
            order: FilterOrder(1),
            action: FilterAction::Continue,
            fail: true,
            trace,
        })]);
        let mut ctx = ctx();
        match pipeline.run_request(&mut ctx).await {
            FilterAction::Reject(r) => assert_eq!(r.code, ErrorCode::InternalError),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            ctx.outcome,
            AdmissionOutcome::Rejected(ErrorCode::InternalError)
        );
    }
}
