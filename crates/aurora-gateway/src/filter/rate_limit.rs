//! Per-endpoint-class fixed-window rate-limit filter.
//!
//! Only API paths are counted. The key combines the client address, the
//! verified session (if any) and the endpoint class, so the filter must run
//! after the session filter.

use crate::rate_limit::{RateLimiter, now_ms};
use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, ErrorCode, FilterAction, FilterOrder, GatewayError,
    HeaderPatch, RateLimitConfig, Rejection, path_matches,
};
use std::sync::Arc;
use tracing::warn;

pub struct RateLimitFilter {
    limiter: Arc<RateLimiter>,
    config: RateLimitConfig,
    api_prefix: String,
}

impl RateLimitFilter {
    pub fn new(limiter: Arc<RateLimiter>, config: RateLimitConfig, api_prefix: impl Into<String>) -> Self {
        Self {
            limiter,
            config,
            api_prefix: api_prefix.into(),
        }
    }
}

#[async_trait]
impl AdmissionFilter for RateLimitFilter {
    fn name(&self) -> &str {
        "rate-limit"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::RATE_LIMIT
    }

    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        if !path_matches(&ctx.request.path, &self.api_prefix) {
            return Ok(FilterAction::Continue);
        }

        let class = self.config.classify(&ctx.request.path).to_string();
        let policy = *self
            .config
            .policy(&class)
            .ok_or_else(|| GatewayError::UnknownEndpointClass(class.clone()))?;
        let ip = ctx.request.client_ip();
        let key = RateLimiter::key(&ip, ctx.session.sid(), &class);

        let now = now_ms();
        let decision = self.limiter.check_at(&ip, &key, &policy, now).await;
        ctx.endpoint_class = Some(class.clone());
        ctx.rate_limit = Some(decision);

        if decision.allowed {
            return Ok(FilterAction::Continue);
        }
        let retry_after = decision.retry_after_secs(now);
        warn!(
            request_id = %ctx.request.id,
            client = %ip,
            class = %class,
            retry_after,
            "rate limit exceeded"
        );
        Ok(FilterAction::Reject(
            Rejection::new(
                ErrorCode::TooManyRequests,
                format!("Rate limit exceeded. Retry after {retry_after} second(s)."),
            )
            .with_header("retry-after", retry_after.to_string()),
        ))
    }

    async fn on_response(
        &self,
        ctx: &AdmissionContext,
        headers: &mut HeaderPatch,
    ) -> Result<(), GatewayError> {
        if let Some(decision) = &ctx.rate_limit {
            headers.set("x-ratelimit-limit", decision.limit.to_string());
            headers.set("x-ratelimit-remaining", decision.remaining.to_string());
            headers.set("x-ratelimit-reset", decision.reset_at_secs().to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::InMemoryRateLimitStore;
    use aurora_kernel::gateway::{
        AdmissionRequest, HttpMethod, RateLimitPolicy, SessionStatus,
    };

    fn filter(config: RateLimitConfig) -> RateLimitFilter {
        let limiter = Arc::new(RateLimiter::new(Arc::new(InMemoryRateLimitStore::default())));
        RateLimitFilter::new(limiter, config, "/api")
    }

    fn ctx(path: &str, ip: &str) -> AdmissionContext {
        AdmissionContext::new(
            AdmissionRequest::new("r", HttpMethod::Post, path).with_header("x-forwarded-for", ip),
        )
    }

    #[tokio::test]
    async fn blocks_after_class_limit_with_retry_after() {
        let mut config = RateLimitConfig::default();
        config
            .classes
            .insert("analysis".into(), RateLimitPolicy::new(2, 60));
        let f = filter(config);

        for expected_remaining in [1, 0] {
            let mut c = ctx("/api/analysis", "10.1.1.1");
            assert_eq!(f.on_request(&mut c).await.unwrap(), FilterAction::Continue);
            assert_eq!(c.endpoint_class.as_deref(), Some("analysis"));
            assert_eq!(c.rate_limit.unwrap().remaining, expected_remaining);
        }

        let mut c = ctx("/api/analysis/stream", "10.1.1.1");
        match f.on_request(&mut c).await.unwrap() {
            FilterAction::Reject(r) => {
                assert_eq!(r.code, ErrorCode::TooManyRequests);
                let retry: u64 = r.headers[0].1.parse().unwrap();
                assert_eq!(r.headers[0].0, "retry-after");
                assert!(retry > 0 && retry <= 60);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut patch = HeaderPatch::new();
        f.on_response(&c, &mut patch).await.unwrap();
        assert_eq!(patch.get("x-ratelimit-remaining"), Some("0"));
        assert_eq!(patch.get("x-ratelimit-limit"), Some("2"));
    }

    #[tokio::test]
    async fn page_paths_are_not_counted() {
        let f = filter(RateLimitConfig::default());
        let mut c = ctx("/en/results", "10.1.1.1");
        f.on_request(&mut c).await.unwrap();
        assert!(c.rate_limit.is_none());
        assert_eq!(f.limiter.store().len().await, 0);
    }

    #[tokio::test]
    async fn session_scopes_the_counter() {
        let mut config = RateLimitConfig::default();
        config
            .classes
            .insert("general".into(), RateLimitPolicy::new(1, 60));
        let f = filter(config);

        let mut anon = ctx("/api/results", "10.2.2.2");
        f.on_request(&mut anon).await.unwrap();

        let mut with_session = ctx("/api/results", "10.2.2.2");
        with_session.session = SessionStatus::Valid {
            sid: "feedfacecafebeef0011".into(),
        };
        assert_eq!(
            f.on_request(&mut with_session).await.unwrap(),
            FilterAction::Continue
        );
        assert!(f.limiter.store().get("10.2.2.2:feedfacecafebeef:general").await.is_some());
    }
}
