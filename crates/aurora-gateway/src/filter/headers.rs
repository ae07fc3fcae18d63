//! Security and CORS response headers.
//!
//! Security headers go on every response. CORS headers are added only when
//! the request `Origin` is the serving host itself or is on the allow-list;
//! the allowed origin is echoed, never `*`.

use super::policy::ALLOWED_METHODS;
use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, CorsConfig, FilterAction, FilterOrder, GatewayError,
    HeaderPatch,
};
use std::collections::BTreeMap;

pub struct SecurityHeadersFilter {
    content_security_policy: String,
    cors: CorsConfig,
}

impl SecurityHeadersFilter {
    pub fn new(csp: &BTreeMap<String, Vec<String>>, cors: CorsConfig) -> Self {
        Self {
            content_security_policy: render_csp(csp),
            cors,
        }
    }

    pub fn content_security_policy(&self) -> &str {
        &self.content_security_policy
    }

    /// Whether `origin` may read responses for a request sent to `host`.
    pub fn origin_allowed(&self, origin: &str, host: Option<&str>) -> bool {
        let origin = origin.trim_end_matches('/');
        let same_origin = origin
            .split_once("://")
            .map(|(_, authority)| authority)
            .zip(host)
            .is_some_and(|(authority, host)| authority.eq_ignore_ascii_case(host));
        same_origin
            || self
                .cors
                .allowed_origins
                .iter()
                .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(origin))
    }
}

/// `directive src src; directive src` in map order.
pub fn render_csp(directives: &BTreeMap<String, Vec<String>>) -> String {
    directives
        .iter()
        .map(|(name, sources)| {
            if sources.is_empty() {
                name.clone()
            } else {
                format!("{} {}", name, sources.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl AdmissionFilter for SecurityHeadersFilter {
    fn name(&self) -> &str {
        "security-headers"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::HEADERS
    }

    async fn on_request(&self, _ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &AdmissionContext,
        headers: &mut HeaderPatch,
    ) -> Result<(), GatewayError> {
        headers.set("content-security-policy", &self.content_security_policy);
        headers.set("x-frame-options", "DENY");
        headers.set("x-content-type-options", "nosniff");
        headers.set("referrer-policy", "strict-origin-when-cross-origin");
        headers.set("permissions-policy", "camera=(), microphone=(), geolocation=()");
        headers.set("x-xss-protection", "1; mode=block");

        let origin = ctx
            .request
            .header("origin")
            .filter(|origin| self.origin_allowed(origin, ctx.request.header("host")));
        if let Some(origin) = origin {
            headers.set("access-control-allow-origin", origin);
            headers.set("access-control-allow-methods", ALLOWED_METHODS);
            headers.set("access-control-allow-headers", "Content-Type");
            headers.set("access-control-allow-credentials", "true");
            headers.append("vary", "Origin");
        }
        Ok(())
    }
}
