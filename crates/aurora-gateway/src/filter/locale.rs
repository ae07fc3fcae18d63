//! Locale routing for page paths.
//!
//! Page requests without a known locale prefix are redirected to the default
//! locale (`/quiz` becomes `/en/quiz`). API paths and static assets are left
//! alone.

use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, FilterAction, FilterOrder, GatewayError, LocaleConfig,
    path_matches,
};

/// Path prefixes served verbatim from the static directory.
const ASSET_PREFIXES: &[&str] = &["/assets", "/static", "/_next", "/favicon.ico", "/robots.txt"];

pub struct LocaleFilter {
    config: LocaleConfig,
    api_prefix: String,
}

impl LocaleFilter {
    pub fn new(config: LocaleConfig, api_prefix: impl Into<String>) -> Self {
        Self {
            config,
            api_prefix: api_prefix.into(),
        }
    }

    fn is_asset(path: &str) -> bool {
        ASSET_PREFIXES.iter().any(|p| path_matches(path, p))
            || path
                .rsplit('/')
                .next()
                .is_some_and(|last| last.contains('.'))
    }

    /// Redirect target for `path`, or `None` when it needs no locale.
    pub fn redirect_target(&self, path: &str, query: Option<&str>) -> Option<String> {
        if !self.config.redirect
            || path_matches(path, &self.api_prefix)
            || Self::is_asset(path)
        {
            return None;
        }
        let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
        if self.config.locales.iter().any(|l| l == first) {
            return None;
        }
        let rest = if path == "/" { "" } else { path };
        let mut target = format!("/{}{}", self.config.default_locale, rest);
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(q);
        }
        Some(target)
    }
}

#[async_trait]
impl AdmissionFilter for LocaleFilter {
    fn name(&self) -> &str {
        "locale"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::ROUTING
    }

    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        Ok(
            match self.redirect_target(&ctx.request.path, ctx.request.query.as_deref()) {
                Some(target) => FilterAction::Redirect(target),
                None => FilterAction::Continue,
            },
        )
    }
}
