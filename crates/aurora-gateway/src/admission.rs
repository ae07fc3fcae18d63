//! axum integration of the admission pipeline.
//!
//! [`AdmissionGateway::wrap`] puts the pipeline in front of a router as a
//! service layer rather than a route layer, so path rewrites happen before
//! the router picks a handler.

use crate::envelope::error_response;
use crate::filter::{
    ATTR_STATUS, FilterPipeline, LocaleFilter, LoggingFilter, PathRewriteFilter, RateLimitFilter,
    SecurityHeadersFilter, SessionFilter, TransportPolicyFilter,
};
use crate::rate_limit::RateLimiter;
use crate::session::SessionCodec;
use aurora_kernel::gateway::{
    AdmissionConfig, AdmissionContext, AdmissionFilter, AdmissionRequest, ErrorCode,
    ErrorEnvelope, FilterAction, GatewayError, HeaderOp, HeaderPatch, HttpMethod,
    SecretProvider, SyntheticResponse,
};
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode, Uri, header, uri::PathAndQuery},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower::Layer;
use tracing::warn;
use uuid::Uuid;

/// What handlers learn about an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionInfo {
    pub request_id: String,
    pub client_ip: String,
    /// Verified session id; `None` when the caller had no valid session.
    pub sid: Option<String>,
}

pub struct AdmissionGateway {
    config: AdmissionConfig,
    codec: Arc<SessionCodec>,
    limiter: Arc<RateLimiter>,
    pipeline: FilterPipeline,
}

impl AdmissionGateway {
    /// Validate `config` and assemble the standard filter chain over an
    /// in-memory rate-limit store.
    pub fn new(
        config: AdmissionConfig,
        secret: Arc<dyn SecretProvider>,
    ) -> Result<Self, GatewayError> {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        Self::with_limiter(config, secret, limiter)
    }

    pub fn with_limiter(
        config: AdmissionConfig,
        secret: Arc<dyn SecretProvider>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let codec = Arc::new(SessionCodec::new(secret).with_ttl_secs(config.session.ttl_secs));
        let filters: Vec<Arc<dyn AdmissionFilter>> = vec![
            Arc::new(PathRewriteFilter::new(
                &config.api_prefix,
                &config.versioned_prefix,
            )),
            Arc::new(SessionFilter::new(
                codec.clone(),
                &config.session,
                config.session_required.clone(),
            )),
            Arc::new(RateLimitFilter::new(
                limiter.clone(),
                config.rate_limit.clone(),
                &config.api_prefix,
            )),
            Arc::new(LocaleFilter::new(config.locale.clone(), &config.api_prefix)),
            Arc::new(TransportPolicyFilter::new(
                &config.api_prefix,
                config.content_type_exempt.clone(),
            )),
            Arc::new(SecurityHeadersFilter::new(&config.csp, config.cors.clone())),
            Arc::new(LoggingFilter::new()),
        ];

        Ok(Self {
            config,
            codec,
            limiter,
            pipeline: FilterPipeline::new(filters),
        })
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn codec(&self) -> &Arc<SessionCodec> {
        &self.codec
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }

    /// Put the admission pipeline in front of `inner`.
    pub fn wrap(self: Arc<Self>, inner: Router) -> Router {
        let admitted = from_fn_with_state(self, admission_middleware).layer(inner);
        Router::new().fallback_service(admitted)
    }
}

/// Run the pipeline for one request and decorate whatever response results.
pub async fn admission_middleware(
    State(gateway): State<Arc<AdmissionGateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut ctx = AdmissionContext::new(admission_request(&request));

    let mut response = match gateway.pipeline.run_request(&mut ctx).await {
        FilterAction::Continue => match rewrite_uri(request.uri(), &ctx) {
            Ok(uri) => {
                *request.uri_mut() = uri;
                request.extensions_mut().insert(AdmissionInfo {
                    request_id: ctx.request.id.clone(),
                    client_ip: ctx.request.client_ip(),
                    sid: ctx.session.sid().map(str::to_string),
                });
                next.run(request).await
            }
            Err(e) => {
                warn!(request_id = %ctx.request.id, error = %e, "rewritten path is not a valid URI");
                error_response(
                    ErrorEnvelope::new(ErrorCode::BadRequest, "malformed request path"),
                    &[],
                )
            }
        },
        FilterAction::Reject(rejection) => error_response(
            ErrorEnvelope::new(rejection.code, rejection.message),
            &rejection.headers,
        ),
        FilterAction::Respond(synthetic) => synthetic_response(synthetic),
        FilterAction::Redirect(location) => redirect_response(&location),
    };

    ctx.set_attr(ATTR_STATUS, &response.status().as_u16());
    let patch = gateway.pipeline.run_response(&ctx).await;
    apply_patch(response.headers_mut(), &patch);
    response
}

fn admission_request(request: &Request) -> AdmissionRequest {
    let id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut admission = AdmissionRequest::new(
        id,
        HttpMethod::parse(request.method().as_str()),
        request.uri().path(),
    );
    if let Some(query) = request.uri().query() {
        admission = admission.with_query(query);
    }
    for (name, value) in request.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let joined = match admission.headers.get(name.as_str()) {
            Some(prev) if name == header::COOKIE => format!("{prev}; {value}"),
            Some(prev) => format!("{prev}, {value}"),
            None => value.to_string(),
        };
        admission.headers.insert(name.as_str().to_string(), joined);
    }
    admission
}

fn rewrite_uri(uri: &Uri, ctx: &AdmissionContext) -> Result<Uri, axum::http::Error> {
    if !ctx.path_rewritten() {
        return Ok(uri.clone());
    }
    let path_and_query = match &ctx.request.query {
        Some(q) => format!("{}?{}", ctx.request.path, q),
        None => ctx.request.path.clone(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

fn synthetic_response(synthetic: SyntheticResponse) -> Response {
    let status = StatusCode::from_u16(synthetic.status).unwrap_or(StatusCode::NO_CONTENT);
    let mut response = (status, Body::from(synthetic.body)).into_response();
    let mut patch = HeaderPatch::new();
    for (name, value) in synthetic.headers {
        patch.append(name, value);
    }
    apply_patch(response.headers_mut(), &patch);
    response
}

fn redirect_response(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, value)]).into_response(),
        Err(_) => error_response(
            ErrorEnvelope::new(ErrorCode::BadRequest, "malformed request path"),
            &[],
        ),
    }
}

fn apply_patch(headers: &mut axum::http::HeaderMap, patch: &HeaderPatch) {
    for (op, name, value) in patch.iter() {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            warn!(header = %name, "dropping malformed response header");
            continue;
        };
        match op {
            HeaderOp::Set => {
                headers.insert(name, value);
            }
            HeaderOp::Append => {
                headers.append(name, value);
            }
        }
    }
}
