//! Transport contract for API paths: method allow-list, JSON bodies and
//! CORS preflight.

use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, ErrorCode, FilterAction, FilterOrder, GatewayError,
    HttpMethod, Rejection, SyntheticResponse, path_matches,
};

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const JSON_MEDIA_TYPE: &str = "application/json";

pub struct TransportPolicyFilter {
    api_prefix: String,
    content_type_exempt: Vec<String>,
}

impl TransportPolicyFilter {
    pub fn new(api_prefix: impl Into<String>, content_type_exempt: Vec<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            content_type_exempt,
        }
    }
}

#[async_trait]
impl AdmissionFilter for TransportPolicyFilter {
    fn name(&self) -> &str {
        "transport-policy"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::POLICY
    }

    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        let path = &ctx.request.path;
        if !path_matches(path, &self.api_prefix) {
            return Ok(FilterAction::Continue);
        }

        match &ctx.request.method {
            HttpMethod::Options => Ok(FilterAction::Respond(SyntheticResponse::new(204))),
            HttpMethod::Get => Ok(FilterAction::Continue),
            HttpMethod::Post => {
                let exempt = self
                    .content_type_exempt
                    .iter()
                    .any(|p| path_matches(path, p));
                if exempt || ctx.request.media_type().as_deref() == Some(JSON_MEDIA_TYPE) {
                    Ok(FilterAction::Continue)
                } else {
                    Ok(FilterAction::Reject(Rejection::new(
                        ErrorCode::UnsupportedMediaType,
                        "request body must be application/json",
                    )))
                }
            }
            other => Ok(FilterAction::Reject(
                Rejection::new(
                    ErrorCode::MethodNotAllowed,
                    format!("method {} is not allowed", other.as_str()),
                )
                .with_header("allow", ALLOWED_METHODS),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_kernel::gateway::AdmissionRequest;

    fn filter() -> TransportPolicyFilter {
        TransportPolicyFilter::new("/api", vec!["/api/admin/logout".into()])
    }

    async fn run(req: AdmissionRequest) -> FilterAction {
        filter()
            .on_request(&mut AdmissionContext::new(req))
            .await
            .unwrap()
    }

    fn code(action: FilterAction) -> Option<ErrorCode> {
        match action {
            FilterAction::Reject(r) => Some(r.code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn disallowed_methods_get_405_with_allow() {
        for m in ["PUT", "DELETE", "PATCH", "HEAD", "TRACE"] {
            let action = run(AdmissionRequest::new("r", HttpMethod::parse(m), "/api/results")).await;
            match action {
                FilterAction::Reject(r) => {
                    assert_eq!(r.code, ErrorCode::MethodNotAllowed);
                    assert_eq!(r.headers, vec![("allow".into(), ALLOWED_METHODS.into())]);
                }
                other => panic!("{m}: unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn post_requires_json() {
        let plain = AdmissionRequest::new("r", HttpMethod::Post, "/api/results")
            .with_header("content-type", "text/plain");
        assert_eq!(code(run(plain).await), Some(ErrorCode::UnsupportedMediaType));

        let none = AdmissionRequest::new("r", HttpMethod::Post, "/api/results");
        assert_eq!(code(run(none).await), Some(ErrorCode::UnsupportedMediaType));

        let json = AdmissionRequest::new("r", HttpMethod::Post, "/api/results")
            .with_header("content-type", "Application/JSON; charset=utf-8");
        assert_eq!(run(json).await, FilterAction::Continue);
    }

    #[tokio::test]
    async fn logout_is_exempt_from_content_type() {
        let req = AdmissionRequest::new("r", HttpMethod::Post, "/api/admin/logout");
        assert_eq!(run(req).await, FilterAction::Continue);
    }

    #[tokio::test]
    async fn preflight_answers_204() {
        let req = AdmissionRequest::new("r", HttpMethod::Options, "/api/analysis");
        assert_eq!(
            run(req).await,
            FilterAction::Respond(SyntheticResponse::new(204))
        );
    }

    #[tokio::test]
    async fn pages_are_not_policed() {
        let req = AdmissionRequest::new("r", HttpMethod::Delete, "/en/quiz");
        assert_eq!(run(req).await, FilterAction::Continue);
    }
}
