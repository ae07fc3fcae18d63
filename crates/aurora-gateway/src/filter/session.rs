//! Session verification, mandatory-session enforcement and cookie issuance.
//!
//! On the request path the session cookie is verified and the result stored
//! in `ctx.session`. POSTs to session-required endpoints without a valid
//! session are rejected with `SESSION_REQUIRED`. On the response path a fresh
//! cookie is issued when the caller lacked a valid session and the request was
//! either passed through or rejected for that very reason.

use crate::session::{SessionCodec, format_set_cookie};
use async_trait::async_trait;
use aurora_kernel::gateway::{
    AdmissionContext, AdmissionFilter, AdmissionOutcome, ErrorCode, FilterAction, FilterOrder,
    GatewayError, HeaderPatch, HttpMethod, Rejection, SessionConfig, SessionStatus,
    SessionVerification, path_matches,
};
use std::sync::Arc;
use tracing::{debug, error};

pub struct SessionFilter {
    codec: Arc<SessionCodec>,
    cookie_name: String,
    secure_cookie: bool,
    required: Vec<String>,
}

impl SessionFilter {
    pub fn new(codec: Arc<SessionCodec>, config: &SessionConfig, required: Vec<String>) -> Self {
        Self {
            codec,
            cookie_name: config.cookie_name.clone(),
            secure_cookie: config.secure_cookie,
            required,
        }
    }

    fn is_required(&self, ctx: &AdmissionContext) -> bool {
        ctx.request.method == HttpMethod::Post
            && self
                .required
                .iter()
                .any(|prefix| path_matches(&ctx.request.path, prefix))
    }

    fn should_issue(ctx: &AdmissionContext) -> bool {
        !ctx.session.is_valid()
            && matches!(
                ctx.outcome,
                AdmissionOutcome::Forwarded
                    | AdmissionOutcome::Redirected
                    | AdmissionOutcome::Rejected(ErrorCode::SessionRequired)
            )
    }
}

#[async_trait]
impl AdmissionFilter for SessionFilter {
    fn name(&self) -> &str {
        "session"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::SESSION
    }

    async fn on_request(&self, ctx: &mut AdmissionContext) -> Result<FilterAction, GatewayError> {
        ctx.session = match ctx.request.cookie(&self.cookie_name) {
            None | Some("") => SessionStatus::Missing,
            Some(token) => match self.codec.verify(token, &ctx.request.fingerprint()) {
                SessionVerification::Valid { sid } => SessionStatus::Valid { sid },
                SessionVerification::Invalid => SessionStatus::Invalid,
            },
        };

        if !ctx.session.is_valid() && self.is_required(ctx) {
            debug!(
                request_id = %ctx.request.id,
                path = %ctx.request.path,
                session = ?ctx.session,
                "session required"
            );
            return Ok(FilterAction::Reject(Rejection::new(
                ErrorCode::SessionRequired,
                "a valid session is required; retry with the issued session cookie",
            )));
        }
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &AdmissionContext,
        headers: &mut HeaderPatch,
    ) -> Result<(), GatewayError> {
        if !Self::should_issue(ctx) {
            return Ok(());
        }
        match self.codec.issue(&ctx.request.fingerprint()) {
            Ok(issued) => headers.append(
                "set-cookie",
                format_set_cookie(
                    &self.cookie_name,
                    &issued.token,
                    self.codec.ttl_secs(),
                    self.secure_cookie,
                ),
            ),
            // The response still goes out; the next request retries issuance.
            Err(e) => error!(request_id = %ctx.request.id, error = %e, "failed to issue session"),
        }
        Ok(())
    }
}
