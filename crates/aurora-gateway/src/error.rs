//! Handler-level errors.
//!
//! Every [`ApiError`] renders as an error envelope whose status is derived
//! from its [`ErrorCode`]. Internal failures are logged here and reach the
//! client only as a generic message.

use crate::envelope::error_response;
use crate::personality::PersonalityError;
use aurora_kernel::gateway::{ErrorCode, ErrorEnvelope};
use aurora_kernel::llm::ProviderError;
use aurora_kernel::storage::StoreError;
use axum::{
    extract::{FromRequest, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::BadRequest(_) => ErrorCode::BadRequest,
            ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::MethodNotAllowed(_) => ErrorCode::MethodNotAllowed,
            ApiError::NotConfigured(_) => ErrorCode::NotConfigured,
            ApiError::Provider(ProviderError::NotConfigured) => ErrorCode::NotConfigured,
            ApiError::Provider(_) => ErrorCode::UpstreamError,
            ApiError::Store(_) | ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Provider(ProviderError::NotConfigured) => {
                "AI provider is not configured".to_string()
            }
            ApiError::Provider(ProviderError::Timeout) => "AI provider timed out".to_string(),
            ApiError::Provider(_) => "AI provider request failed".to_string(),
            ApiError::Store(_) | ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        if matches!(code, ErrorCode::InternalError | ErrorCode::UpstreamError) {
            error!(code = %code, error = %self, "request failed");
        }
        error_response(ErrorEnvelope::new(code, self.public_message()), &[])
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization failed: {e}"))
    }
}

impl From<PersonalityError> for ApiError {
    fn from(e: PersonalityError) -> Self {
        match e {
            PersonalityError::NoQuestionsParsed => {
                ApiError::Provider(ProviderError::InvalidResponse(e.to_string()))
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body extractor whose parse failures become `BAD_REQUEST` envelopes.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn provider_failures_map_to_upstream_or_not_configured() {
        assert_eq!(
            ApiError::from(ProviderError::NotConfigured).code(),
            ErrorCode::NotConfigured
        );
        assert_eq!(
            ApiError::from(ProviderError::Timeout).code(),
            ErrorCode::UpstreamError
        );
        assert_eq!(
            ApiError::from(ProviderError::Upstream {
                status: 500,
                message: "boom".into()
            })
            .code(),
            ErrorCode::UpstreamError
        );
    }

    #[test]
    fn unusable_ai_output_is_an_upstream_failure() {
        assert_eq!(
            ApiError::from(PersonalityError::NoQuestionsParsed).code(),
            ErrorCode::UpstreamError
        );
        assert_eq!(
            ApiError::from(PersonalityError::NoAnswers).code(),
            ErrorCode::BadRequest
        );
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let resp = ApiError::Internal("db password is hunter2".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("INTERNAL_ERROR"));
    }
}
