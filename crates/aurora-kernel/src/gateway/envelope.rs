//! Uniform JSON envelope for every API response.
//!
//! ```text
//! success: { "success": true,  "version": "v1", ...fields }
//! error:   { "success": false, "version": "v1", "error": { "code", "message", "details"? } }
//! ```
//!
//! The HTTP status is derived from [`ErrorCode::status`], never chosen by the
//! caller, so the two cannot disagree.

use serde::{Deserialize, Serialize};

/// API contract version carried in every envelope.
pub const API_VERSION: &str = "v1";

/// Closed set of machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    SessionRequired,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    UnsupportedMediaType,
    TooManyRequests,
    InternalError,
    ServiceUnavailable,
    UpstreamError,
    NotConfigured,
}

impl ErrorCode {
    /// HTTP status that always accompanies this code.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized | ErrorCode::SessionRequired => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::UnsupportedMediaType => 415,
            ErrorCode::TooManyRequests => 429,
            ErrorCode::InternalError => 500,
            ErrorCode::UpstreamError => 502,
            ErrorCode::ServiceUnavailable | ErrorCode::NotConfigured => 503,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::SessionRequired => "SESSION_REQUIRED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            ErrorCode::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::NotConfigured => "NOT_CONFIGURED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `error` object of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Body of every non-2xx API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub version: String,
    pub error: ErrorDetail,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            version: API_VERSION.to_string(),
            error: ErrorDetail {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn status(&self) -> u16 {
        self.error.code.status()
    }
}

/// Body of a successful response. `T` must serialize to a JSON object; its
/// fields are merged next to `success` and `version`.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope<T: Serialize> {
    pub success: bool,
    pub version: &'static str,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            version: API_VERSION,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_envelope_shape() {
        let env = ErrorEnvelope::new(ErrorCode::TooManyRequests, "slow down")
            .with_details(json!({ "retryAfter": 12 }));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(
            v,
            json!({
                "success": false,
                "version": "v1",
                "error": {
                    "code": "TOO_MANY_REQUESTS",
                    "message": "slow down",
                    "details": { "retryAfter": 12 }
                }
            })
        );
        assert_eq!(env.status(), 429);
    }

    #[test]
    fn details_omitted_when_absent() {
        let v = serde_json::to_value(ErrorEnvelope::new(ErrorCode::NotFound, "nope")).unwrap();
        assert!(v["error"].get("details").is_none());
    }

    #[test]
    fn success_fields_are_flattened() {
        let v = serde_json::to_value(SuccessEnvelope::new(json!({ "type": "INTJ" }))).unwrap();
        assert_eq!(v, json!({ "success": true, "version": "v1", "type": "INTJ" }));
    }

    #[test]
    fn codes_and_statuses_agree() {
        let pairs = [
            (ErrorCode::BadRequest, 400),
            (ErrorCode::SessionRequired, 401),
            (ErrorCode::Unauthorized, 401),
            (ErrorCode::Forbidden, 403),
            (ErrorCode::MethodNotAllowed, 405),
            (ErrorCode::UnsupportedMediaType, 415),
            (ErrorCode::TooManyRequests, 429),
            (ErrorCode::InternalError, 500),
            (ErrorCode::UpstreamError, 502),
            (ErrorCode::NotConfigured, 503),
            (ErrorCode::ServiceUnavailable, 503),
        ];
        for (code, status) in pairs {
            assert_eq!(code.status(), status, "{code}");
            let wire = serde_json::to_value(code).unwrap();
            assert_eq!(wire, json!(code.as_str()));
        }
    }
}
