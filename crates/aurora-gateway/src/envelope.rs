//! axum glue for the response envelope.

use aurora_kernel::gateway::{ErrorEnvelope, SuccessEnvelope};
use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::warn;

/// Success response: `data` is flattened next to `success` and `version`,
/// so it must serialize as a JSON object.
#[derive(Debug, Clone)]
pub struct ApiSuccess<T>(pub T);

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(SuccessEnvelope::new(self.0))).into_response()
    }
}

/// Error envelope with its code-derived status and extra headers.
pub fn error_response(envelope: ErrorEnvelope, headers: &[(String, String)]) -> Response {
    let status =
        StatusCode::from_u16(envelope.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(envelope)).into_response();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => warn!(header = %name, "dropping malformed rejection header"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_kernel::gateway::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn error_status_follows_code() {
        let resp = error_response(
            ErrorEnvelope::new(ErrorCode::TooManyRequests, "slow down"),
            &[("retry-after".to_string(), "12".to_string())],
        );
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()["retry-after"], "12");

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["version"], "v1");
        assert_eq!(v["error"]["code"], "TOO_MANY_REQUESTS");
    }

    #[tokio::test]
    async fn success_fields_are_flattened() {
        let resp = ApiSuccess(json!({ "status": "ok" })).into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, json!({ "success": true, "version": "v1", "status": "ok" }));
    }
}
