use crate::funnel::report::FunnelError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// API error type with HTTP status code mapping.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    #[allow(dead_code)]
    Internal(String),
    /// The engine detected corrupted stage counts. Always a bug, never a
    /// data issue, so it is reported loudly rather than served as numbers.
    Corrupted(FunnelError),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
            Self::Corrupted(e) => write!(f, "Funnel corruption: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Corrupted(e) => {
                tracing::error!(error = %e, "Structural corruption in funnel counts");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<FunnelError> for ApiError {
    fn from(e: FunnelError) -> Self {
        Self::Corrupted(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::stage::FunnelStage;

    #[test]
    fn test_bad_request_status() {
        let err = ApiError::BadRequest("invalid window".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_status() {
        let err = ApiError::Internal("something broke".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_corruption_maps_to_internal_error() {
        let err = ApiError::from(FunnelError::MonotonicityViolation {
            stage: FunnelStage::Payment,
            count: 9,
            upstream_count: 3,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_display() {
        let err = ApiError::BadRequest("test".to_string());
        assert_eq!(format!("{err}"), "Bad request: test");
    }
}
