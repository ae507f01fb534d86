use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub trace_id: String,
    pub message: String,
}

/// Handler error: a status plus a per-module trace id (e.g. `users-003`) so a
/// client report can be matched to the code path that produced it.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub trace_id: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, trace_id: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            trace_id,
            message: message.into(),
        }
    }

    pub fn bad_request(trace_id: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, trace_id, message)
    }

    pub fn unauthorized(trace_id: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, trace_id, message)
    }

    pub fn internal(trace_id: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, trace_id, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(trace_id = self.trace_id, status = self.status.as_u16(), "{}", self.message);
        } else {
            tracing::warn!(trace_id = self.trace_id, status = self.status.as_u16(), "{}", self.message);
        }

        let body = ErrorResponse {
            trace_id: self.trace_id.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::unauthorized("middlewares-002", "token had expired").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "trace_id": "middlewares-002", "message": "token had expired" })
        );
    }
}
