//! API response types and error codes
//!
//! Cloudreve reads `code` (0 = success), `data` and `error`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Unified JSON response.
#[derive(Debug, Serialize, PartialEq)]
pub struct ApiResponse<T> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    /// `{code: 0}`
    pub fn ok() -> Self {
        Self {
            code: error_codes::SUCCESS,
            data: None,
            error: None,
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Handler error: HTTP status plus `{code, data: "", error}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            message,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<&str> {
            code: self.code,
            data: Some(""),
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Application codes carried in `code`
pub mod error_codes {
    pub const SUCCESS: i32 = 0;

    pub const INVALID_PARAMETER: i32 = 400;
    pub const AUTH_FAILED: i32 = 401;
    pub const ORDER_NOT_FOUND: i32 = 404;

    pub const INTERNAL_ERROR: i32 = 500;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let json = serde_json::to_string(&ApiResponse::success("PAID")).unwrap();
        assert_eq!(json, r#"{"code":0,"data":"PAID"}"#);
    }

    #[test]
    fn test_ok_and_error_shapes() {
        assert_eq!(serde_json::to_string(&ApiResponse::ok()).unwrap(), r#"{"code":0}"#);
        assert_eq!(
            serde_json::to_string(&ApiResponse::error(404, "order not found")).unwrap(),
            r#"{"code":404,"error":"order not found"}"#
        );
    }

    #[test]
    fn test_api_error_status() {
        let err = ApiError::bad_request("bad currency");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, 400);
        assert_eq!(
            ApiError::internal("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
