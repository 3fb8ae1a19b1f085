//! Authentication error types.
//!
//! Every rejection answers HTTP 401 with `{code: 401, data: "", error}`,
//! the shape Cloudreve expects from a payment provider.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::signature::TokenError;

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    /// Neither `Authorization` header nor `sign` query parameter
    MissingCredential,
    /// Not `<signature>:<expires>`
    InvalidFormat,
    /// Expiry part is not an integer
    InvalidExpiry,
    TokenExpired,
    InvalidSignature,
    /// Request body could not be buffered
    UnreadableBody,
}

impl AuthErrorCode {
    /// Application code carried in the JSON body.
    pub fn code(self) -> i32 {
        401
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidExpiry => "INVALID_EXPIRY",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::UnreadableBody => "UNREADABLE_BODY",
        }
    }

    pub fn http_status(self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

/// Authentication error with message.
#[derive(Debug, Clone)]
pub struct AuthError {
    pub code: AuthErrorCode,
    pub message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create error with default message.
    pub fn from_code(code: AuthErrorCode) -> Self {
        let message = match code {
            AuthErrorCode::MissingCredential => "Missing authorization",
            AuthErrorCode::InvalidFormat => "Invalid sign format",
            AuthErrorCode::InvalidExpiry => "Invalid sign expiry",
            AuthErrorCode::TokenExpired => "Sign expired",
            AuthErrorCode::InvalidSignature => "Invalid sign",
            AuthErrorCode::UnreadableBody => "Failed to read request body",
        };
        Self::new(code, message)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        let code = match err {
            TokenError::Malformed(_) => AuthErrorCode::InvalidFormat,
            TokenError::InvalidExpiry(_) => AuthErrorCode::InvalidExpiry,
            TokenError::Expired { .. } => AuthErrorCode::TokenExpired,
            TokenError::SignatureMismatch { .. } => AuthErrorCode::InvalidSignature,
        };
        Self::from_code(code)
    }
}

/// JSON response body for auth errors.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub code: i32,
    pub data: &'static str,
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorResponse {
            code: self.code.code(),
            data: "",
            error: self.message,
        };
        (self.code.http_status(), Json(body)).into_response()
    }
}
