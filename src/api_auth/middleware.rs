//! Bearer authentication middleware for Axum.
//!
//! Verifies Cloudreve's HMAC bearer token against the path, `X-Cr-*`
//! headers and body of the current request.

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{AuthError, AuthErrorCode};
use crate::signature::{BearerSigner, SignContent, TokenError, canonical_cr_headers};

/// Largest request body buffered for signing
pub const MAX_SIGNED_BODY_BYTES: usize = 1024 * 1024;

/// Query parameter carrying the token when no header is sent
pub const SIGN_QUERY_PARAM: &str = "sign";

/// Axum middleware for Cloudreve bearer authentication.
///
/// Must be applied to the purchase routes only; gateway callbacks carry
/// their own MD5 signature.
pub async fn bearer_auth_middleware(
    State(signer): State<Arc<BearerSigner>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    // Step 1: Extract token (header first, then query)
    let token = extract_token(request.headers(), request.uri().query())?;

    // Step 2: Buffer the body so it can be signed and handed on
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_SIGNED_BODY_BYTES)
        .await
        .map_err(|e| AuthError::new(AuthErrorCode::UnreadableBody, e.to_string()))?;

    // Step 3: Rebuild sign content from the current request
    let header = canonical_cr_headers(
        parts
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    );
    let content = SignContent::new(
        parts.uri.path(),
        header,
        String::from_utf8_lossy(&bytes).into_owned(),
    )
    .to_canonical_json();

    // Step 4: Verify format, expiry and signature
    let now = chrono::Utc::now().timestamp();
    match signer.verify(&token, &content, now) {
        Ok(expires) => {
            debug!(path = %parts.uri.path(), expires, "Bearer token accepted");
        }
        Err(TokenError::SignatureMismatch { provided, expected }) => {
            warn!(
                path = %parts.uri.path(),
                %provided,
                %expected,
                sign_content = %content,
                "Bearer signature mismatch"
            );
            return Err(AuthError::from_code(AuthErrorCode::InvalidSignature));
        }
        Err(e) => {
            let detail = e.to_string();
            let err = AuthError::from(e);
            warn!(path = %parts.uri.path(), reason = err.code.name(), error = %detail, "Bearer token rejected");
            return Err(err);
        }
    }

    // Step 5: Continue to handler with the original body
    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

/// Token from `Authorization: Bearer <token>`, else the `sign` query parameter.
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Result<String, AuthError> {
    if let Some(token) = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
    {
        return Ok(token.to_string());
    }

    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == SIGN_QUERY_PARAM)
                .map(|(_, v)| v.into_owned())
        })
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::from_code(AuthErrorCode::MissingCredential))
}
