//! HMAC-SHA256 bearer tokens shared with Cloudreve.
//!
//! Token format: `<base64url(HMAC(key, content ":" expires))>:<expires>`,
//! sent as `Authorization: Bearer <token>`. `content` is the JSON encoding of
//! [`SignContent`]. An `expires` of 0 never expires.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header prefix whose values are bound into the signature
pub const CR_HEADER_PREFIX: &str = "X-Cr-";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: expected <signature>:<expires>, got {0} part(s)")]
    Malformed(usize),

    #[error("Invalid token expiry: {0}")]
    InvalidExpiry(String),

    #[error("Token expired at {expires} (now {now})")]
    Expired { expires: i64, now: i64 },

    #[error("Signature mismatch")]
    SignatureMismatch { provided: String, expected: String },
}

/// The request parts covered by a bearer token.
///
/// Field names and order are part of the wire format.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SignContent {
    pub path: String,
    pub header: String,
    pub body: String,
}

impl SignContent {
    pub fn new(path: impl Into<String>, header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            header: header.into(),
            body: body.into(),
        }
    }

    /// Sign content for a body-less request (outbound notifications).
    pub fn for_path(path: impl Into<String>) -> Self {
        Self::new(path, "", "")
    }

    /// Serialize to the canonical JSON string.
    ///
    /// Cloudreve's encoder escapes `<`, `>`, `&`, U+2028 and U+2029 inside
    /// strings, so the same escapes are applied here. Those characters only
    /// ever occur inside string literals of the output.
    pub fn to_canonical_json(&self) -> String {
        let raw = serde_json::to_string(self).unwrap_or_default();
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            match c {
                '<' => out.push_str("\\u003c"),
                '>' => out.push_str("\\u003e"),
                '&' => out.push_str("\\u0026"),
                '\u{2028}' => out.push_str("\\u2028"),
                '\u{2029}' => out.push_str("\\u2029"),
                _ => out.push(c),
            }
        }
        out
    }
}

/// Canonical `Header` value: sorted `Name=value` pairs of `X-Cr-*` headers,
/// excluding `X-Cr-Filename`, joined with `&`.
pub fn canonical_cr_headers<'a, I>(headers: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut signed: Vec<String> = headers
        .into_iter()
        .filter_map(|(name, value)| {
            let canonical = canonical_header_name(name);
            let is_signed = canonical.starts_with(CR_HEADER_PREFIX)
                && canonical != format!("{}Filename", CR_HEADER_PREFIX);
            is_signed.then(|| format!("{}={}", canonical, value))
        })
        .collect();
    signed.sort();
    signed.join("&")
}

/// `x-cr-path` -> `X-Cr-Path`
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Issues and checks bearer tokens with a shared secret.
#[derive(Clone)]
pub struct BearerSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for BearerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerSigner").finish_non_exhaustive()
    }
}

impl BearerSigner {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }

    /// Base64url MAC over `content:expires` (no expiry suffix).
    pub fn signature(&self, content: &str, expires: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(content.as_bytes());
        mac.update(b":");
        mac.update(expires.to_string().as_bytes());
        URL_SAFE.encode(mac.finalize().into_bytes())
    }

    /// Full token: `<signature>:<expires>`.
    pub fn sign(&self, content: &str, expires: i64) -> String {
        format!("{}:{}", self.signature(content, expires), expires)
    }

    /// `Bearer <token>` header value for a request.
    pub fn authorization(&self, content: &SignContent, expires: i64) -> String {
        format!("Bearer {}", self.sign(&content.to_canonical_json(), expires))
    }

    /// Check a token against the sign content of the current request.
    ///
    /// Returns the parsed expiry on success.
    pub fn verify(&self, token: &str, content: &str, now: i64) -> Result<i64, TokenError> {
        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 2 {
            return Err(TokenError::Malformed(parts.len()));
        }
        let (provided, expires_str) = (parts[0], parts[1]);

        let expires: i64 = expires_str
            .parse()
            .map_err(|_| TokenError::InvalidExpiry(expires_str.to_string()))?;

        if expires != 0 && expires < now {
            return Err(TokenError::Expired { expires, now });
        }

        let expected = self.signature(content, expires);
        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(TokenError::SignatureMismatch {
                provided: provided.to_string(),
                expected,
            });
        }

        Ok(expires)
    }
}
