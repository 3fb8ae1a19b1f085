//! Signature engine.
//!
//! Two independent schemes, one per trust direction:
//!
//! ## Components
//! - `params`: MD5-keyed parameter signatures used by the payment gateways
//!   (epay callbacks and purchase forms, USDT transaction requests)
//! - `bearer`: HMAC-SHA256 bearer tokens with expiry, shared with Cloudreve
//!   for both inbound requests and outbound notifications

pub mod bearer;
pub mod params;

pub use bearer::{BearerSigner, SignContent, TokenError, canonical_cr_headers};
pub use params::{
    SIGN_FIELD, SIGN_TYPE_FIELD, canonical_string, generate_params, sign_params, verify_params,
};
