//! Authentication for requests coming from Cloudreve.
//!
//! ## Components
//! - `error`: 401 rejection types
//! - `middleware`: Axum bearer-token middleware

pub mod error;
pub mod middleware;

pub use error::{AuthError, AuthErrorCode};
pub use middleware::{bearer_auth_middleware, extract_token};
