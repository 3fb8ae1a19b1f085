//! HTTP handlers.
//!
//! - `purchase`: Cloudreve order creation and status query (bearer auth)
//! - `pages`: payer-facing HTML (gateway redirect form, return page)
//! - `callback`: gateway callbacks feeding the notification relay
//! - `usdt`: USDT payment page and status polling
//! - `health`: liveness

pub mod callback;
pub mod health;
pub mod pages;
pub mod purchase;
pub mod usdt;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use std::net::SocketAddr;

/// Client address as seen by the payer's gateway: first `X-Forwarded-For`
/// hop, then `X-Real-IP`, then the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    if let Some(real) = header("x-real-ip") {
        return real.to_string();
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}
