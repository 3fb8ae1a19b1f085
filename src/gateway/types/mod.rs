//! Gateway types module
//!
//! - [`ApiResponse<T>`]: Cloudreve-facing JSON response
//! - [`ApiError`]: handler rejection with HTTP status
//! - [`PurchaseQuery`]: order status query
//! - [`UsdtStatusResponse`], [`VersionInfo`]: endpoint-specific bodies

pub mod response;

use serde::Deserialize;

pub use response::{ApiError, ApiResponse, error_codes};

/// `GET /cloudreve/purchase?order_no=`
#[derive(Debug, Deserialize)]
pub struct PurchaseQuery {
    #[serde(default)]
    pub order_no: String,
}

/// Liveness response data
#[derive(Debug, serde::Serialize)]
pub struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub store: &'static str,
}

/// `GET /usdt/status/{trade_id}`
#[derive(Debug, serde::Serialize)]
pub struct UsdtStatusResponse {
    pub code: i32,
    pub status: &'static str,
}
