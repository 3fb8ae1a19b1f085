//! Gateway callbacks.
//!
//! `/notify/{id}` answers the epay gateway in its own plain-text protocol;
//! `/cloudreve/callback` and the V4 route answer JSON.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};
use crate::relay::CallbackOutcome;

/// Body the gateway expects on acceptance
pub const ACK_SUCCESS: &str = "success";
/// Body that makes the gateway retry later
pub const ACK_FAIL: &str = "fail";

/// GET /notify/{id}
pub async fn notify(
    State(state): State<Arc<AppState>>,
    Path(order_no): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    info!(order_no = %order_no, trade_status = params.get("trade_status").map(String::as_str), "Gateway notify received");

    match state.relay.handle_callback(&order_no, &params).await {
        Ok(CallbackOutcome::Delivered { .. }) | Ok(CallbackOutcome::Ignored { .. }) => {
            (StatusCode::OK, ACK_SUCCESS)
        }
        Err(e) => {
            warn!(order_no = %order_no, error = %e, "Gateway notify failed");
            (StatusCode::BAD_REQUEST, ACK_FAIL)
        }
    }
}

/// GET /cloudreve/callback
///
/// Same relay as `/notify/{id}`, keyed by `out_trade_no`.
pub async fn cloudreve_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<ApiResponse<()>> {
    let order_no = match params.get("out_trade_no") {
        Some(no) if !no.is_empty() => no.clone(),
        _ => {
            return Json(ApiResponse::error(
                error_codes::INVALID_PARAMETER,
                "Invalid order number",
            ));
        }
    };
    info!(order_no = %order_no, "Gateway callback received");

    match state.relay.handle_callback(&order_no, &params).await {
        Ok(_) => Json(ApiResponse::ok()),
        Err(e) => {
            warn!(order_no = %order_no, error = %e, "Gateway callback failed");
            Json(ApiResponse::error(e.code(), e.to_string()))
        }
    }
}

/// GET|POST /api/v4/callback/custom/{id}
///
/// Trusted completion: no signature, no amount check, no notification.
/// Only mounted when `v4_callback.enabled` is set.
pub async fn v4_callback(
    State(state): State<Arc<AppState>>,
    Path(order_no): Path<String>,
) -> Json<ApiResponse<()>> {
    match state.relay.trusted_complete(&order_no).await {
        Ok(()) => Json(ApiResponse::ok()),
        Err(e) => {
            warn!(order_no = %order_no, error = %e, "V4 callback failed");
            Json(ApiResponse::error(e.code(), e.to_string()))
        }
    }
}
