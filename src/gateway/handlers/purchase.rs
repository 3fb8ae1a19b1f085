//! Cloudreve-facing order endpoints (behind bearer auth).

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResponse, PurchaseQuery, error_codes};
use crate::models::PurchaseRequest;

/// POST /cloudreve/purchase
///
/// Stores the purchase session and answers with the payer-facing URL.
/// Re-posting an identical request is accepted; a different request under
/// a live order number, or any request for a paid order, is rejected.
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    // 1. Parse body
    let Json(req) = payload.map_err(|e| {
        debug!(error = %e, "Unparseable purchase request");
        ApiError::bad_request(format!("Invalid request: {}", e.body_text()))
    })?;

    // 2. Validate fields
    req.validate(&state.currency)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    // 3. Order number must not be taken by a different order
    if state.orders.is_paid(&req.order_no).await.map_err(|e| {
        error!(order_no = %req.order_no, error = %e, "Store read failed");
        ApiError::internal("Failed to read order state")
    })? {
        return Err(ApiError::bad_request("Order already paid"));
    }
    match state.orders.session(&req.order_no).await {
        Ok(Some(existing)) if existing != req => {
            warn!(order_no = %req.order_no, "Conflicting purchase for live order number");
            return Err(ApiError::bad_request("Order number already in use"));
        }
        Ok(_) => {}
        // Unreadable session is overwritten by the new one
        Err(e) => warn!(order_no = %req.order_no, error = %e, "Replacing unreadable session"),
    }

    // 4. Store session
    state.orders.put_session(&req).await.map_err(|e| {
        error!(order_no = %req.order_no, error = %e, "Failed to store purchase session");
        ApiError::internal(format!("Failed to store order: {}", e))
    })?;

    // 5. Payer-facing URL
    let url = state
        .url_for(&format!("/purchase/{}", req.order_no))
        .map_err(|e| ApiError::internal(format!("Failed to build URL: {}", e)))?;

    info!(order_no = %req.order_no, amount = req.amount, "Purchase session created");
    Ok(Json(ApiResponse::success(url.to_string())))
}

/// GET /cloudreve/purchase?order_no=
///
/// Always HTTP 200; failures are reported through `code`.
pub async fn query_purchase(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PurchaseQuery>,
) -> Json<ApiResponse<String>> {
    if query.order_no.is_empty() {
        return Json(ApiResponse {
            code: error_codes::INTERNAL_ERROR,
            data: None,
            error: Some("Invalid order number".into()),
        });
    }

    match state.orders.state(&query.order_no).await {
        Ok(order_state) => {
            debug!(order_no = %query.order_no, status = order_state.as_status(), "Order status queried");
            Json(ApiResponse::success(order_state.as_status().to_string()))
        }
        Err(e) => {
            error!(order_no = %query.order_no, error = %e, "Failed to read order state");
            Json(ApiResponse {
                code: error_codes::INTERNAL_ERROR,
                data: None,
                error: Some("Invalid order information".into()),
            })
        }
    }
}
