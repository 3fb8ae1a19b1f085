//! Liveness handler

use axum::{Json, extract::State};
use std::sync::Arc;

use super::super::state::AppState;
use super::super::types::{ApiResponse, VersionInfo};

/// GET /
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<VersionInfo>> {
    Json(ApiResponse::success(VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        store: state.orders.driver_name(),
    }))
}
