pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api_auth::bearer_auth_middleware;
use handlers::{callback, health, pages, purchase, usdt};
pub use state::{AppState, PageSettings, StateError};

/// Assemble all routes.
///
/// Bearer auth covers the Cloudreve purchase endpoints only. The V4 and
/// USDT routes are mounted only when enabled.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cloudreve = Router::new()
        .route(
            "/cloudreve/purchase",
            post(purchase::create_purchase).get(purchase::query_purchase),
        )
        .route_layer(from_fn_with_state(
            state.signer.clone(),
            bearer_auth_middleware,
        ));

    let mut app = Router::new()
        .route("/", get(health::health_check))
        .route("/purchase/{id}", get(pages::purchase_page))
        .route("/return/{id}", get(pages::return_page))
        .route("/notify/{id}", get(callback::notify))
        .route("/cloudreve/callback", get(callback::cloudreve_callback))
        .merge(cloudreve);

    if state.v4_callback_enabled {
        warn!("Trusted V4 callback enabled: /api/v4/callback/custom/{{id}} marks orders paid without verification");
        app = app.route(
            "/api/v4/callback/custom/{id}",
            get(callback::v4_callback).post(callback::v4_callback),
        );
    }

    if state.usdt.is_some() {
        app = app
            .route("/usdt/purchase/{id}", get(usdt::usdt_purchase_page))
            .route("/usdt/status/{trade_id}", get(usdt::usdt_status));
    }

    app.with_state(state)
}

/// Start HTTP server and run until Ctrl-C.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "Payment bridge listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
    })
    .await
}
