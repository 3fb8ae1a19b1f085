//! USDT payment page and status polling.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use std::sync::Arc;
use tracing::{error, info};

use super::super::state::AppState;
use super::super::types::{ApiError, UsdtStatusResponse, error_codes};
use super::pages::{escape_html, pending_order};
use crate::money;
use crate::provider::{CreateTransaction, Transaction, UsdtClient};

fn usdt_client(state: &AppState) -> Result<&UsdtClient, ApiError> {
    state.usdt.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            error_codes::ORDER_NOT_FOUND,
            "USDT payment is not enabled",
        )
    })
}

/// GET /usdt/purchase/{id}
///
/// Creates a transaction on the USDT gateway whose notify target is the
/// trusted V4 callback, then renders address, amount and QR code.
pub async fn usdt_purchase_page(
    State(state): State<Arc<AppState>>,
    Path(order_no): Path<String>,
) -> Result<Html<String>, ApiError> {
    let client = usdt_client(&state)?;
    let request = pending_order(&state, &order_no).await?;

    let notify_url = state
        .url_for(&format!("/api/v4/callback/custom/{}", request.order_no))
        .map_err(|e| ApiError::internal(format!("Failed to build URL: {}", e)))?;
    let redirect_url = state
        .url_for(&format!("/return/{}", request.order_no))
        .map_err(|e| ApiError::internal(format!("Failed to build URL: {}", e)))?;

    let transaction = client
        .create_transaction(&CreateTransaction {
            order_id: request.order_no.clone(),
            amount: money::minor_to_major(request.amount),
            notify_url: notify_url.to_string(),
            redirect_url: redirect_url.to_string(),
        })
        .await
        .map_err(|e| {
            error!(order_no = %request.order_no, error = %e, "USDT transaction creation failed");
            ApiError::new(
                StatusCode::BAD_GATEWAY,
                error_codes::INTERNAL_ERROR,
                format!("Failed to create USDT transaction: {}", e),
            )
        })?;

    info!(order_no = %request.order_no, trade_id = %transaction.trade_id, "USDT payment page served");
    let expires_at = chrono::Local::now() + chrono::Duration::seconds(transaction.expiry_seconds);
    Ok(Html(render_usdt_page(
        &request.name,
        &request.money(),
        &transaction,
        &expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        redirect_url.as_str(),
    )))
}

fn render_usdt_page(
    name: &str,
    money: &str,
    tx: &Transaction,
    expires_at: &str,
    redirect_url: &str,
) -> String {
    // trade_id is embedded in a JS string; JSON encoding quotes and escapes it
    let trade_id_js = serde_json::to_string(&tx.trade_id)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c");
    let redirect_js = serde_json::to_string(redirect_url)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace('<', "\\u003c");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>USDT Payment</title>
</head>
<body>
  <h1>{name}</h1>
  <p>Order: {order_id}</p>
  <p>Amount: ¥{money}</p>
  <p>Send exactly <strong>{actual_amount} USDT</strong> to:</p>
  <p><code>{address}</code></p>
  <img src="{qr}" width="200" height="200" alt="QR code">
  <p>Expires at {expires_at}</p>
  <p><a href="{payment_url}">Open payment page</a></p>
  <p id="status">Waiting for payment...</p>
  <script>
    (function poll() {{
      fetch("/usdt/status/" + encodeURIComponent({trade_id_js}))
        .then(function (r) {{ return r.json(); }})
        .then(function (res) {{
          if (res.status === "success") {{ window.location.href = {redirect_js}; return; }}
          if (res.status === "expired") {{ document.getElementById("status").textContent = "Payment expired"; return; }}
          setTimeout(poll, 5000);
        }})
        .catch(function () {{ setTimeout(poll, 5000); }});
    }})();
  </script>
</body>
</html>
"#,
        name = escape_html(name),
        order_id = escape_html(&tx.order_id),
        money = escape_html(money),
        actual_amount = escape_html(&tx.actual_amount),
        address = escape_html(&tx.payment_address),
        qr = escape_html(&tx.qr_code_url()),
        expires_at = escape_html(expires_at),
        payment_url = escape_html(&tx.payment_url),
        trade_id_js = trade_id_js,
        redirect_js = redirect_js,
    )
}

/// GET /usdt/status/{trade_id}
pub async fn usdt_status(
    State(state): State<Arc<AppState>>,
    Path(trade_id): Path<String>,
) -> Result<Json<UsdtStatusResponse>, ApiError> {
    let client = usdt_client(&state)?;
    let status = client.check_status(&trade_id).await.map_err(|e| {
        error!(trade_id = %trade_id, error = %e, "USDT status poll failed");
        ApiError::new(
            StatusCode::BAD_GATEWAY,
            error_codes::INTERNAL_ERROR,
            format!("Failed to query USDT gateway: {}", e),
        )
    })?;
    Ok(Json(UsdtStatusResponse {
        code: error_codes::SUCCESS,
        status: status.as_str(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usdt_page_contents() {
        let tx = Transaction {
            trade_id: "TRADE1".into(),
            order_id: "T1".into(),
            payment_address: "TXyz123".into(),
            actual_amount: "0.1401".into(),
            expiry_seconds: 600,
            payment_url: "https://usdt.example.com/pay/TRADE1".into(),
        };
        let html = render_usdt_page(
            "Widget",
            "1.00",
            &tx,
            "2026-01-01 00:10:00",
            "http://pay.example.com/return/T1",
        );
        assert!(html.contains("0.1401 USDT"));
        assert!(html.contains("<code>TXyz123</code>"));
        assert!(html.contains("data=tether%3ATXyz123%3Famount%3D0.1401"));
        assert!(html.contains(r#"encodeURIComponent("TRADE1")"#));
        assert!(html.contains(r#"window.location.href = "http://pay.example.com/return/T1""#));
    }
}
