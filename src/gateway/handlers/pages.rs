//! Payer-facing HTML pages.

use axum::{
    extract::{Path, State},
    http::{Extensions, HeaderMap, header::USER_AGENT},
    response::Html,
};
use std::sync::Arc;
use tracing::{debug, error};

use super::super::state::AppState;
use super::super::types::ApiError;
use super::client_ip;
use crate::models::PurchaseRequest;
use crate::provider::{DeviceType, PurchaseArgs, PurchaseForm};

/// Escape text for HTML element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Load the pending session behind a payer-facing page.
pub(crate) async fn pending_order(
    state: &AppState,
    order_no: &str,
) -> Result<PurchaseRequest, ApiError> {
    match state.orders.session(order_no).await {
        Ok(Some(request)) => Ok(request),
        Ok(None) => {
            debug!(order_no, "Purchase page for unknown order");
            Err(ApiError::bad_request("Order not found"))
        }
        Err(e) => {
            error!(order_no, error = %e, "Unreadable purchase session");
            Err(ApiError::bad_request("Invalid order information"))
        }
    }
}

/// GET /purchase/{id}
///
/// Renders the signed gateway form, submitted automatically unless
/// disabled in config.
pub async fn purchase_page(
    State(state): State<Arc<AppState>>,
    Path(order_no): Path<String>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Html<String>, ApiError> {
    let request = pending_order(&state, &order_no).await?;

    let notify_url = state
        .url_for(&format!("/notify/{}", request.order_no))
        .map_err(|e| ApiError::internal(format!("Failed to build URL: {}", e)))?;
    let return_url = state
        .url_for(&format!("/return/{}", request.order_no))
        .map_err(|e| ApiError::internal(format!("Failed to build URL: {}", e)))?;

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let args = PurchaseArgs {
        out_trade_no: request.order_no.clone(),
        name: state
            .pages
            .custom_name
            .clone()
            .unwrap_or_else(|| request.name.clone()),
        money: request.money(),
        device: DeviceType::from_user_agent(user_agent),
        client_ip: client_ip(&headers, &extensions),
        notify_url,
        return_url,
    };
    let form = state.epay.purchase(&args);

    debug!(order_no = %args.out_trade_no, device = args.device.as_str(), "Rendering payment page");
    Ok(Html(render_payment_page(
        &form,
        &args,
        state.epay.purchase_type().as_str(),
        state.pages.auto_submit,
    )))
}

fn render_payment_page(
    form: &PurchaseForm,
    args: &PurchaseArgs,
    pay_type: &str,
    auto_submit: bool,
) -> String {
    let inputs: String = form
        .params
        .iter()
        .map(|(k, v)| {
            format!(
                "      <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(k),
                escape_html(v)
            )
        })
        .collect();
    let script = if auto_submit {
        "  <script>document.getElementById(\"pay\").submit();</script>\n"
    } else {
        ""
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Payment</title>
</head>
<body>
  <h1>{name}</h1>
  <p>Order: {order_no}</p>
  <p>Amount: ¥{money}</p>
  <p>Method: {pay_type}</p>
  <form id="pay" method="post" action="{endpoint}">
{inputs}      <button type="submit">Pay now</button>
  </form>
{script}</body>
</html>
"#,
        name = escape_html(&args.name),
        order_no = escape_html(&args.out_trade_no),
        money = escape_html(&args.money),
        pay_type = escape_html(pay_type),
        endpoint = escape_html(&form.endpoint),
        inputs = inputs,
        script = script,
    )
}

/// GET /return/{id}
pub async fn return_page(Path(order_no): Path<String>) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Payment submitted</title>
</head>
<body>
  <h1>Payment submitted</h1>
  <p>Order {}: your payment is being confirmed. You can close this page and return to the site.</p>
</body>
</html>
"#,
        escape_html(&order_no)
    ))
}
