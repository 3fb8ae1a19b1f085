//! USDT gateway adapter.
//!
//! Creates on-chain payment transactions and polls their status. The
//! gateway answers in one of two envelope shapes depending on its flavour:
//! `{status_code, message, data}` or `{code, msg, data}`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::ProviderError;
use crate::config::UsdtConfig;
use crate::money;
use crate::signature::canonical_string;

pub const CREATE_TRANSACTION_PATH: &str = "/api/v1/order/create-transaction";
pub const CHECK_STATUS_PATH: &str = "/api/pay/check-status/";
pub const QR_CODE_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data=";

/// Normalized payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Waiting,
    Success,
    Expired,
    Unknown,
}

impl TradeStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TradeStatus::Waiting,
            1 => TradeStatus::Success,
            2 => TradeStatus::Expired,
            _ => TradeStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Waiting => "waiting",
            TradeStatus::Success => "success",
            TradeStatus::Expired => "expired",
            TradeStatus::Unknown => "unknown",
        }
    }
}

/// Map a status-poll body to a status. Bodies that are empty, HTML or not
/// the expected JSON mean the gateway has nothing yet: `Waiting`.
pub fn parse_status_body(body: &str) -> TradeStatus {
    #[derive(Deserialize)]
    struct StatusBody {
        status: i64,
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        warn!("Status response is not JSON, treating as waiting");
        return TradeStatus::Waiting;
    }
    match serde_json::from_str::<StatusBody>(trimmed) {
        Ok(parsed) => TradeStatus::from_code(parsed.status),
        Err(e) => {
            warn!(error = %e, "Unparseable status response, treating as waiting");
            TradeStatus::Waiting
        }
    }
}

/// Transaction request for one order.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub order_id: String,
    /// Major units
    pub amount: Decimal,
    pub notify_url: String,
    pub redirect_url: String,
}

/// Normalized transaction returned by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub trade_id: String,
    pub order_id: String,
    pub payment_address: String,
    /// Exact USDT amount the payer must send
    pub actual_amount: String,
    pub expiry_seconds: i64,
    pub payment_url: String,
}

impl Transaction {
    /// QR image URL encoding `tether:<address>?amount=<actual_amount>`.
    pub fn qr_code_url(&self) -> String {
        let data = format!(
            "tether:{}?amount={}",
            self.payment_address, self.actual_amount
        );
        let escaped: String = url::form_urlencoded::byte_serialize(data.as_bytes()).collect();
        format!("{}{}", QR_CODE_ENDPOINT, escaped)
    }
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    #[serde(default)]
    trade_id: String,
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    actual_amount: serde_json::Value,
    #[serde(default)]
    token: String,
    #[serde(default)]
    expiration_time: i64,
    #[serde(default)]
    payment_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: Option<i64>,
    message: Option<String>,
    code: Option<i64>,
    msg: Option<String>,
    data: Option<TransactionData>,
}

/// Normalize a create-transaction response body.
pub fn parse_create_response(body: &str) -> Result<Transaction, ProviderError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    match (envelope.status_code, envelope.code) {
        (Some(200), _) | (None, Some(0)) => {}
        (Some(code), _) => {
            return Err(ProviderError::Rejected {
                code,
                message: envelope.message.unwrap_or_default(),
            });
        }
        (None, Some(code)) => {
            return Err(ProviderError::Rejected {
                code,
                message: envelope.msg.unwrap_or_default(),
            });
        }
        (None, None) => {
            return Err(ProviderError::InvalidResponse(
                "missing status_code and code".into(),
            ));
        }
    }

    let data = envelope
        .data
        .ok_or_else(|| ProviderError::InvalidResponse("empty data".into()))?;

    let actual_amount = match data.actual_amount {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    };

    Ok(Transaction {
        trade_id: data.trade_id,
        order_id: data.order_id,
        payment_address: data.token,
        actual_amount,
        expiry_seconds: data.expiration_time,
        payment_url: data.payment_url,
    })
}

/// Request signature: MD5 over sorted non-empty `k=v` pairs joined with
/// `&`, followed by `&token=<auth_token>`, lowercase hex.
pub fn sign_request(fields: &BTreeMap<String, String>, auth_token: &str) -> String {
    let payload = format!("{}&token={}", canonical_string(fields), auth_token);
    format!("{:x}", md5::compute(payload.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct UsdtClient {
    client: reqwest::Client,
    api_endpoint: String,
    auth_token: String,
    default_chain: String,
}

impl UsdtClient {
    pub fn new(config: &UsdtConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            default_chain: config.default_chain.clone(),
        })
    }

    /// Create a payment transaction; any gateway error is returned.
    pub async fn create_transaction(
        &self,
        request: &CreateTransaction,
    ) -> Result<Transaction, ProviderError> {
        let amount = request
            .amount
            .to_f64()
            .ok_or_else(|| ProviderError::InvalidRequest(format!("amount {}", request.amount)))?;

        let fields: BTreeMap<String, String> = [
            ("order_id", request.order_id.clone()),
            ("amount", money::format_compact(request.amount)),
            ("notify_url", request.notify_url.clone()),
            ("redirect_url", request.redirect_url.clone()),
            ("code", self.default_chain.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let signature = sign_request(&fields, &self.auth_token);

        let body = json!({
            "order_id": request.order_id,
            "amount": amount,
            "notify_url": request.notify_url,
            "redirect_url": request.redirect_url,
            "code": self.default_chain,
            "signature": signature,
        });

        let url = format!("{}{}", self.api_endpoint, CREATE_TRANSACTION_PATH);
        debug!(%url, order_id = %request.order_id, "Creating USDT transaction");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), body = %text, "USDT create response");

        let transaction = parse_create_response(&text)?;
        info!(
            order_id = %transaction.order_id,
            trade_id = %transaction.trade_id,
            actual_amount = %transaction.actual_amount,
            "USDT transaction created"
        );
        Ok(transaction)
    }

    /// Poll a transaction. Only transport failures are errors.
    pub async fn check_status(&self, trade_id: &str) -> Result<TradeStatus, ProviderError> {
        let url = format!("{}{}{}", self.api_endpoint, CHECK_STATUS_PATH, trade_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = parse_status_body(&text);
        debug!(trade_id, status = status.as_str(), "USDT status polled");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, routing::get, routing::post};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[test]
    fn test_status_mapping() {
        assert_eq!(parse_status_body(r#"{"trade_id":"x","status":0}"#), TradeStatus::Waiting);
        assert_eq!(parse_status_body(r#"{"status":1}"#), TradeStatus::Success);
        assert_eq!(parse_status_body(r#"{"status":2}"#), TradeStatus::Expired);
        assert_eq!(parse_status_body(r#"{"status":9}"#), TradeStatus::Unknown);
    }

    #[test]
    fn test_status_degrades_to_waiting() {
        assert_eq!(parse_status_body(""), TradeStatus::Waiting);
        assert_eq!(parse_status_body("<html>502</html>"), TradeStatus::Waiting);
        assert_eq!(parse_status_body("not json"), TradeStatus::Waiting);
        assert_eq!(parse_status_body(r#"{"status":"paid"}"#), TradeStatus::Waiting);
    }

    #[test]
    fn test_acg_envelope() {
        let body = r#"{"status_code":200,"message":"success","data":{
            "trade_id":"202401010001","order_id":"T1","amount":7.14,
            "actual_amount":"1.0001","token":"TXyz123","expiration_time":600,
            "payment_url":"https://usdt.example.com/pay/202401010001"}}"#;
        let tx = parse_create_response(body).unwrap();
        assert_eq!(tx.trade_id, "202401010001");
        assert_eq!(tx.payment_address, "TXyz123");
        assert_eq!(tx.actual_amount, "1.0001");
        assert_eq!(tx.expiry_seconds, 600);
    }

    #[test]
    fn test_plain_envelope_with_numeric_amount() {
        let body = r#"{"code":0,"msg":"ok","data":{"trade_id":"t","order_id":"T1",
            "actual_amount":1.5,"token":"TAddr","expiration_time":900,"payment_url":"u"}}"#;
        let tx = parse_create_response(body).unwrap();
        assert_eq!(tx.actual_amount, "1.5");
        assert_eq!(tx.expiry_seconds, 900);
    }

    #[test]
    fn test_envelope_errors() {
        assert!(matches!(
            parse_create_response(r#"{"status_code":400,"message":"bad sign"}"#),
            Err(ProviderError::Rejected { code: 400, .. })
        ));
        assert!(matches!(
            parse_create_response(r#"{"code":10002,"msg":"order exists"}"#),
            Err(ProviderError::Rejected { code: 10002, .. })
        ));
        assert!(matches!(
            parse_create_response(r#"{"status_code":200,"message":"ok"}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_create_response("<html></html>"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_signature_vector() {
        let fields: BTreeMap<String, String> = [
            ("order_id", "T1"),
            ("amount", "1"),
            ("notify_url", "http://pay.example.com/api/v4/callback/custom/T1"),
            ("redirect_url", "http://pay.example.com/return/T1"),
            ("code", "TRON"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(
            sign_request(&fields, "123456"),
            "102fbb257ff569d25c2a1978b1cfcbce"
        );
    }

    #[test]
    fn test_qr_code_url() {
        let tx = Transaction {
            trade_id: "t".into(),
            order_id: "T1".into(),
            payment_address: "TXyz123".into(),
            actual_amount: "7.14".into(),
            expiry_seconds: 600,
            payment_url: String::new(),
        };
        assert_eq!(
            tx.qr_code_url(),
            "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data=tether%3ATXyz123%3Famount%3D7.14"
        );
    }

    async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(endpoint: String) -> UsdtClient {
        let config = UsdtConfig {
            enabled: true,
            api_endpoint: endpoint,
            auth_token: "123456".into(),
            default_chain: "TRON".into(),
        };
        UsdtClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_transaction_over_http() {
        let received = Arc::new(Mutex::new(Value::Null));
        let received_clone = received.clone();
        let app = Router::new().route(
            CREATE_TRANSACTION_PATH,
            post(move |Json(body): Json<Value>| {
                let received = received_clone.clone();
                async move {
                    *received.lock().unwrap() = body;
                    Json(json!({
                        "status_code": 200,
                        "message": "success",
                        "data": {
                            "trade_id": "TRADE1",
                            "order_id": "T1",
                            "amount": 1.0,
                            "actual_amount": "0.1401",
                            "token": "TXyz123",
                            "expiration_time": 600,
                            "payment_url": "https://usdt.example.com/pay/TRADE1"
                        }
                    }))
                }
            }),
        );
        let endpoint = spawn(app).await;

        let tx = client(endpoint)
            .create_transaction(&CreateTransaction {
                order_id: "T1".into(),
                amount: Decimal::new(100, 2),
                notify_url: "http://pay.example.com/api/v4/callback/custom/T1".into(),
                redirect_url: "http://pay.example.com/return/T1".into(),
            })
            .await
            .unwrap();
        assert_eq!(tx.trade_id, "TRADE1");
        assert_eq!(tx.actual_amount, "0.1401");

        let body = received.lock().unwrap().clone();
        assert_eq!(body["order_id"], "T1");
        assert_eq!(body["amount"], 1.0);
        assert_eq!(body["code"], "TRON");
        assert_eq!(body["signature"], "102fbb257ff569d25c2a1978b1cfcbce");
    }

    #[tokio::test]
    async fn test_check_status_over_http() {
        let app = Router::new().route(
            "/api/pay/check-status/{trade_id}",
            get(|Path(trade_id): Path<String>| async move {
                if trade_id == "PAID1" {
                    r#"{"trade_id":"PAID1","status":1}"#.to_string()
                } else {
                    "<html>maintenance</html>".to_string()
                }
            }),
        );
        let usdt = client(spawn(app).await);

        assert_eq!(usdt.check_status("PAID1").await.unwrap(), TradeStatus::Success);
        assert_eq!(usdt.check_status("OTHER").await.unwrap(), TradeStatus::Waiting);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        // Nothing listens on port 9 of the loopback
        let usdt = client("http://127.0.0.1:9".into());
        assert!(matches!(
            usdt.check_status("X").await,
            Err(ProviderError::Transport(_))
        ));
    }
}
