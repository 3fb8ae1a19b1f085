//! Payment gateway adapters.
//!
//! - [`epay`]: fiat gateway, signed browser form + callback verification
//! - [`usdt`]: USDT gateway, transaction creation + status polling

pub mod epay;
pub mod usdt;

use thiserror::Error;

pub use epay::{DeviceType, EpayClient, PurchaseArgs, PurchaseForm, PurchaseType, VerifyResult};
pub use usdt::{CreateTransaction, TradeStatus, Transaction, UsdtClient, parse_status_body};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider misconfigured: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Gateway unreachable: {0}")]
    Transport(String),

    #[error("Unreadable gateway response: {0}")]
    InvalidResponse(String),

    #[error("Gateway rejected request: code {code}, {message}")]
    Rejected { code: i64, message: String },
}
