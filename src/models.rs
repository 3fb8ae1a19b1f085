//! Order domain types.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::money;

/// Purchase request sent by Cloudreve.
///
/// Immutable once stored. `amount` is in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub name: String,
    pub order_no: String,
    pub notify_url: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid order number")]
    InvalidOrderNo,

    #[error("Missing product name")]
    MissingName,

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Amount out of range")]
    AmountOutOfRange,

    #[error("Invalid notify URL: {0}")]
    InvalidNotifyUrl(String),
}

impl PurchaseRequest {
    /// Validate caller-supplied fields.
    ///
    /// Order numbers end up as a path segment of the redirect URL, so they
    /// are restricted to visible ASCII without `/`, `?` or `#`.
    pub fn validate(&self, accepted_currency: &str) -> Result<(), ValidationError> {
        let order_no_ok = !self.order_no.is_empty()
            && self.order_no.len() <= 128
            && self
                .order_no
                .chars()
                .all(|c| c.is_ascii_graphic() && !matches!(c, '/' | '?' | '#' | '%'));
        if !order_no_ok {
            return Err(ValidationError::InvalidOrderNo);
        }

        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }

        if self.currency != accepted_currency {
            return Err(ValidationError::UnsupportedCurrency(self.currency.clone()));
        }

        money::validate_order_amount(self.amount).map_err(|_| ValidationError::AmountOutOfRange)?;

        self.parsed_notify_url()?;
        Ok(())
    }

    /// Parse `notify_url`; only absolute http(s) URLs are accepted.
    pub fn parsed_notify_url(&self) -> Result<Url, ValidationError> {
        let url = Url::parse(&self.notify_url)
            .map_err(|e| ValidationError::InvalidNotifyUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ValidationError::InvalidNotifyUrl(format!(
                "unsupported scheme {}",
                other
            ))),
        }
    }

    /// Order amount as the gateway's two-decimal money string.
    pub fn money(&self) -> String {
        money::format_major(self.amount)
    }
}
