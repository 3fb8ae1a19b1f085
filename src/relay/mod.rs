//! Notification relay.
//!
//! Turns a gateway payment callback into a signed notification to
//! Cloudreve, and moves the order from pending to paid once Cloudreve has
//! acknowledged it.
//!
//! Flow for one callback:
//! 0. gateway MD5 signature (when enabled), signed `out_trade_no` must be
//!    the order the callback is addressed to
//! 1. session lookup
//! 2. `trade_status` must be `TRADE_SUCCESS`, anything else is acknowledged
//! 3. reported `money` must equal the stored amount exactly
//! 4. signed GET to the order's `notify_url`, retried per [`RetryPolicy`]
//! 5. paid marker set, session purged

pub mod notifier;
pub mod retry;

pub use notifier::{DeliveryError, HttpNotifier, NotifyReply, PlatformNotifier};
pub use retry::{RetryExhausted, RetryPolicy};

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::money;
use crate::provider::EpayClient;
use crate::signature::{BearerSigner, SignContent};
use crate::store::{OrderStore, StoreError};

/// Gateway status that means the payer has paid
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Gateway signature verification failed")]
    InvalidSignature,

    #[error("Callback for order {reported} delivered to order {expected}")]
    OrderMismatch { expected: String, reported: String },

    #[error("No purchase session for order {0}")]
    SessionNotFound(String),

    #[error("Unparseable amount {0:?}")]
    InvalidAmount(String),

    #[error("Amount mismatch: expected {expected}, gateway reported {reported}")]
    AmountMismatch { expected: String, reported: String },

    #[error("Notification failed after {attempts} attempt(s): {last}")]
    Delivery { attempts: u32, last: DeliveryError },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl RelayError {
    /// Application code for JSON callback responses.
    pub fn code(&self) -> i32 {
        match self {
            RelayError::SessionNotFound(_) => 404,
            RelayError::InvalidSignature
            | RelayError::OrderMismatch { .. }
            | RelayError::AmountMismatch { .. } => 400,
            RelayError::InvalidAmount(_) | RelayError::Delivery { .. } | RelayError::Store(_) => {
                500
            }
        }
    }
}

impl From<RetryExhausted> for RelayError {
    fn from(e: RetryExhausted) -> Self {
        RelayError::Delivery {
            attempts: e.attempts,
            last: e.last,
        }
    }
}

/// Result of a callback that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Cloudreve acknowledged; order is now paid
    Delivered { attempts: u32 },
    /// Non-success trade status; nothing changed
    Ignored { trade_status: String },
}

pub struct NotificationRelay {
    orders: OrderStore,
    notifier: Arc<dyn PlatformNotifier>,
    signer: Arc<BearerSigner>,
    policy: RetryPolicy,
    token_ttl_secs: i64,
    /// Parses and verifies gateway callbacks
    epay: EpayClient,
    /// `false` accepts callbacks without a valid MD5 signature
    verify_sign: bool,
}

impl NotificationRelay {
    pub fn new(
        orders: OrderStore,
        notifier: Arc<dyn PlatformNotifier>,
        signer: Arc<BearerSigner>,
        policy: RetryPolicy,
        token_ttl_secs: i64,
        epay: EpayClient,
        verify_sign: bool,
    ) -> Self {
        Self {
            orders,
            notifier,
            signer,
            policy,
            token_ttl_secs,
            epay,
            verify_sign,
        }
    }

    /// Process a gateway callback for `order_no`.
    pub async fn handle_callback(
        &self,
        order_no: &str,
        params: &HashMap<String, String>,
    ) -> Result<CallbackOutcome, RelayError> {
        let result = self.epay.verify(params);
        if self.verify_sign && !result.verified {
            warn!(order_no, "Gateway callback signature invalid");
            return Err(RelayError::InvalidSignature);
        }
        if result.out_trade_no != order_no {
            warn!(order_no, reported = %result.out_trade_no, "Callback addressed to another order");
            return Err(RelayError::OrderMismatch {
                expected: order_no.to_string(),
                reported: result.out_trade_no,
            });
        }

        let request = self
            .orders
            .session(order_no)
            .await?
            .ok_or_else(|| RelayError::SessionNotFound(order_no.to_string()))?;

        if result.trade_status != TRADE_SUCCESS {
            debug!(order_no, trade_status = %result.trade_status, "Ignoring non-success callback");
            return Ok(CallbackOutcome::Ignored {
                trade_status: result.trade_status,
            });
        }

        let matches = money::amount_matches(request.amount, &result.money)
            .map_err(|_| RelayError::InvalidAmount(result.money.clone()))?;
        if !matches {
            warn!(order_no, expected = %request.money(), reported = %result.money, "Callback amount mismatch");
            return Err(RelayError::AmountMismatch {
                expected: request.money(),
                reported: result.money,
            });
        }

        let target = request.parsed_notify_url().map_err(|e| RelayError::Delivery {
            attempts: 0,
            last: DeliveryError::InvalidTarget(e.to_string()),
        })?;
        let content = SignContent::for_path(target.path()).to_canonical_json();

        let attempts = self
            .policy
            .run(|attempt| {
                let expires = chrono::Utc::now().timestamp() + self.token_ttl_secs;
                let authorization = format!("Bearer {}", self.signer.sign(&content, expires));
                let target = &target;
                async move {
                    debug!(order_no, attempt, %target, "Sending payment notification");
                    self.notifier
                        .notify(target, &authorization)
                        .await
                        .map(|()| attempt)
                }
            })
            .await
            .inspect_err(|e| {
                error!(order_no, attempts = e.attempts, error = %e.last, "Payment notification failed");
            })?;

        if let Err(e) = self.orders.complete(order_no).await {
            error!(order_no, error = %e, "Notified but failed to mark order paid");
            return Err(e.into());
        }

        info!(order_no, attempts, "Order paid and notified");
        Ok(CallbackOutcome::Delivered { attempts })
    }

    /// Mark a pending order paid without verification or notification.
    pub async fn trusted_complete(&self, order_no: &str) -> Result<(), RelayError> {
        if self.orders.session(order_no).await?.is_none() {
            return Err(RelayError::SessionNotFound(order_no.to_string()));
        }
        warn!(order_no, "Order marked paid through unauthenticated trusted callback");
        self.orders.complete(order_no).await?;
        Ok(())
    }
}
