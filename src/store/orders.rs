//! Typed order state on top of a [`KvStore`] driver.
//!
//! Keys:
//! - `purchase_session_<order_no>` -> JSON [`PurchaseRequest`], 24h
//! - `paid_order_<order_no>` -> JSON `true`, 7d
//!
//! State machine: `Pending` (session only) -> `Paid` (marker set, session
//! purged). A marker is never removed by the bridge.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{KvStore, StoreError};
use crate::models::PurchaseRequest;

pub const PURCHASE_SESSION_PREFIX: &str = "purchase_session_";
pub const PAID_ORDER_PREFIX: &str = "paid_order_";

/// Session lifetime (24h)
pub const SESSION_TTL_SECS: u64 = 86_400;

/// Paid marker lifetime (7 days)
pub const PAID_TTL_SECS: u64 = 604_800;

/// Observable state of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderState {
    /// Neither session nor marker: expired or never created
    Unknown,
    Pending(PurchaseRequest),
    Paid,
}

impl OrderState {
    /// Status string returned to Cloudreve.
    pub fn as_status(&self) -> &'static str {
        match self {
            OrderState::Paid => "PAID",
            OrderState::Pending(_) | OrderState::Unknown => "UNPAID",
        }
    }
}

/// Handle to order sessions and paid markers.
///
/// Cheap to clone; every component that touches order state receives one.
#[derive(Clone)]
pub struct OrderStore {
    kv: Arc<dyn KvStore>,
}

impl OrderStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn driver_name(&self) -> &'static str {
        self.kv.name()
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl: u64) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.kv.set(key, bytes, ttl).await
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv.get(key).await? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Store a pending purchase session (24h).
    pub async fn put_session(&self, request: &PurchaseRequest) -> Result<(), StoreError> {
        let key = format!("{}{}", PURCHASE_SESSION_PREFIX, request.order_no);
        debug!(order_no = %request.order_no, "Storing purchase session");
        self.put_json(&key, request, SESSION_TTL_SECS).await
    }

    pub async fn session(&self, order_no: &str) -> Result<Option<PurchaseRequest>, StoreError> {
        self.get_json(&format!("{}{}", PURCHASE_SESSION_PREFIX, order_no))
            .await
    }

    pub async fn purge_session(&self, order_no: &str) -> Result<(), StoreError> {
        self.kv.delete(&[order_no], PURCHASE_SESSION_PREFIX).await
    }

    /// Set the paid marker (7 days).
    pub async fn mark_paid(&self, order_no: &str) -> Result<(), StoreError> {
        let key = format!("{}{}", PAID_ORDER_PREFIX, order_no);
        self.put_json(&key, &true, PAID_TTL_SECS).await
    }

    pub async fn is_paid(&self, order_no: &str) -> Result<bool, StoreError> {
        let marker: Option<bool> = self
            .get_json(&format!("{}{}", PAID_ORDER_PREFIX, order_no))
            .await?;
        Ok(marker.unwrap_or(false))
    }

    /// Mark paid, then purge the session.
    ///
    /// Marker first: an interrupted call leaves a paid order with a stale
    /// session, never an unpaid order without one.
    pub async fn complete(&self, order_no: &str) -> Result<(), StoreError> {
        self.mark_paid(order_no).await?;
        self.purge_session(order_no).await
    }

    /// Resolve the current state; the paid marker wins over any session.
    pub async fn state(&self, order_no: &str) -> Result<OrderState, StoreError> {
        if self.is_paid(order_no).await? {
            return Ok(OrderState::Paid);
        }
        Ok(match self.session(order_no).await? {
            Some(request) => OrderState::Pending(request),
            None => OrderState::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn widget(order_no: &str) -> PurchaseRequest {
        PurchaseRequest {
            name: "Widget".into(),
            order_no: order_no.into(),
            notify_url: "http://x/cb".into(),
            amount: 100,
            currency: "CNY".into(),
        }
    }

    fn store() -> (Arc<MemoryStore>, OrderStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), OrderStore::new(kv))
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let (_, orders) = store();
        orders.put_session(&widget("T1")).await.unwrap();
        assert_eq!(orders.session("T1").await.unwrap(), Some(widget("T1")));
        assert_eq!(orders.session("T2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_state_machine() {
        let (_, orders) = store();
        assert_eq!(orders.state("T1").await.unwrap(), OrderState::Unknown);

        orders.put_session(&widget("T1")).await.unwrap();
        assert_eq!(
            orders.state("T1").await.unwrap(),
            OrderState::Pending(widget("T1"))
        );
        assert_eq!(orders.state("T1").await.unwrap().as_status(), "UNPAID");

        orders.complete("T1").await.unwrap();
        assert_eq!(orders.state("T1").await.unwrap(), OrderState::Paid);
        assert_eq!(orders.session("T1").await.unwrap(), None);
        assert!(orders.is_paid("T1").await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_follow_prefix_layout() {
        let (kv, orders) = store();
        orders.put_session(&widget("T9")).await.unwrap();
        orders.mark_paid("T9").await.unwrap();

        assert!(kv.get("purchase_session_T9").await.unwrap().is_some());
        assert_eq!(
            kv.get("paid_order_T9").await.unwrap(),
            Some(b"true".to_vec())
        );
    }

    #[tokio::test]
    async fn test_undecodable_session_is_explicit_error() {
        let (kv, orders) = store();
        kv.set("purchase_session_BAD", b"not json".to_vec(), 0)
            .await
            .unwrap();
        assert!(matches!(
            orders.session("BAD").await,
            Err(StoreError::Decode { .. })
        ));
    }
}
