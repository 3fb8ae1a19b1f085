use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::{AppConfig, ConfigError};
use crate::provider::{EpayClient, ProviderError, UsdtClient};
use crate::relay::{NotificationRelay, PlatformNotifier, RetryPolicy};
use crate::signature::BearerSigner;
use crate::store::OrderStore;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Page-level settings for the purchase flow
#[derive(Debug, Clone)]
pub struct PageSettings {
    /// Product name shown on the gateway instead of the order's own
    pub custom_name: Option<String>,
    pub auto_submit: bool,
}

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    /// Public base URL of this bridge
    pub base: Url,
    /// Only currency accepted on purchase
    pub currency: String,
    pub pages: PageSettings,
    pub orders: OrderStore,
    pub signer: Arc<BearerSigner>,
    pub relay: Arc<NotificationRelay>,
    pub epay: EpayClient,
    /// Present when the USDT gateway is enabled
    pub usdt: Option<UsdtClient>,
    pub v4_callback_enabled: bool,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        orders: OrderStore,
        notifier: Arc<dyn PlatformNotifier>,
    ) -> Result<Self, StateError> {
        let signer = Arc::new(BearerSigner::new(&config.cloudreve.key));
        let epay = EpayClient::from_config(&config.epay)?;
        let relay = NotificationRelay::new(
            orders.clone(),
            notifier,
            signer.clone(),
            RetryPolicy::from_config(&config.relay),
            config.relay.token_ttl_secs,
            epay.clone(),
            config.epay.verify_callback_sign,
        );

        let usdt = if config.usdt.enabled {
            Some(UsdtClient::new(
                &config.usdt,
                Duration::from_secs(config.relay.request_timeout_secs),
            )?)
        } else {
            None
        };

        let custom_name = Some(config.epay.custom_name.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(Self {
            base: config.base_url()?,
            currency: config.cloudreve.currency.clone(),
            pages: PageSettings {
                custom_name,
                auto_submit: config.epay.auto_submit,
            },
            orders,
            signer,
            relay: Arc::new(relay),
            epay,
            usdt,
            v4_callback_enabled: config.v4_callback.enabled,
        })
    }

    /// Absolute URL for `path` on this bridge (`path` starts with `/`).
    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }
}
