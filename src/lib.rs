//! epay-bridge - Cloudreve payment gateway bridge
//!
//! Accepts purchase requests from Cloudreve, hands the payer to an epay
//! (or USDT) gateway, and relays verified payment callbacks back to
//! Cloudreve as signed notifications.
//!
//! # Modules
//!
//! - [`config`] - YAML config with environment overrides
//! - [`logging`] - tracing subscriber setup
//! - [`money`] - Minor-unit amounts and decimal formatting
//! - [`signature`] - Gateway MD5 parameter signing and HMAC bearer tokens
//! - [`api_auth`] - Bearer token middleware for Cloudreve requests
//! - [`models`] - Purchase request type and validation
//! - [`store`] - Session and paid-marker storage drivers
//! - [`provider`] - epay and USDT gateway clients
//! - [`relay`] - Callback verification and retried notify delivery
//! - [`gateway`] - HTTP routes and handlers

// Foundations
pub mod config;
pub mod logging;
pub mod money;
pub mod signature;

// Domain
pub mod models;
pub mod provider;
pub mod store;

// Services
pub mod api_auth;
pub mod gateway;
pub mod relay;

// Convenient re-exports at crate root
pub use config::{AppConfig, ConfigError};
pub use gateway::{AppState, build_router, run_server};
pub use models::{PurchaseRequest, ValidationError};
pub use relay::{CallbackOutcome, HttpNotifier, NotificationRelay, PlatformNotifier, RelayError};
pub use signature::{BearerSigner, SignContent};
pub use store::{KvStore, MemoryStore, OrderState, OrderStore, StoreError};
