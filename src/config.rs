use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;
use url::Url;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "CR_EPAY_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub server: ServerConfig,
    pub cloudreve: CloudreveConfig,
    pub epay: EpayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub usdt: UsdtConfig,
    #[serde(default)]
    pub v4_callback: V4CallbackConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this bridge; redirect and notify URLs are built on it
    pub base: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloudreveConfig {
    /// Shared HMAC secret for bearer tokens
    pub key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "CNY".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EpayConfig {
    pub partner_id: String,
    pub key: String,
    pub endpoint: String,
    #[serde(default = "default_purchase_type")]
    pub purchase_type: String,
    /// Replaces the product name shown on the gateway when non-empty
    #[serde(default)]
    pub custom_name: String,
    #[serde(default = "default_true")]
    pub auto_submit: bool,
    #[serde(default = "default_true")]
    pub verify_callback_sign: bool,
}

fn default_purchase_type() -> String {
    "alipay".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub driver: StoreDriver,
    #[serde(default)]
    pub redis: RedisConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RedisConfig {
    pub server: String,
    pub password: String,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            server: "localhost:6379".to_string(),
            password: String::new(),
            db: 0,
        }
    }
}

/// Outbound notification delivery
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    /// Lifetime of the bearer token attached to each notification
    pub token_ttl_secs: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 100,
            request_timeout_secs: 10,
            token_ttl_secs: 600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UsdtConfig {
    pub enabled: bool,
    pub api_endpoint: String,
    pub auth_token: String,
    /// Chain code sent with each transaction: TRON, POLY, OP, BSC
    pub default_chain: String,
}

impl Default for UsdtConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_endpoint: "http://localhost:6080".to_string(),
            auth_token: String::new(),
            default_chain: "TRON".to_string(),
        }
    }
}

/// Trusted callback that marks orders paid without verification
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct V4CallbackConfig {
    pub enabled: bool,
}

impl Default for V4CallbackConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`, apply `CR_EPAY_*` overrides and validate.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from a lookup keyed by the variable name without prefix.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BASE") {
            self.server.base = v;
        }
        if let Some(v) = lookup("LISTEN_PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::Invalid {
                key: "CR_EPAY_LISTEN_PORT",
                reason: format!("not a port: {}", v),
            })?;
        }
        if let Some(v) = lookup("CLOUDREVE_KEY") {
            self.cloudreve.key = v;
        }
        if let Some(v) = lookup("EPAY_PARTNER_ID") {
            self.epay.partner_id = v;
        }
        if let Some(v) = lookup("EPAY_KEY") {
            self.epay.key = v;
        }
        if let Some(v) = lookup("EPAY_ENDPOINT") {
            self.epay.endpoint = v;
        }
        if let Some(v) = lookup("REDIS_ENABLED") {
            self.store.driver = match v.as_str() {
                "true" | "1" => StoreDriver::Redis,
                "false" | "0" => StoreDriver::Memory,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CR_EPAY_REDIS_ENABLED",
                        reason: format!("not a boolean: {}", v),
                    });
                }
            };
        }
        if let Some(v) = lookup("REDIS_SERVER") {
            self.store.redis.server = v;
        }
        if let Some(v) = lookup("REDIS_PASSWORD") {
            self.store.redis.password = v;
        }
        if let Some(v) = lookup("USDT_MORE_AUTH_TOKEN") {
            self.usdt.auth_token = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("server.base", &self.server.base),
            ("cloudreve.key", &self.cloudreve.key),
            ("epay.partner_id", &self.epay.partner_id),
            ("epay.key", &self.epay.key),
            ("epay.endpoint", &self.epay.endpoint),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must not be empty".into(),
                });
            }
        }

        self.base_url()?;

        if !matches!(self.epay.purchase_type.as_str(), "alipay" | "wxpay") {
            return Err(ConfigError::Invalid {
                key: "epay.purchase_type",
                reason: format!("unknown purchase type {}", self.epay.purchase_type),
            });
        }

        if self.relay.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "relay.max_attempts",
                reason: "must be at least 1".into(),
            });
        }

        if self.usdt.enabled && self.usdt.auth_token.is_empty() {
            return Err(ConfigError::Invalid {
                key: "usdt.auth_token",
                reason: "required when usdt is enabled".into(),
            });
        }
        Ok(())
    }

    /// Parsed public base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.server.base).map_err(|e| ConfigError::Invalid {
            key: "server.base",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) const SAMPLE: &str = r#"
log_level: info
log_dir: ./logs
log_file: epay_bridge.log
use_json: false
rotation: daily
server:
  host: 127.0.0.1
  port: 4560
  base: http://pay.example.com
cloudreve:
  key: cloudreve-secret
epay:
  partner_id: "1010"
  key: epay-secret
  endpoint: https://gateway.example.com/submit.php
"#;

    pub(crate) fn sample_config() -> AppConfig {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_defaults_applied() {
        let config = sample_config();
        assert_eq!(config.cloudreve.currency, "CNY");
        assert_eq!(config.epay.purchase_type, "alipay");
        assert!(config.epay.auto_submit);
        assert!(config.epay.verify_callback_sign);
        assert_eq!(config.store.driver, StoreDriver::Memory);
        assert_eq!(config.relay.max_attempts, 5);
        assert_eq!(config.relay.token_ttl_secs, 600);
        assert!(!config.usdt.enabled);
        assert!(config.v4_callback.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = sample_config();
        let env: HashMap<&str, &str> = [
            ("CLOUDREVE_KEY", "from-env"),
            ("LISTEN_PORT", "9000"),
            ("REDIS_ENABLED", "true"),
            ("REDIS_SERVER", "redis:6379"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.cloudreve.key, "from-env");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.driver, StoreDriver::Redis);
        assert_eq!(config.store.redis.server, "redis:6379");
    }

    #[test]
    fn test_bad_override_rejected() {
        let mut config = sample_config();
        let result = config.apply_overrides(|k| (k == "LISTEN_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let mut config = sample_config();
        config.cloudreve.key = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "cloudreve.key",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_purchase_type() {
        let mut config = sample_config();
        config.epay.purchase_type = "paypal".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_usdt_requires_token() {
        let mut config = sample_config();
        config.usdt.enabled = true;
        assert!(config.validate().is_err());
        config.usdt.auth_token = "123456".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let yaml = format!("{}relay:\n  max_attempts: 2\nstore:\n  driver: redis\n  redis:\n    db: 3\n", SAMPLE);
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.relay.max_attempts, 2);
        assert_eq!(config.relay.retry_delay_ms, 100);
        assert_eq!(config.store.driver, StoreDriver::Redis);
        assert_eq!(config.store.redis.server, "localhost:6379");
        assert_eq!(config.store.redis.db, 3);
    }

    #[test]
    fn test_shipped_dev_config_is_valid() {
        let content = fs::read_to_string("config/dev.yaml").unwrap();
        let config = AppConfig::from_yaml(&content).unwrap();
        config.validate().unwrap();
        assert_eq!(config.store.driver, StoreDriver::Memory);
    }
}
