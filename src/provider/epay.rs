//! Fiat gateway (epay) adapter.
//!
//! The gateway is driven by a browser form POST, so "purchase" only builds
//! the signed parameter set; nothing is sent from here.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use url::Url;

use super::ProviderError;
use crate::config::EpayConfig;
use crate::signature::{generate_params, verify_params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseType {
    Alipay,
    Wxpay,
}

impl PurchaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseType::Alipay => "alipay",
            PurchaseType::Wxpay => "wxpay",
        }
    }
}

impl FromStr for PurchaseType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alipay" => Ok(PurchaseType::Alipay),
            "wxpay" => Ok(PurchaseType::Wxpay),
            other => Err(ProviderError::Config(format!(
                "unknown purchase type {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Pc,
    Mobile,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Pc => "pc",
            DeviceType::Mobile => "mobile",
        }
    }

    /// `mobile` when the user agent mentions it (case-insensitive).
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.to_ascii_lowercase().contains("mobile") {
            DeviceType::Mobile
        } else {
            DeviceType::Pc
        }
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseArgs {
    pub out_trade_no: String,
    pub name: String,
    /// Two-decimal major-unit amount
    pub money: String,
    pub device: DeviceType,
    pub client_ip: String,
    pub notify_url: Url,
    pub return_url: Url,
}

/// Signed form the payer's browser submits to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseForm {
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
}

/// Parsed gateway callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyResult {
    pub trade_no: String,
    pub out_trade_no: String,
    pub name: String,
    pub money: String,
    pub trade_status: String,
    pub payment_type: String,
    pub verified: bool,
}

#[derive(Debug, Clone)]
pub struct EpayClient {
    partner_id: String,
    key: String,
    endpoint: String,
    purchase_type: PurchaseType,
}

impl EpayClient {
    pub fn new(
        partner_id: impl Into<String>,
        key: impl Into<String>,
        endpoint: impl Into<String>,
        purchase_type: PurchaseType,
    ) -> Self {
        Self {
            partner_id: partner_id.into(),
            key: key.into(),
            endpoint: endpoint.into(),
            purchase_type,
        }
    }

    pub fn from_config(config: &EpayConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(
            &config.partner_id,
            &config.key,
            &config.endpoint,
            config.purchase_type.parse()?,
        ))
    }

    pub fn purchase_type(&self) -> PurchaseType {
        self.purchase_type
    }

    /// Build the signed purchase form.
    pub fn purchase(&self, args: &PurchaseArgs) -> PurchaseForm {
        let params: BTreeMap<String, String> = [
            ("pid", self.partner_id.as_str()),
            ("type", self.purchase_type.as_str()),
            ("out_trade_no", args.out_trade_no.as_str()),
            ("notify_url", args.notify_url.as_str()),
            ("return_url", args.return_url.as_str()),
            ("name", args.name.as_str()),
            ("money", args.money.as_str()),
            ("clientip", args.client_ip.as_str()),
            ("device", args.device.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        PurchaseForm {
            endpoint: self.endpoint.clone(),
            params: generate_params(&params, &self.key),
        }
    }

    /// Extract callback fields and check the signature.
    pub fn verify(&self, params: &HashMap<String, String>) -> VerifyResult {
        let field = |name: &str| params.get(name).cloned().unwrap_or_default();
        VerifyResult {
            trade_no: field("trade_no"),
            out_trade_no: field("out_trade_no"),
            name: field("name"),
            money: field("money"),
            trade_status: field("trade_status"),
            payment_type: field("type"),
            verified: verify_params(params, &self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{SIGN_FIELD, SIGN_TYPE_FIELD};

    fn client() -> EpayClient {
        EpayClient::new(
            "1010",
            "secret",
            "https://gateway.example.com/submit.php",
            PurchaseType::Alipay,
        )
    }

    fn args() -> PurchaseArgs {
        PurchaseArgs {
            out_trade_no: "T1".into(),
            name: "Widget".into(),
            money: "1.00".into(),
            device: DeviceType::Pc,
            client_ip: "203.0.113.7".into(),
            notify_url: Url::parse("http://pay.example.com/notify/T1").unwrap(),
            return_url: Url::parse("http://pay.example.com/return/T1").unwrap(),
        }
    }

    #[test]
    fn test_purchase_form_is_signed() {
        let form = client().purchase(&args());
        assert_eq!(form.endpoint, "https://gateway.example.com/submit.php");
        assert_eq!(form.params["pid"], "1010");
        assert_eq!(form.params["type"], "alipay");
        assert_eq!(form.params["money"], "1.00");
        assert_eq!(form.params["device"], "pc");
        assert_eq!(form.params[SIGN_TYPE_FIELD], "MD5");
        assert_eq!(form.params[SIGN_FIELD].len(), 32);
        assert!(verify_params(&form.params, "secret"));
        assert!(!verify_params(&form.params, "other"));
    }

    #[test]
    fn test_verify_extracts_fields() {
        let form = client().purchase(&args());
        let mut params: HashMap<String, String> = form.params.into_iter().collect();
        params.insert("trade_no".into(), "".into());

        let result = client().verify(&params);
        assert!(result.verified);
        assert_eq!(result.out_trade_no, "T1");
        assert_eq!(result.money, "1.00");
        assert_eq!(result.payment_type, "alipay");
        assert_eq!(result.trade_no, "");
    }

    #[test]
    fn test_verify_detects_tampering() {
        let form = client().purchase(&args());
        let mut params: HashMap<String, String> = form.params.into_iter().collect();
        params.insert("money".into(), "100.00".into());
        assert!(!client().verify(&params).verified);
    }

    #[test]
    fn test_device_from_user_agent() {
        assert_eq!(
            DeviceType::from_user_agent("Mozilla/5.0 (iPhone) Mobile/15E148"),
            DeviceType::Mobile
        );
        assert_eq!(
            DeviceType::from_user_agent("Mozilla/5.0 (X11; Linux x86_64)"),
            DeviceType::Pc
        );
    }

    #[test]
    fn test_purchase_type_parse() {
        assert_eq!("wxpay".parse::<PurchaseType>().unwrap(), PurchaseType::Wxpay);
        assert!("paypal".parse::<PurchaseType>().is_err());
    }
}
