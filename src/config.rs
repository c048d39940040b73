use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_FORM_URL: &str = "https://form.wspay.biz/Authorization.aspx";
pub const TEST_FORM_URL: &str = "https://formtest.wspay.biz/Authorization.aspx";

#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub wspay: WsPayConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Absolute base URL the gateway uses to reach the callback endpoints.
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug)]
pub struct WsPayConfig {
    pub shop_id: String,
    pub secret_key: SecretString,
    pub form_url: String,
    /// Render a payment page before handing the customer to the gateway.
    pub payment_view: bool,
    pub cart_url: String,
    /// Where to send the customer after a successful payment; the order page
    /// when unset.
    pub thank_you_url: Option<String>,
    pub order_url: String,
    pub commission_percentage: Option<Decimal>,
    pub modifier_choice_text: String,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
    pub cancel_message: Option<String>,
    pub currency: String,
    /// Bearer token guarding the order acknowledge endpoint; the endpoint
    /// refuses every request when unset.
    pub admin_token: Option<SecretString>,
}

impl WsPayConfig {
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_ref().map(|token| token.expose_secret())
    }

    pub fn uses_test_gateway(&self) -> bool {
        self.form_url == TEST_FORM_URL
    }
}

/// Read a WSPay setting by its canonical `WSPAY_*` name, falling back to the
/// legacy `SHOP_WSPAY_*` alias.
fn wspay_setting<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(&format!("WSPAY_{}", name)))
        .or_else(|| non_empty(lookup(&format!("SHOP_WSPAY_{}", name))))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got {}", key, other)),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve the whole configuration once from a key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .context("PORT not set")?
            .parse()
            .context("PORT must be a valid number")?;

        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            public_url: non_empty(lookup("PUBLIC_URL"))
                .unwrap_or_else(|| format!("http://localhost:{}", port))
                .trim_end_matches('/')
                .to_string(),
        };

        let database = match non_empty(lookup("DATABASE_URL")) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|| "20".to_string())
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            }),
            None => None,
        };

        let shop_id = wspay_setting(&lookup, "SHOP_ID")
            .or_else(|| non_empty(lookup("SHOP_WSPAY_ID")))
            .context("WSPAY_SHOP_ID setting must be set")?;
        let secret_key = wspay_setting(&lookup, "SECRET_KEY")
            .context("WSPAY_SECRET_KEY setting must be set")?;

        let payment_view = match wspay_setting(&lookup, "PAYMENT_VIEW") {
            Some(value) => parse_flag("WSPAY_PAYMENT_VIEW", &value)?,
            None => false,
        };

        let commission_percentage = wspay_setting(&lookup, "COMMISSION_PERCENTAGE")
            .or_else(|| wspay_setting(&lookup, "COMMISION_PERCENTAGE"))
            .map(|value| {
                Decimal::from_str(&value)
                    .context("WSPAY_COMMISSION_PERCENTAGE must be a decimal number")
            })
            .transpose()?;

        let wspay = WsPayConfig {
            shop_id,
            secret_key: SecretString::new(secret_key.into_boxed_str()),
            form_url: wspay_setting(&lookup, "FORM_URL")
                .unwrap_or_else(|| DEFAULT_FORM_URL.to_string()),
            payment_view,
            cart_url: wspay_setting(&lookup, "CART_URL")
                .or_else(|| non_empty(lookup("SHOP_CART_URL")))
                .unwrap_or_else(|| "/shop/cart/".to_string()),
            thank_you_url: wspay_setting(&lookup, "THANK_YOU_URL")
                .or_else(|| non_empty(lookup("SHOP_THANK_YOU_URL"))),
            order_url: wspay_setting(&lookup, "ORDER_URL")
                .unwrap_or_else(|| "/shop/orders".to_string())
                .trim_end_matches('/')
                .to_string(),
            commission_percentage,
            modifier_choice_text: wspay_setting(&lookup, "MODIFIER_CHOICE_TEXT")
                .unwrap_or_else(|| "WSPay".to_string()),
            success_message: wspay_setting(&lookup, "SUCCESS_MESSAGE"),
            error_message: wspay_setting(&lookup, "ERROR_MESSAGE"),
            cancel_message: wspay_setting(&lookup, "CANCEL_MESSAGE"),
            currency: wspay_setting(&lookup, "CURRENCY").unwrap_or_else(|| "EUR".to_string()),
            admin_token: wspay_setting(&lookup, "ADMIN_TOKEN")
                .map(|token| SecretString::new(token.into_boxed_str())),
        };

        let config = Config {
            server,
            database,
            wspay,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if !is_http_url(&self.server.public_url) {
            return Err(anyhow!(
                "PUBLIC_URL must be an absolute http(s) URL, got {}",
                self.server.public_url
            ));
        }

        if let Some(database) = &self.database {
            if database.max_connections == 0 {
                return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
            }
        }

        if !is_http_url(&self.wspay.form_url) {
            return Err(anyhow!(
                "WSPAY_FORM_URL must be an absolute http(s) URL, got {}",
                self.wspay.form_url
            ));
        }

        let currency = &self.wspay.currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(anyhow!(
                "WSPAY_CURRENCY must be a three-letter ISO 4217 code, got {}",
                currency
            ));
        }

        if let Some(percentage) = self.wspay.commission_percentage {
            if percentage.is_sign_negative() || percentage > Decimal::ONE_HUNDRED {
                return Err(anyhow!(
                    "WSPAY_COMMISSION_PERCENTAGE must be between 0 and 100, got {}",
                    percentage
                ));
            }
        }

        if self.wspay.admin_token.is_none() {
            tracing::warn!("WSPAY_ADMIN_TOKEN not set, order acknowledgement is disabled");
        }

        if self.server.environment == "production" && self.wspay.uses_test_gateway() {
            tracing::warn!("Production environment is configured with the WSPay test form");
        }

        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("PORT", "3030"),
        ("WSPAY_SHOP_ID", "MYSHOP"),
        ("WSPAY_SECRET_KEY", "s3cr3t"),
    ];

    #[test]
    fn test_defaults() {
        let config = config_from(REQUIRED).unwrap();
        assert_eq!(config.server.public_url, "http://localhost:3030");
        assert!(config.database.is_none());
        assert_eq!(config.wspay.shop_id, "MYSHOP");
        assert_eq!(config.wspay.secret_key(), "s3cr3t");
        assert_eq!(config.wspay.form_url, DEFAULT_FORM_URL);
        assert!(!config.wspay.payment_view);
        assert_eq!(config.wspay.cart_url, "/shop/cart/");
        assert_eq!(config.wspay.thank_you_url, None);
        assert_eq!(config.wspay.modifier_choice_text, "WSPay");
        assert_eq!(config.wspay.currency, "EUR");
    }

    #[test]
    fn test_missing_secret_key() {
        let err = config_from(&[("PORT", "3030"), ("WSPAY_SHOP_ID", "MYSHOP")]).unwrap_err();
        assert!(err.to_string().contains("WSPAY_SECRET_KEY"));
    }

    #[test]
    fn test_empty_shop_id_is_missing() {
        let err = config_from(&[
            ("PORT", "3030"),
            ("WSPAY_SHOP_ID", "  "),
            ("WSPAY_SECRET_KEY", "s3cr3t"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("WSPAY_SHOP_ID"));
    }

    #[test]
    fn test_legacy_aliases() {
        let config = config_from(&[
            ("PORT", "3030"),
            ("SHOP_WSPAY_ID", "LEGACY"),
            ("SHOP_WSPAY_SECRET_KEY", "old"),
            ("SHOP_WSPAY_PAYMENT_VIEW", "true"),
            ("SHOP_WSPAY_COMMISION_PERCENTAGE", "2.5"),
        ])
        .unwrap();
        assert_eq!(config.wspay.shop_id, "LEGACY");
        assert_eq!(config.wspay.secret_key(), "old");
        assert!(config.wspay.payment_view);
        assert_eq!(config.wspay.commission_percentage, Some(Decimal::new(25, 1)));
    }

    #[test]
    fn test_canonical_key_wins_over_alias() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHOP_WSPAY_SHOP_ID", "LEGACY"));
        let config = config_from(&pairs).unwrap();
        assert_eq!(config.wspay.shop_id, "MYSHOP");
    }

    #[test]
    fn test_shop_url_fallbacks() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SHOP_CART_URL", "/cart/"));
        pairs.push(("SHOP_THANK_YOU_URL", "/thanks/"));
        let config = config_from(&pairs).unwrap();
        assert_eq!(config.wspay.cart_url, "/cart/");
        assert_eq!(config.wspay.thank_you_url.as_deref(), Some("/thanks/"));

        pairs.push(("WSPAY_CART_URL", "/wspay-cart/"));
        let config = config_from(&pairs).unwrap();
        assert_eq!(config.wspay.cart_url, "/wspay-cart/");
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WSPAY_CURRENCY", "euro"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WSPAY_PAYMENT_VIEW", "maybe"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WSPAY_COMMISSION_PERCENTAGE", "150"));
        assert!(config_from(&pairs).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ENVIRONMENT", "qa"));
        assert!(config_from(&pairs).is_err());

        assert!(config_from(&[
            ("PORT", "80"),
            ("WSPAY_SHOP_ID", "MYSHOP"),
            ("WSPAY_SECRET_KEY", "s3cr3t"),
        ])
        .is_err());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WSPAY_ADMIN_TOKEN", "adm1n"));
        let config = config_from(&pairs).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("adm1n"));
        assert_eq!(config.wspay.admin_token(), Some("adm1n"));
    }

    #[test]
    fn test_admin_token_is_optional() {
        let config = config_from(REQUIRED).unwrap();
        assert_eq!(config.wspay.admin_token(), None);
    }
}
