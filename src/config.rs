use std::{env, time::Duration};

use dotenv::dotenv;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// SMTP account used for confirmation emails.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

/// Gateway API credentials. The key id is public, the secret is not.
#[derive(Clone)]
pub struct GatewayKeys {
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub webhook_secret: Option<String>,
    pub gateway_keys: Option<GatewayKeys>,
    pub smtp: Option<SmtpSettings>,
    pub merchant_email: Option<String>,
    pub store_name: String,
    pub currency: String,
    pub lookup_max_attempts: u32,
    pub lookup_interval: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<set>"))
            .field("gateway_keys", &self.gateway_keys.as_ref().map(|k| &k.key_id))
            .field("smtp_host", &self.smtp.as_ref().map(|s| &s.host))
            .field("merchant_email", &self.merchant_email)
            .field("store_name", &self.store_name)
            .field("currency", &self.currency)
            .field("lookup_max_attempts", &self.lookup_max_attempts)
            .field("lookup_interval", &self.lookup_interval)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        info!("Configuration loaded: {config:?}");
        Ok(config)
    }

    /// Builds the configuration from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let gateway_keys = match (get("RAZORPAY_KEY_ID"), get("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(GatewayKeys { key_id, key_secret }),
            _ => None,
        };

        let smtp = match (get("SMTP_USERNAME"), get("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpSettings {
                host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                from: get("MAIL_FROM").unwrap_or_else(|| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        let lookup_max_attempts = match get("ORDER_LOOKUP_MAX_ATTEMPTS") {
            Some(raw) => parse_number::<u32>("ORDER_LOOKUP_MAX_ATTEMPTS", &raw)?.max(1),
            None => 3,
        };
        let lookup_interval = match get("ORDER_LOOKUP_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_number("ORDER_LOOKUP_INTERVAL_MS", &raw)?),
            None => Duration::from_secs(2),
        };

        Ok(Self {
            database_url,
            webhook_secret: get("RAZORPAY_WEBHOOK_SECRET"),
            gateway_keys,
            smtp,
            merchant_email: get("MERCHANT_EMAIL"),
            store_name: get("STORE_NAME").unwrap_or_else(|| "Store".to_string()),
            currency: get("CURRENCY").unwrap_or_else(|| "INR".to_string()),
            lookup_max_attempts,
            lookup_interval,
        })
    }
}

fn parse_number<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap();
        assert!(config.webhook_secret.is_none());
        assert!(config.smtp.is_none());
        assert!(config.merchant_email.is_none());
        assert_eq!(config.lookup_max_attempts, 3);
        assert_eq!(config.lookup_interval, Duration::from_secs(2));
        assert_eq!(config.currency, "INR");
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn smtp_needs_both_credentials() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("SMTP_USERNAME", "shop@example.com"),
        ])
        .unwrap();
        assert!(config.smtp.is_none());

        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("SMTP_USERNAME", "shop@example.com"),
            ("SMTP_PASSWORD", "hunter2"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.from, "shop@example.com");
    }

    #[test]
    fn lookup_policy_is_tunable() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("ORDER_LOOKUP_MAX_ATTEMPTS", "0"),
            ("ORDER_LOOKUP_INTERVAL_MS", "250"),
        ])
        .unwrap();
        assert_eq!(config.lookup_max_attempts, 1);
        assert_eq!(config.lookup_interval, Duration::from_millis(250));

        assert!(matches!(
            config_from(&[
                ("DATABASE_URL", "postgres://localhost/shop"),
                ("ORDER_LOOKUP_INTERVAL_MS", "soon"),
            ]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("RAZORPAY_WEBHOOK_SECRET", "  "),
        ])
        .unwrap();
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://user:pw@localhost/shop"),
            ("RAZORPAY_WEBHOOK_SECRET", "whsec_live"),
        ])
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("whsec_live"));
        assert!(!rendered.contains("pw@"));
    }
}
