use std::env;

use thiserror::Error;

use crate::infrastructure::payos::PayOsConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PAYOS_API_URL: &str = "https://api-merchant.payos.vn";
const DEFAULT_CLIENT_URL: &str = "http://localhost:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub payos: PayOsConfig,
    /// Storefront base URL; the gateway sends buyers back to its order history.
    pub client_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let optional = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(AppConfig {
            database_url: required("DATABASE_URL")?,
            host: optional("HOST", DEFAULT_HOST),
            port,
            jwt_secret: required("JWT_SECRET")?,
            payos: PayOsConfig {
                api_url: optional("PAYOS_API_URL", DEFAULT_PAYOS_API_URL),
                client_id: required("PAYOS_CLIENT_ID")?,
                api_key: required("PAYOS_API_KEY")?,
                checksum_key: required("PAYOS_CHECKSUM_KEY")?,
            },
            client_url: optional("CLIENT_URL", DEFAULT_CLIENT_URL),
        })
    }

    /// Where the gateway redirects after a cancelled or completed payment.
    pub fn order_history_url(&self) -> String {
        format!("{}/order-history", self.client_url.trim_end_matches('/'))
    }
}
