// ============================================================
// config: deployment settings read from the environment
// ============================================================

use std::env;
use std::fmt;

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 4242;
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub secret_key:      String,
    /// Echoed to clients so they can initialise the provider's SDK.
    pub publishable_key: String,
    pub port:            u16,
    pub api_base:        Url,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("STRIPE_SECRET_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        let publishable_key = lookup("STRIPE_PUBLISHABLE_KEY").unwrap_or_default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name:  "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let raw_base = lookup("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = Url::parse(&raw_base)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(ConfigError::Invalid {
                name:  "STRIPE_API_BASE",
                value: raw_base.clone(),
            })?;

        Ok(Config {
            secret_key,
            publishable_key,
            port,
            api_base,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret_key", &"<redacted>")
            .field("publishable_key", &self.publishable_key)
            .field("port", &self.port)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}
