// Environment-driven configuration, read once at startup.

use anyhow::{bail, Context};
use std::env;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_url: String,
    pub api_key: String,
    pub instance: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub database_path: String,
    pub jwt_secret: String,
    pub jwt_audience: String,
    /// `None` disables outgoing WhatsApp messages.
    pub whatsapp: Option<WhatsAppConfig>,
    pub admin_contact: Option<String>,
    pub currency_symbol: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8001".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8001")?;

        let store_backend = match get("STORE_BACKEND").as_deref() {
            None | Some("sqlite") => StoreBackend::Sqlite,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("STORE_BACKEND must be 'sqlite' or 'memory', got '{}'", other),
        };

        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;

        let whatsapp = match (get("WHATSAPP_API_URL"), get("WHATSAPP_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(WhatsAppConfig {
                api_url,
                api_key,
                instance: get("WHATSAPP_INSTANCE").unwrap_or_else(|| "marketplace".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            store_backend,
            database_path: get("DATABASE_PATH")
                .unwrap_or_else(|| "data/marketplace.db".to_string()),
            jwt_secret,
            jwt_audience: get("JWT_AUDIENCE").unwrap_or_else(|| "authenticated".to_string()),
            whatsapp,
            admin_contact: get("ADMIN_WHATSAPP"),
            currency_symbol: get("CURRENCY_SYMBOL").unwrap_or_else(|| "R$".to_string()),
        })
    }
}
