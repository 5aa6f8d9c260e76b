//! Process configuration, read once from the environment at startup.
//!
//! Unset variables fall back to defaults (logged at `info`); malformed values
//! fail startup.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::{info, warn};

use atomic_cart::CheckoutPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory repositories.
    pub database_url: Option<String>,
    /// Apply the storefront schema on startup.
    pub apply_schema: bool,
    pub checkout: CheckoutPolicy,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, using in-memory repositories");
        }
        let free_shipping_threshold_cents = match lookup("ATOMIC_FREE_SHIPPING_THRESHOLD_CENTS") {
            Some(raw) => Some(parse("ATOMIC_FREE_SHIPPING_THRESHOLD_CENTS", &raw)?),
            None => None,
        };

        Ok(Self {
            bind_addr: try_load(&lookup, "ATOMIC_BIND_ADDR", "0.0.0.0:8080")?,
            database_url,
            apply_schema: try_load(&lookup, "ATOMIC_APPLY_SCHEMA", "false")?,
            checkout: CheckoutPolicy {
                shipping_cents: try_load(&lookup, "ATOMIC_SHIPPING_CENTS", "0")?,
                free_shipping_threshold_cents,
                tax_bps: try_load(&lookup, "ATOMIC_TAX_BPS", "0")?,
            },
        })
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &raw)
}

fn parse<T: FromStr>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}
