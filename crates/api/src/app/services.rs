use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use atomic_cart::CheckoutPolicy;
use atomic_infra::{
    InMemoryCatalog, InMemoryDiscounts, InMemoryImpactLedger, InMemoryOrders, PostgresCatalog,
    PostgresDiscounts, PostgresImpactLedger, PostgresOrders, Storefront, schema,
};

use crate::config::ApiConfig;

/// Shared request-handling services.
#[derive(Clone)]
pub struct AppServices {
    pub storefront: Storefront,
}

/// In-memory repositories, kept as concrete handles so callers can load records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pub catalog: Arc<InMemoryCatalog>,
    pub impact: Arc<InMemoryImpactLedger>,
    pub orders: Arc<InMemoryOrders>,
    pub discounts: Arc<InMemoryDiscounts>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self, policy: CheckoutPolicy) -> AppServices {
        AppServices {
            storefront: Storefront::new(
                self.catalog.clone(),
                self.impact.clone(),
                self.orders.clone(),
                self.discounts.clone(),
                policy,
            ),
        }
    }
}

/// Wire Postgres repositories when `DATABASE_URL` is configured, in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let Some(url) = &config.database_url else {
        return Ok(InMemoryBackend::new().services(config.checkout));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    info!("connected to Postgres");

    if config.apply_schema {
        schema::apply(&pool).await.context("failed to apply schema")?;
    }

    Ok(AppServices {
        storefront: Storefront::new(
            Arc::new(PostgresCatalog::new(pool.clone())),
            Arc::new(PostgresImpactLedger::new(pool.clone())),
            Arc::new(PostgresOrders::new(pool.clone())),
            Arc::new(PostgresDiscounts::new(pool)),
            config.checkout,
        ),
    })
}
