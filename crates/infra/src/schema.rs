//! Postgres schema bootstrap.

use sqlx::PgPool;
use tracing::info;

use crate::error::{RepositoryResult, map_sqlx_error};

/// Full storefront schema (`CREATE ... IF NOT EXISTS`, so re-applying is a no-op).
pub const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

pub async fn apply(pool: &PgPool) -> RepositoryResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    info!("storefront schema applied");
    Ok(())
}
