//! Discount code lookup and redemption bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use tracing::instrument;

use atomic_cart::DiscountCode;

use crate::error::{RepositoryError, RepositoryResult, map_sqlx_error};
use crate::pg::{get, get_parsed};

#[async_trait]
pub trait DiscountRepository: Send + Sync {
    /// Look up a code; matching is case-insensitive.
    async fn find(&self, code: &str) -> RepositoryResult<Option<DiscountCode>>;

    /// Record one redemption. Fails with `Conflict` when the code is exhausted.
    async fn record_use(&self, code: &str) -> RepositoryResult<()>;
}

/// In-memory discount codes for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDiscounts {
    inner: RwLock<HashMap<String, DiscountCode>>,
}

impl InMemoryDiscounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, mut code: DiscountCode) -> RepositoryResult<()> {
        code.code = DiscountCode::normalize(&code.code);
        let mut map = self.inner.write().map_err(|_| RepositoryError::lock_poisoned())?;
        map.insert(code.code.clone(), code);
        Ok(())
    }
}

#[async_trait]
impl DiscountRepository for InMemoryDiscounts {
    async fn find(&self, code: &str) -> RepositoryResult<Option<DiscountCode>> {
        let map = self.inner.read().map_err(|_| RepositoryError::lock_poisoned())?;
        Ok(map.get(&DiscountCode::normalize(code)).cloned())
    }

    async fn record_use(&self, code: &str) -> RepositoryResult<()> {
        let key = DiscountCode::normalize(code);
        let mut map = self.inner.write().map_err(|_| RepositoryError::lock_poisoned())?;
        let entry = map
            .get_mut(&key)
            .ok_or_else(|| RepositoryError::not_found(format!("discount code {key}")))?;
        if entry.max_uses.is_some_and(|max| entry.uses >= max) {
            return Err(RepositoryError::Conflict(format!("discount code {key} is exhausted")));
        }
        entry.uses += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PostgresDiscounts {
    pool: Arc<PgPool>,
}

impl PostgresDiscounts {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl DiscountRepository for PostgresDiscounts {
    #[instrument(skip(self), err)]
    async fn find(&self, code: &str) -> RepositoryResult<Option<DiscountCode>> {
        let row = sqlx::query(
            r#"
            SELECT code, type, value, min_purchase_cents, max_uses, uses, active, starts_at, expires_at
            FROM discount_codes
            WHERE code = $1
            "#,
        )
        .bind(DiscountCode::normalize(code))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_discount_code", e))?;
        row.as_ref().map(discount_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn record_use(&self, code: &str) -> RepositoryResult<()> {
        let key = DiscountCode::normalize(code);
        // Guarded increment: uses never passes max_uses.
        let result = sqlx::query(
            r#"
            UPDATE discount_codes
            SET uses = uses + 1
            WHERE code = $1 AND (max_uses IS NULL OR uses < max_uses)
            "#,
        )
        .bind(&key)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_discount_use", e))?;

        if result.rows_affected() == 0 {
            return match self.find(&key).await? {
                Some(_) => Err(RepositoryError::Conflict(format!("discount code {key} is exhausted"))),
                None => Err(RepositoryError::not_found(format!("discount code {key}"))),
            };
        }
        Ok(())
    }
}

fn discount_from_row(row: &PgRow) -> RepositoryResult<DiscountCode> {
    let max_uses: Option<i32> = get(row, "max_uses")?;
    let uses: i32 = get(row, "uses")?;
    Ok(DiscountCode {
        code: get(row, "code")?,
        kind: get_parsed(row, "type")?,
        value: get(row, "value")?,
        min_purchase_cents: get(row, "min_purchase_cents")?,
        max_uses: max_uses.map(|m| u32::try_from(m).unwrap_or_default()),
        uses: u32::try_from(uses).unwrap_or_default(),
        active: get(row, "active")?,
        starts_at: get(row, "starts_at")?,
        expires_at: get(row, "expires_at")?,
    })
}
