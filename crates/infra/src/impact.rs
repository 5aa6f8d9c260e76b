//! Impact routes and the impact ledger.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use tracing::instrument;

use atomic_catalog::ImpactRoute;
use atomic_core::{ImpactRouteId, LedgerEntryId, OrderId};
use atomic_orders::{ImpactLedgerEntry, LedgerStatus};

use crate::error::{RepositoryError, RepositoryResult, map_sqlx_error};
use crate::pg::{IMPACT_ROUTE_COLUMNS, get, get_parsed, impact_route_from_row};

#[async_trait]
pub trait ImpactRepository: Send + Sync {
    /// Every route, active or not.
    async fn routes(&self) -> RepositoryResult<Vec<ImpactRoute>>;

    /// Active routes ordered by name.
    async fn active_routes(&self) -> RepositoryResult<Vec<ImpactRoute>>;

    /// `allocated` and `paid` entries in insertion order.
    async fn reported_entries(&self) -> RepositoryResult<Vec<ImpactLedgerEntry>>;

    /// Append entries atomically.
    async fn append(&self, entries: &[ImpactLedgerEntry]) -> RepositoryResult<()>;
}

/// In-memory routes and ledger for tests/dev. Entries keep insertion order.
#[derive(Debug, Default)]
pub struct InMemoryImpactLedger {
    routes: RwLock<Vec<ImpactRoute>>,
    entries: RwLock<Vec<ImpactLedgerEntry>>,
}

impl InMemoryImpactLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_route(&self, route: ImpactRoute) -> RepositoryResult<()> {
        let mut routes = self.routes.write().map_err(|_| RepositoryError::lock_poisoned())?;
        if routes.iter().any(|r| r.id != route.id && r.slug == route.slug) {
            return Err(RepositoryError::Conflict(format!("impact route slug {} already used", route.slug)));
        }
        match routes.iter_mut().find(|r| r.id == route.id) {
            Some(existing) => *existing = route,
            None => routes.push(route),
        }
        Ok(())
    }
}

#[async_trait]
impl ImpactRepository for InMemoryImpactLedger {
    async fn routes(&self) -> RepositoryResult<Vec<ImpactRoute>> {
        let routes = self.routes.read().map_err(|_| RepositoryError::lock_poisoned())?;
        Ok(routes.clone())
    }

    async fn active_routes(&self) -> RepositoryResult<Vec<ImpactRoute>> {
        let mut active: Vec<ImpactRoute> = self.routes().await?.into_iter().filter(|r| r.active).collect();
        active.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(active)
    }

    async fn reported_entries(&self) -> RepositoryResult<Vec<ImpactLedgerEntry>> {
        let entries = self.entries.read().map_err(|_| RepositoryError::lock_poisoned())?;
        Ok(entries.iter().filter(|e| e.status.is_reported()).cloned().collect())
    }

    async fn append(&self, new_entries: &[ImpactLedgerEntry]) -> RepositoryResult<()> {
        let routes = self.routes.read().map_err(|_| RepositoryError::lock_poisoned())?;
        if let Some(orphan) = new_entries.iter().find(|e| !routes.iter().any(|r| r.id == e.impact_route_id)) {
            return Err(RepositoryError::Conflict(format!(
                "unknown impact route {}",
                orphan.impact_route_id
            )));
        }
        let mut entries = self.entries.write().map_err(|_| RepositoryError::lock_poisoned())?;
        entries.extend_from_slice(new_entries);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PostgresImpactLedger {
    pool: Arc<PgPool>,
}

impl PostgresImpactLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ImpactRepository for PostgresImpactLedger {
    #[instrument(skip(self), err)]
    async fn routes(&self) -> RepositoryResult<Vec<ImpactRoute>> {
        let rows = sqlx::query(&format!("SELECT {IMPACT_ROUTE_COLUMNS} FROM impact_routes ORDER BY name"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("impact_routes", e))?;
        rows.iter().map(impact_route_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn active_routes(&self) -> RepositoryResult<Vec<ImpactRoute>> {
        let rows = sqlx::query(&format!(
            "SELECT {IMPACT_ROUTE_COLUMNS} FROM impact_routes WHERE active ORDER BY name"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("active_impact_routes", e))?;
        rows.iter().map(impact_route_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn reported_entries(&self) -> RepositoryResult<Vec<ImpactLedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, impact_route_id, impact_route_name, amount_cents, status, created_at
            FROM impact_ledger
            WHERE status = ANY($1)
            ORDER BY seq
            "#,
        )
        .bind(LedgerStatus::REPORTED.map(LedgerStatus::as_str).to_vec())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reported_ledger_entries", e))?;
        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self, entries), fields(entry_count = entries.len()), err)]
    async fn append(&self, entries: &[ImpactLedgerEntry]) -> RepositoryResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("append_ledger_begin", e))?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO impact_ledger (
                    id, order_id, impact_route_id, impact_route_name, amount_cents, status, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(entry.order_id.map(|id| *id.as_uuid()))
            .bind(entry.impact_route_id.as_uuid())
            .bind(&entry.impact_route_name)
            .bind(entry.amount_cents)
            .bind(entry.status.as_str())
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("append_ledger_entry", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("append_ledger_commit", e))
    }
}

fn entry_from_row(row: &PgRow) -> RepositoryResult<ImpactLedgerEntry> {
    Ok(ImpactLedgerEntry {
        id: LedgerEntryId::from_uuid(get(row, "id")?),
        order_id: get::<Option<uuid::Uuid>>(row, "order_id")?.map(OrderId::from_uuid),
        impact_route_id: ImpactRouteId::from_uuid(get(row, "impact_route_id")?),
        impact_route_name: get(row, "impact_route_name")?,
        amount_cents: get(row, "amount_cents")?,
        status: get_parsed(row, "status")?,
        created_at: get(row, "created_at")?,
    })
}
