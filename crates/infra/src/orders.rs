//! Order persistence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use tracing::instrument;

use atomic_core::{Entity, OrderId};
use atomic_orders::{Order, OrderItem, OrderStatus};

use crate::error::{RepositoryError, RepositoryResult, map_sqlx_error};
use crate::pg::{get, get_parsed};

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> RepositoryResult<()>;

    async fn get(&self, id: OrderId) -> RepositoryResult<Order>;

    /// Persist `order.status` and `order.updated_at` if the stored status is
    /// still `from`. A stale `from` fails with `Conflict`.
    async fn update_status(&self, order: &Order, from: OrderStatus) -> RepositoryResult<()>;

    /// Remove an order that was never confirmed to the customer.
    async fn delete(&self, id: OrderId) -> RepositoryResult<()>;

    /// Orders that count as completed sales (`paid`, `fulfilled`).
    async fn sold_orders(&self) -> RepositoryResult<Vec<Order>>;
}

/// In-memory orders for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrders {
    inner: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn insert(&self, order: &Order) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::lock_poisoned())?;
        if map.contains_key(&order.id()) {
            return Err(RepositoryError::Conflict(format!("order {} already exists", order.id)));
        }
        map.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get(&self, id: OrderId) -> RepositoryResult<Order> {
        let map = self.inner.read().map_err(|_| RepositoryError::lock_poisoned())?;
        map.get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("order {id}")))
    }

    async fn update_status(&self, order: &Order, from: OrderStatus) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::lock_poisoned())?;
        let stored = map
            .get_mut(&order.id())
            .ok_or_else(|| RepositoryError::not_found(format!("order {}", order.id)))?;
        if stored.status != from {
            return Err(stale_status(order.id, from, stored.status));
        }
        stored.status = order.status;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| RepositoryError::lock_poisoned())?;
        map.remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(format!("order {id}")))
    }

    async fn sold_orders(&self) -> RepositoryResult<Vec<Order>> {
        let map = self.inner.read().map_err(|_| RepositoryError::lock_poisoned())?;
        let mut sold: Vec<Order> = map.values().filter(|o| o.status.is_sold()).cloned().collect();
        sold.sort_by_key(|o| (o.created_at, o.id));
        Ok(sold)
    }
}

#[derive(Debug, Clone)]
pub struct PostgresOrders {
    pool: Arc<PgPool>,
}

impl PostgresOrders {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

const ORDER_COLUMNS: &str = "id, email, status, items, subtotal_cents, shipping_cents, tax_cents, \
     discount_cents, total_cents, discount_code, created_at, updated_at";

#[async_trait]
impl OrderRepository for PostgresOrders {
    #[instrument(skip(self, order), fields(order_id = %order.id), err)]
    async fn insert(&self, order: &Order) -> RepositoryResult<()> {
        let items = serde_json::to_value(&order.items)?;
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, email, status, items, subtotal_cents, shipping_cents, tax_cents,
                discount_cents, total_cents, discount_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.email)
        .bind(order.status.as_str())
        .bind(items)
        .bind(order.subtotal_cents)
        .bind(order.shipping_cents)
        .bind(order.tax_cents)
        .bind(order.discount_cents)
        .bind(order.total_cents)
        .bind(&order.discount_code)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get(&self, id: OrderId) -> RepositoryResult<Order> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        match row {
            Some(row) => order_from_row(&row),
            None => Err(RepositoryError::not_found(format!("order {id}"))),
        }
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, status = %order.status, from = %from), err)]
    async fn update_status(&self, order: &Order, from: OrderStatus) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .bind(from.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?;
        if result.rows_affected() == 0 {
            let current = self.get(order.id).await?;
            return Err(stale_status(order.id, from, current.status));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete(&self, id: OrderId) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(format!("order {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn sold_orders(&self) -> RepositoryResult<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ANY($1) ORDER BY created_at, id"
        ))
        .bind(OrderStatus::SOLD.map(OrderStatus::as_str).to_vec())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("sold_orders", e))?;
        rows.iter().map(order_from_row).collect()
    }
}

fn stale_status(id: OrderId, expected: OrderStatus, actual: OrderStatus) -> RepositoryError {
    RepositoryError::Conflict(format!("order {id} is {actual}, expected {expected}"))
}

fn order_from_row(row: &PgRow) -> RepositoryResult<Order> {
    let items: serde_json::Value = get(row, "items")?;
    let items: Vec<OrderItem> = serde_json::from_value(items)?;
    Ok(Order {
        id: OrderId::from_uuid(get(row, "id")?),
        email: get(row, "email")?,
        status: get_parsed(row, "status")?,
        items,
        subtotal_cents: get(row, "subtotal_cents")?,
        shipping_cents: get(row, "shipping_cents")?,
        tax_cents: get(row, "tax_cents")?,
        discount_cents: get(row, "discount_cents")?,
        total_cents: get(row, "total_cents")?,
        discount_code: get(row, "discount_code")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}
