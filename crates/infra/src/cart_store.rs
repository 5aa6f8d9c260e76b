//! Cart persistence across sessions.
//!
//! The cart is stored as a JSON list of line items under a single key
//! (`atomic-cart` by default). [`PersistentCart`] writes the whole list back
//! after every mutation.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{instrument, warn};

use atomic_cart::{CART_STORAGE_KEY, Cart, CartItem};
use atomic_core::VariantId;

use crate::error::{RepositoryError, RepositoryResult, map_sqlx_error};

/// Key-value store holding serialized carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, key: &str) -> RepositoryResult<Option<Vec<CartItem>>>;
    async fn save(&self, key: &str, items: &[CartItem]) -> RepositoryResult<()>;
}

#[async_trait]
impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    async fn load(&self, key: &str) -> RepositoryResult<Option<Vec<CartItem>>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, items: &[CartItem]) -> RepositoryResult<()> {
        (**self).save(key, items).await
    }
}

/// In-memory cart store for tests/dev. Holds the serialized form so the
/// round trip matches the SQLite store.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    inner: RwLock<HashMap<String, String>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, key: &str) -> RepositoryResult<Option<Vec<CartItem>>> {
        let map = self.inner.read().map_err(|_| RepositoryError::lock_poisoned())?;
        map.get(key)
            .map(|raw| serde_json::from_str(raw).map_err(RepositoryError::from))
            .transpose()
    }

    async fn save(&self, key: &str, items: &[CartItem]) -> RepositoryResult<()> {
        let raw = serde_json::to_string(items)?;
        let mut map = self.inner.write().map_err(|_| RepositoryError::lock_poisoned())?;
        map.insert(key.to_string(), raw);
        Ok(())
    }
}

/// SQLite-backed cart store: one `cart_state` row per key.
#[derive(Debug, Clone)]
pub struct SqliteCartStore {
    pool: SqlitePool,
}

impl SqliteCartStore {
    /// Open (creating if missing) the database at `url` and ensure the table exists.
    pub async fn connect(url: &str) -> RepositoryResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("cart_store_options", e))?
            .create_if_missing(true);
        // A single connection keeps `sqlite::memory:` databases shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("cart_store_connect", e))?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> RepositoryResult<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cart_state (
                key        TEXT PRIMARY KEY,
                items      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| map_sqlx_error("create_cart_state", e))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CartStore for SqliteCartStore {
    #[instrument(skip(self), err)]
    async fn load(&self, key: &str) -> RepositoryResult<Option<Vec<CartItem>>> {
        let row = sqlx::query("SELECT items FROM cart_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_cart", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("items").map_err(|e| map_sqlx_error("load_cart", e))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    #[instrument(skip(self, items), fields(item_count = items.len()), err)]
    async fn save(&self, key: &str, items: &[CartItem]) -> RepositoryResult<()> {
        let raw = serde_json::to_string(items)?;
        sqlx::query(
            r#"
            INSERT INTO cart_state (key, items, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET
                items = excluded.items,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_cart", e))?;
        Ok(())
    }
}

/// A [`Cart`] that is restored from, and saved back to, a [`CartStore`].
#[derive(Debug)]
pub struct PersistentCart<S> {
    cart: Cart,
    store: S,
    key: String,
}

impl<S: CartStore> PersistentCart<S> {
    /// Restore the cart saved under the default storage key.
    pub async fn open(store: S) -> RepositoryResult<Self> {
        Self::open_with_key(store, CART_STORAGE_KEY).await
    }

    /// Restore the cart saved under `key`. Unreadable saved state is
    /// discarded and the cart starts empty.
    pub async fn open_with_key(store: S, key: &str) -> RepositoryResult<Self> {
        let items = match store.load(key).await {
            Ok(items) => items.unwrap_or_default(),
            Err(RepositoryError::Serialization(reason)) => {
                warn!(key, %reason, "discarding unreadable saved cart");
                Vec::new()
            }
            Err(other) => return Err(other),
        };
        Ok(Self {
            cart: Cart::from_items(items),
            store,
            key: key.to_string(),
        })
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub async fn add_item(&mut self, item: CartItem) -> RepositoryResult<()> {
        self.commit(|cart| cart.add_item(item)).await
    }

    pub async fn remove_item(&mut self, variant_id: VariantId) -> RepositoryResult<()> {
        self.commit(|cart| cart.remove_item(variant_id)).await
    }

    pub async fn update_quantity(&mut self, variant_id: VariantId, quantity: i64) -> RepositoryResult<()> {
        self.commit(|cart| cart.update_quantity(variant_id, quantity)).await
    }

    pub async fn clear(&mut self) -> RepositoryResult<()> {
        self.commit(Cart::clear).await
    }

    /// Apply `change` to a copy, save it, and only then replace the held cart.
    /// A failed save leaves both the held cart and the stored cart unchanged.
    async fn commit(&mut self, change: impl FnOnce(&mut Cart)) -> RepositoryResult<()> {
        let mut next = self.cart.clone();
        change(&mut next);
        self.store.save(&self.key, next.items()).await?;
        self.cart = next;
        Ok(())
    }
}
