//! Infrastructure layer: repositories, cart persistence and storefront services.
//!
//! Every repository trait has an in-memory implementation (tests/dev) and a
//! Postgres implementation backed by a shared `sqlx` pool.

pub mod cart_store;
pub mod catalog;
pub mod discounts;
pub mod error;
pub mod impact;
pub mod orders;
mod pg;
pub mod schema;
pub mod storefront;

#[cfg(test)]
mod test_support;

pub use cart_store::{CartStore, InMemoryCartStore, PersistentCart, SqliteCartStore};
pub use catalog::{CatalogRepository, InMemoryCatalog, PostgresCatalog};
pub use discounts::{DiscountRepository, InMemoryDiscounts, PostgresDiscounts};
pub use error::{RepositoryError, RepositoryResult};
pub use impact::{ImpactRepository, InMemoryImpactLedger, PostgresImpactLedger};
pub use orders::{InMemoryOrders, OrderRepository, PostgresOrders};
pub use storefront::{ServiceError, ServiceResult, Storefront};
