//! Catalog reads: product listings, product detail, related products, collections.

mod in_memory;
mod postgres;

use async_trait::async_trait;

use atomic_catalog::{Collection, Page, ProductDetail, ProductQuery};
use atomic_core::{ProductId, VariantId};

use crate::error::RepositoryResult;

pub use in_memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;

/// Read access to the published catalog.
///
/// Every product returned carries its relations (images in display order,
/// variants, specimen with contributor, collection, impact route, drop).
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// One page of published products matching `query`, plus the filtered total.
    async fn list_products(&self, query: &ProductQuery) -> RepositoryResult<Page<ProductDetail>>;

    /// Published and featured products, newest first.
    async fn featured_products(&self) -> RepositoryResult<Vec<ProductDetail>>;

    /// A published product by slug; `NotFound` otherwise.
    async fn product_by_slug(&self, slug: &str) -> RepositoryResult<ProductDetail>;

    /// Published products sharing the collection or specimen category of
    /// `product_id`, newest first. Empty when the product is unknown.
    async fn related_products(&self, product_id: ProductId, limit: u32) -> RepositoryResult<Vec<ProductDetail>>;

    /// Published collections in display order.
    async fn collections(&self) -> RepositoryResult<Vec<Collection>>;

    /// Published products owning any of `variant_ids`.
    async fn products_by_variant(&self, variant_ids: &[VariantId]) -> RepositoryResult<Vec<ProductDetail>>;
}

/// Clamp a caller-supplied related-products limit.
pub(crate) fn related_limit(limit: u32) -> u32 {
    limit.clamp(1, atomic_catalog::Pagination::MAX_LIMIT)
}
