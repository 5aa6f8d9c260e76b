use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use atomic_catalog::{
    Collection, FEATURED_LIMIT, Page, ProductDetail, ProductQuery, is_related, newest_first,
};
use atomic_core::{CollectionId, Entity, ProductId, VariantId};

use super::{CatalogRepository, related_limit};
use crate::error::{RepositoryError, RepositoryResult};

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, ProductDetail>>,
    collections: RwLock<HashMap<CollectionId, Collection>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product. Slug and SKU stay unique across products.
    pub fn upsert_product(&self, detail: ProductDetail) -> RepositoryResult<()> {
        let mut map = self.products.write().map_err(|_| RepositoryError::lock_poisoned())?;
        let id = detail.product.id();
        let clash = map.values().find(|d| {
            d.product.id != id && (d.product.slug == detail.product.slug || d.product.sku == detail.product.sku)
        });
        if let Some(other) = clash {
            return Err(RepositoryError::Conflict(format!(
                "product slug/sku already used by {}",
                other.product.id
            )));
        }
        map.insert(id, detail);
        Ok(())
    }

    pub fn upsert_collection(&self, collection: Collection) -> RepositoryResult<()> {
        let mut map = self.collections.write().map_err(|_| RepositoryError::lock_poisoned())?;
        if map.values().any(|c| c.id != collection.id && c.slug == collection.slug) {
            return Err(RepositoryError::Conflict(format!("collection slug {} already used", collection.slug)));
        }
        map.insert(collection.id(), collection);
        Ok(())
    }

    fn snapshot(&self) -> RepositoryResult<Vec<ProductDetail>> {
        let map = self.products.read().map_err(|_| RepositoryError::lock_poisoned())?;
        Ok(map.values().cloned().collect())
    }
}

fn newest(mut details: Vec<ProductDetail>, limit: u32) -> Vec<ProductDetail> {
    details.sort_by(|a, b| newest_first(&a.product, &b.product));
    details.truncate(limit as usize);
    details
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    async fn list_products(&self, query: &ProductQuery) -> RepositoryResult<Page<ProductDetail>> {
        Ok(query.apply(self.snapshot()?))
    }

    async fn featured_products(&self) -> RepositoryResult<Vec<ProductDetail>> {
        let featured = self
            .snapshot()?
            .into_iter()
            .filter(|d| d.product.published && d.product.featured)
            .collect();
        Ok(newest(featured, FEATURED_LIMIT))
    }

    async fn product_by_slug(&self, slug: &str) -> RepositoryResult<ProductDetail> {
        self.snapshot()?
            .into_iter()
            .find(|d| d.product.published && d.product.slug == slug)
            .ok_or_else(|| RepositoryError::not_found(format!("product {slug}")))
    }

    async fn related_products(&self, product_id: ProductId, limit: u32) -> RepositoryResult<Vec<ProductDetail>> {
        let all = self.snapshot()?;
        let Some(anchor) = all.iter().find(|d| d.product.id == product_id).cloned() else {
            return Ok(Vec::new());
        };
        let related = all.into_iter().filter(|d| is_related(&anchor, d)).collect();
        Ok(newest(related, related_limit(limit)))
    }

    async fn collections(&self) -> RepositoryResult<Vec<Collection>> {
        let map = self.collections.read().map_err(|_| RepositoryError::lock_poisoned())?;
        let mut published: Vec<Collection> = map.values().filter(|c| c.published).cloned().collect();
        published.sort_by(Collection::display_order);
        Ok(published)
    }

    async fn products_by_variant(&self, variant_ids: &[VariantId]) -> RepositoryResult<Vec<ProductDetail>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|d| d.product.published && d.variants.iter().any(|v| variant_ids.contains(&v.id)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{collection, detail, in_collection};
    use atomic_catalog::{Pagination, ProductFilters, SortBy};

    fn seeded() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        let crystals = collection("crystal-lattice", "Crystal Lattice", 1);
        catalog.upsert_collection(crystals.clone()).unwrap();
        catalog.upsert_collection(collection("diatom-archive", "Diatom Archive", 0)).unwrap();

        let mut salt = in_collection(detail("Salt Crystal T-Shirt", 4500, 3), &crystals);
        salt.product.featured = true;
        catalog.upsert_product(salt).unwrap();
        catalog.upsert_product(in_collection(detail("Quartz Crystal T-Shirt", 4800, 2), &crystals)).unwrap();
        catalog.upsert_product(detail("Diatom Grid Hoodie", 6800, 1)).unwrap();

        let mut draft = detail("Unreleased Draft Tee", 4200, 0);
        draft.product.published = false;
        draft.product.featured = true;
        catalog.upsert_product(draft).unwrap();
        catalog
    }

    #[tokio::test]
    async fn list_filters_and_counts() {
        let catalog = seeded();
        let query = ProductQuery::new(
            ProductFilters { min_price: Some(40.0), max_price: Some(50.0), ..Default::default() },
            SortBy::PriceAsc,
            Pagination::from_page(Some(1), Some(1)),
        );

        let page = catalog.list_products(&query).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages(), 2);
        assert_eq!(page.items[0].product.title, "Salt Crystal T-Shirt");
    }

    #[tokio::test]
    async fn featured_skips_drafts() {
        let featured = seeded().featured_products().await.unwrap();
        let titles: Vec<_> = featured.iter().map(|d| d.product.title.as_str()).collect();
        assert_eq!(titles, vec!["Salt Crystal T-Shirt"]);
    }

    #[tokio::test]
    async fn slug_lookup_hides_drafts() {
        let catalog = seeded();
        assert!(catalog.product_by_slug("salt-crystal-t-shirt").await.is_ok());
        assert!(matches!(
            catalog.product_by_slug("unreleased-draft-tee").await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn related_shares_collection_and_excludes_self() {
        let catalog = seeded();
        let salt = catalog.product_by_slug("salt-crystal-t-shirt").await.unwrap();

        let related = catalog.related_products(salt.product.id, 4).await.unwrap();
        let titles: Vec<_> = related.iter().map(|d| d.product.title.as_str()).collect();
        assert_eq!(titles, vec!["Quartz Crystal T-Shirt"]);

        assert!(catalog.related_products(ProductId::new(), 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_in_display_order() {
        let collections = seeded().collections().await.unwrap();
        let slugs: Vec<_> = collections.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["diatom-archive", "crystal-lattice"]);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let catalog = seeded();
        let err = catalog.upsert_product(detail("Salt Crystal T-Shirt", 4500, 9)).unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn variant_lookup_returns_owning_product() {
        let catalog = seeded();
        let salt = catalog.product_by_slug("salt-crystal-t-shirt").await.unwrap();
        let variant = salt.variants[0].id;

        let found = catalog.products_by_variant(&[variant, VariantId::new()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product.id, salt.product.id);
    }
}
