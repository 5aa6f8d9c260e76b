//! Postgres-backed catalog.
//!
//! Listings render a [`ProductQuery`] into SQL with `QueryBuilder` (bound
//! parameters only) and must agree with `ProductQuery::matches`/`compare`.
//! Relations are loaded in one batch per table with `= ANY($1)`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{Span, instrument};
use uuid::Uuid;

use atomic_catalog::{
    Collection, Contributor, FEATURED_LIMIT, OrderKey, Page, PrintProvider, Product, ProductDetail, ProductDrop,
    ProductImage, ProductQuery, Specimen, SpecimenWithContributor, Variant,
};
use atomic_core::{
    CollectionId, ContributorId, DropId, ImpactRouteId, ProductId, SpecimenId, VariantId,
};

use super::{CatalogRepository, related_limit};
use crate::error::{RepositoryError, RepositoryResult, map_sqlx_error};
use crate::pg::{
    IMPACT_ROUTE_COLUMNS, get, get_opt_u32, get_parsed, id_list, impact_route_from_row,
    like_pattern,
};

const PRODUCT_COLUMNS: &str = "p.id, p.slug, p.title, p.sku, p.description, p.field_note, \
     p.price_cents, p.currency, p.specimen_id, p.collection_id, p.impact_route_id, p.drop_id, \
     p.published, p.featured, p.tags, p.seo_title, p.seo_description, p.created_at, p.updated_at";

const LISTING_FROM: &str = " FROM products p \
     LEFT JOIN collections c ON c.id = p.collection_id \
     LEFT JOIN specimens s ON s.id = p.specimen_id \
     WHERE p.published";

const NEWEST_FIRST: &str = "p.created_at DESC, p.id DESC";

#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: Arc<PgPool>,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn fetch_products(&self, operation: &str, mut qb: QueryBuilder<'_, Postgres>) -> RepositoryResult<Vec<Product>> {
        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(product_from_row).collect()
    }

    /// Attach images, variants, specimen (with contributor), collection,
    /// impact route and drop to each product, preserving input order.
    async fn hydrate(&self, products: Vec<Product>) -> RepositoryResult<Vec<ProductDetail>> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let product_ids = id_list(products.iter().map(|p| *p.id.as_uuid()));

        let mut images: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
        let rows = sqlx::query(
            r#"
            SELECT product_id, url, alt, sort_order, width, height
            FROM product_images
            WHERE product_id = ANY($1)
            ORDER BY product_id, sort_order
            "#,
        )
        .bind(&product_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_product_images", e))?;
        for row in &rows {
            images.entry(get(row, "product_id")?).or_default().push(image_from_row(row)?);
        }

        let mut variants: HashMap<Uuid, Vec<Variant>> = HashMap::new();
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, sku, size, color, material, stock_qty,
                   print_provider_sku, print_provider_type, weight_grams
            FROM variants
            WHERE product_id = ANY($1)
            ORDER BY product_id, sku
            "#,
        )
        .bind(&product_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_variants", e))?;
        for row in &rows {
            let variant = variant_from_row(row)?;
            variants.entry(*variant.product_id.as_uuid()).or_default().push(variant);
        }

        let specimens = self
            .specimens(&id_list(products.iter().filter_map(|p| p.specimen_id.map(|id| *id.as_uuid()))))
            .await?;
        let collections = self
            .collections_by_id(&id_list(products.iter().filter_map(|p| p.collection_id.map(|id| *id.as_uuid()))))
            .await?;
        let routes = self
            .routes_by_id(&id_list(products.iter().filter_map(|p| p.impact_route_id.map(|id| *id.as_uuid()))))
            .await?;
        let drops = self
            .drops_by_id(&id_list(products.iter().filter_map(|p| p.drop_id.map(|id| *id.as_uuid()))))
            .await?;

        Ok(products
            .into_iter()
            .map(|product| {
                let key = *product.id.as_uuid();
                let specimen = product.specimen_id.and_then(|id| specimens.get(id.as_uuid()).cloned());
                let collection = product.collection_id.and_then(|id| collections.get(id.as_uuid()).cloned());
                let impact_route = product.impact_route_id.and_then(|id| routes.get(id.as_uuid()).cloned());
                let drop = product.drop_id.and_then(|id| drops.get(id.as_uuid()).cloned());
                let mut detail = ProductDetail::new(product).with_images(images.remove(&key).unwrap_or_default());
                detail.variants = variants.remove(&key).unwrap_or_default();
                detail.specimen = specimen;
                detail.collection = collection;
                detail.impact_route = impact_route;
                detail.drop = drop;
                detail
            })
            .collect())
    }

    async fn specimens(&self, ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, SpecimenWithContributor>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT id, code, title, category, technique, magnification, source_note, location,
                   capture_date, contributor_id, asset_url, thumbnail_url, taxonomy, meta
            FROM specimens
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_specimens", e))?;
        let specimens: Vec<Specimen> = rows.iter().map(specimen_from_row).collect::<RepositoryResult<_>>()?;

        let contributor_ids = id_list(specimens.iter().filter_map(|s| s.contributor_id.map(|id| *id.as_uuid())));
        let mut contributors: HashMap<Uuid, Contributor> = HashMap::new();
        if !contributor_ids.is_empty() {
            let rows = sqlx::query(
                r#"
                SELECT id, name, email, role, bio, website, socials, rev_share_bps, verified
                FROM contributors
                WHERE id = ANY($1)
                "#,
            )
            .bind(&contributor_ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_contributors", e))?;
            for row in &rows {
                let contributor = contributor_from_row(row)?;
                contributors.insert(*contributor.id.as_uuid(), contributor);
            }
        }

        Ok(specimens
            .into_iter()
            .map(|specimen| {
                let contributor = specimen
                    .contributor_id
                    .and_then(|id| contributors.get(id.as_uuid()).cloned());
                (*specimen.id.as_uuid(), SpecimenWithContributor { specimen, contributor })
            })
            .collect())
    }

    async fn collections_by_id(&self, ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, Collection>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT id, slug, title, description, blurb, hero_image, published, sort_order
            FROM collections
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_collections", e))?;
        rows.iter()
            .map(|row| collection_from_row(row).map(|c| (*c.id.as_uuid(), c)))
            .collect()
    }

    async fn routes_by_id(&self, ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, atomic_catalog::ImpactRoute>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(&format!("SELECT {IMPACT_ROUTE_COLUMNS} FROM impact_routes WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_impact_routes", e))?;
        rows.iter()
            .map(|row| impact_route_from_row(row).map(|r| (*r.id.as_uuid(), r)))
            .collect()
    }

    async fn drops_by_id(&self, ids: &[Uuid]) -> RepositoryResult<HashMap<Uuid, ProductDrop>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT id, slug, title, description, start_at, end_at, limited, edition_size, published
            FROM drops
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_drops", e))?;
        rows.iter()
            .map(|row| drop_from_row(row).map(|d| (*d.id.as_uuid(), d)))
            .collect()
    }
}

/// Append the listing predicate for `query` after `WHERE p.published`.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    let f = &query.filters;
    if let Some(slug) = &f.collection {
        qb.push(" AND c.slug = ").push_bind(slug.clone());
    }
    if let Some(category) = f.category {
        qb.push(" AND s.category = ").push_bind(category.as_str());
    }
    if let Some(min) = query.min_price_cents() {
        qb.push(" AND p.price_cents >= ").push_bind(min);
    }
    if let Some(max) = query.max_price_cents() {
        qb.push(" AND p.price_cents <= ").push_bind(max);
    }
    if !f.tags.is_empty() {
        qb.push(" AND p.tags && ").push_bind(f.tags.clone());
    }
    if let Some(needle) = query.search_needle() {
        let pattern = like_pattern(&needle);
        qb.push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR EXISTS (SELECT 1 FROM unnest(p.tags) AS t(tag) WHERE t.tag ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'))");
    }
    for (column, value) in [("size", &f.size), ("color", &f.color), ("material", &f.material)] {
        if let Some(value) = value {
            qb.push(format!(
                " AND EXISTS (SELECT 1 FROM variants v WHERE v.product_id = p.id AND v.{column} = "
            ))
            .push_bind(value.clone())
            .push(")");
        }
    }
}

fn order_clause(key: OrderKey) -> String {
    match key {
        OrderKey::CreatedAtDesc => format!(" ORDER BY {NEWEST_FIRST}"),
        OrderKey::PriceAsc => format!(" ORDER BY p.price_cents ASC, {NEWEST_FIRST}"),
        OrderKey::PriceDesc => format!(" ORDER BY p.price_cents DESC, {NEWEST_FIRST}"),
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalog {
    #[instrument(
        skip(self, query),
        fields(
            sort = ?query.sort,
            limit = query.pagination.limit,
            offset = query.pagination.offset,
            total = tracing::field::Empty
        ),
        err
    )]
    async fn list_products(&self, query: &ProductQuery) -> RepositoryResult<Page<ProductDetail>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total");
        count.push(LISTING_FROM);
        push_filters(&mut count, query);
        let row = count
            .build()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        let total: i64 = get(&row, "total")?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS}"));
        select.push(LISTING_FROM);
        push_filters(&mut select, query);
        select.push(order_clause(query.sort.order_key()));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.pagination.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.pagination.offset));
        let products = self.fetch_products("list_products", select).await?;

        Span::current().record("total", total);
        Ok(Page {
            items: self.hydrate(products).await?,
            total: u64::try_from(total).unwrap_or_default(),
            pagination: query.pagination,
        })
    }

    #[instrument(skip(self), err)]
    async fn featured_products(&self) -> RepositoryResult<Vec<ProductDetail>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        qb.push(" WHERE p.published AND p.featured")
            .push(order_clause(OrderKey::CreatedAtDesc))
            .push(" LIMIT ")
            .push_bind(i64::from(FEATURED_LIMIT));
        let products = self.fetch_products("featured_products", qb).await?;
        self.hydrate(products).await
    }

    #[instrument(skip(self), err)]
    async fn product_by_slug(&self, slug: &str) -> RepositoryResult<ProductDetail> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        qb.push(" WHERE p.published AND p.slug = ").push_bind(slug.to_string());
        let products = self.fetch_products("product_by_slug", qb).await?;
        self.hydrate(products)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::not_found(format!("product {slug}")))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn related_products(&self, product_id: ProductId, limit: u32) -> RepositoryResult<Vec<ProductDetail>> {
        let anchor = sqlx::query(
            r#"
            SELECT p.collection_id, s.category
            FROM products p
            LEFT JOIN specimens s ON s.id = p.specimen_id
            WHERE p.id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("related_anchor", e))?;

        let Some(anchor) = anchor else {
            return Ok(Vec::new());
        };
        let collection_id: Option<Uuid> = get(&anchor, "collection_id")?;
        let category: Option<String> = get(&anchor, "category")?;
        if collection_id.is_none() && category.is_none() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS}"));
        qb.push(LISTING_FROM)
            .push(" AND p.id <> ")
            .push_bind(*product_id.as_uuid())
            .push(" AND (p.collection_id = ")
            .push_bind(collection_id)
            .push(" OR s.category = ")
            .push_bind(category)
            .push(")")
            .push(order_clause(OrderKey::CreatedAtDesc))
            .push(" LIMIT ")
            .push_bind(i64::from(related_limit(limit)));
        let products = self.fetch_products("related_products", qb).await?;
        self.hydrate(products).await
    }

    #[instrument(skip(self), err)]
    async fn collections(&self) -> RepositoryResult<Vec<Collection>> {
        let rows = sqlx::query(
            r#"
            SELECT id, slug, title, description, blurb, hero_image, published, sort_order
            FROM collections
            WHERE published
            ORDER BY sort_order ASC, title ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("collections", e))?;
        rows.iter().map(collection_from_row).collect()
    }

    #[instrument(skip(self, variant_ids), fields(variant_count = variant_ids.len()), err)]
    async fn products_by_variant(&self, variant_ids: &[VariantId]) -> RepositoryResult<Vec<ProductDetail>> {
        if variant_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = id_list(variant_ids.iter().map(|id| *id.as_uuid()));
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products p"));
        qb.push(" WHERE p.published AND p.id IN (SELECT product_id FROM variants WHERE id = ANY(")
            .push_bind(ids)
            .push("))");
        let products = self.fetch_products("products_by_variant", qb).await?;
        self.hydrate(products).await
    }
}

fn product_from_row(row: &PgRow) -> RepositoryResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(get(row, "id")?),
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        sku: get(row, "sku")?,
        description: get(row, "description")?,
        field_note: get(row, "field_note")?,
        price_cents: get(row, "price_cents")?,
        currency: get(row, "currency")?,
        specimen_id: get::<Option<Uuid>>(row, "specimen_id")?.map(SpecimenId::from_uuid),
        collection_id: get::<Option<Uuid>>(row, "collection_id")?.map(CollectionId::from_uuid),
        impact_route_id: get::<Option<Uuid>>(row, "impact_route_id")?.map(ImpactRouteId::from_uuid),
        drop_id: get::<Option<Uuid>>(row, "drop_id")?.map(DropId::from_uuid),
        published: get(row, "published")?,
        featured: get(row, "featured")?,
        tags: get(row, "tags")?,
        seo_title: get(row, "seo_title")?,
        seo_description: get(row, "seo_description")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn image_from_row(row: &PgRow) -> RepositoryResult<ProductImage> {
    Ok(ProductImage {
        url: get(row, "url")?,
        alt: get(row, "alt")?,
        sort_order: get(row, "sort_order")?,
        width: get(row, "width")?,
        height: get(row, "height")?,
    })
}

fn variant_from_row(row: &PgRow) -> RepositoryResult<Variant> {
    let provider: Option<String> = get(row, "print_provider_type")?;
    Ok(Variant {
        id: VariantId::from_uuid(get(row, "id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        sku: get(row, "sku")?,
        size: get(row, "size")?,
        color: get(row, "color")?,
        material: get(row, "material")?,
        stock_qty: get(row, "stock_qty")?,
        print_provider_sku: get(row, "print_provider_sku")?,
        print_provider_type: provider
            .map(|p| p.parse::<PrintProvider>())
            .transpose()
            .map_err(|e: atomic_core::DomainError| RepositoryError::Serialization(e.to_string()))?,
        weight_grams: get(row, "weight_grams")?,
    })
}

fn specimen_from_row(row: &PgRow) -> RepositoryResult<Specimen> {
    let taxonomy: serde_json::Value = get(row, "taxonomy")?;
    let meta: serde_json::Value = get(row, "meta")?;
    Ok(Specimen {
        id: SpecimenId::from_uuid(get(row, "id")?),
        code: get(row, "code")?,
        title: get(row, "title")?,
        category: get_parsed(row, "category")?,
        technique: get(row, "technique")?,
        magnification: get(row, "magnification")?,
        source_note: get(row, "source_note")?,
        location: get(row, "location")?,
        capture_date: get(row, "capture_date")?,
        contributor_id: get::<Option<Uuid>>(row, "contributor_id")?.map(ContributorId::from_uuid),
        asset_url: get(row, "asset_url")?,
        thumbnail_url: get(row, "thumbnail_url")?,
        taxonomy: serde_json::from_value(taxonomy)?,
        meta: serde_json::from_value(meta)?,
    })
}

fn contributor_from_row(row: &PgRow) -> RepositoryResult<Contributor> {
    let socials: serde_json::Value = get(row, "socials")?;
    Ok(Contributor {
        id: ContributorId::from_uuid(get(row, "id")?),
        name: get(row, "name")?,
        email: get(row, "email")?,
        role: get(row, "role")?,
        bio: get(row, "bio")?,
        website: get(row, "website")?,
        socials: serde_json::from_value(socials)?,
        rev_share_bps: get_opt_u32(row, "rev_share_bps")?,
        verified: get(row, "verified")?,
    })
}

fn collection_from_row(row: &PgRow) -> RepositoryResult<Collection> {
    Ok(Collection {
        id: CollectionId::from_uuid(get(row, "id")?),
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        blurb: get(row, "blurb")?,
        hero_image: get(row, "hero_image")?,
        published: get(row, "published")?,
        sort_order: get(row, "sort_order")?,
    })
}

fn drop_from_row(row: &PgRow) -> RepositoryResult<ProductDrop> {
    Ok(ProductDrop {
        id: DropId::from_uuid(get(row, "id")?),
        slug: get(row, "slug")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        start_at: get(row, "start_at")?,
        end_at: get(row, "end_at")?,
        limited: get(row, "limited")?,
        edition_size: get_opt_u32(row, "edition_size")?,
        published: get(row, "published")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use atomic_catalog::{Pagination, ProductFilters, SortBy, SpecimenCategory};

    fn rendered(query: &ProductQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        qb.push(LISTING_FROM);
        push_filters(&mut qb, query);
        qb.push(order_clause(query.sort.order_key()));
        qb.sql().to_string()
    }

    #[test]
    fn unfiltered_listing_is_published_newest_first() {
        let sql = rendered(&ProductQuery::default());
        assert!(sql.ends_with("WHERE p.published ORDER BY p.created_at DESC, p.id DESC"));
    }

    #[test]
    fn every_filter_is_bound_not_interpolated() {
        let query = ProductQuery::new(
            ProductFilters {
                collection: Some("crystal-lattice".into()),
                category: Some(SpecimenCategory::Geology),
                min_price: Some(40.0),
                max_price: Some(50.0),
                tags: vec!["quartz".into()],
                search: Some("Salt'; DROP TABLE products; --".into()),
                size: Some("M".into()),
                color: None,
                material: Some("Organic Cotton".into()),
            },
            SortBy::PriceDesc,
            Pagination::default(),
        );
        let sql = rendered(&query);

        assert!(sql.contains("c.slug = $1"));
        assert!(sql.contains("s.category = $2"));
        assert!(sql.contains("p.price_cents >= $3"));
        assert!(sql.contains("p.price_cents <= $4"));
        assert!(sql.contains("p.tags && $5"));
        assert!(sql.contains("p.title ILIKE $6"));
        assert!(sql.contains("v.size = $9"));
        assert!(sql.contains("v.material = $10"));
        assert!(!sql.contains("v.color"));
        assert!(!sql.contains("DROP TABLE"));
        assert!(sql.ends_with("ORDER BY p.price_cents DESC, p.created_at DESC, p.id DESC"));
    }
}
