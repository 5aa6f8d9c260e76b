//! Product query composer.
//!
//! A [`ProductQuery`] is a pure description of a catalog listing: which
//! products qualify (all provided filters must hold), in which order, and which
//! page of the result. Repositories either evaluate it in memory
//! ([`ProductQuery::apply`]) or render it to SQL; both must agree with
//! [`ProductQuery::matches`] and [`ProductQuery::compare`].

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

use atomic_core::DomainError;

use crate::product::{Product, ProductDetail, Variant};
use crate::specimen::SpecimenCategory;

/// Number of products on the featured shelf.
pub const FEATURED_LIMIT: u32 = 8;

/// Default number of related products.
pub const RELATED_DEFAULT_LIMIT: u32 = 4;

/// Requested listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    /// No popularity signal is tracked; ordered as [`SortBy::Newest`].
    Popular,
}

/// Ordering actually applied for a [`SortBy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    CreatedAtDesc,
    PriceAsc,
    PriceDesc,
}

impl SortBy {
    pub fn order_key(self) -> OrderKey {
        match self {
            SortBy::Newest | SortBy::Popular => OrderKey::CreatedAtDesc,
            SortBy::PriceAsc => OrderKey::PriceAsc,
            SortBy::PriceDesc => OrderKey::PriceDesc,
        }
    }
}

impl core::str::FromStr for SortBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortBy::Newest),
            "price-asc" => Ok(SortBy::PriceAsc),
            "price-desc" => Ok(SortBy::PriceDesc),
            "popular" => Ok(SortBy::Popular),
            other => Err(DomainError::validation(format!(
                "sortBy must be one of: newest, price-asc, price-desc, popular (got {other})"
            ))),
        }
    }
}

/// Pagination parameters for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of products to return (1..=100).
    pub limit: u32,
    /// Number of products to skip.
    pub offset: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }

    /// 1-based page number; page 0 is treated as page 1.
    pub fn from_page(page: Option<u32>, limit: Option<u32>) -> Self {
        let base = Self::new(limit, None);
        let page = page.unwrap_or(1).max(1);
        Self {
            offset: (page - 1).saturating_mul(base.limit),
            ..base
        }
    }

    /// 1-based page containing `offset`.
    pub fn page(&self) -> u32 {
        self.offset / self.limit + 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Optional listing filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilters {
    /// Collection slug.
    pub collection: Option<String>,
    /// Category of the product's specimen.
    pub category: Option<SpecimenCategory>,
    /// Lower price bound in whole currency units (inclusive).
    pub min_price: Option<f64>,
    /// Upper price bound in whole currency units (inclusive).
    pub max_price: Option<f64>,
    /// Product must carry at least one of these tags; empty means no filter.
    pub tags: Vec<String>,
    /// Case-insensitive substring over title, description and tags.
    pub search: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
}

/// Whole currency units to cents.
pub fn to_cents(units: f64) -> i64 {
    (units * 100.0).round() as i64
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub filters: ProductFilters,
    pub sort: SortBy,
    pub pagination: Pagination,
}

impl ProductQuery {
    pub fn new(filters: ProductFilters, sort: SortBy, pagination: Pagination) -> Self {
        Self { filters, sort, pagination }
    }

    pub fn min_price_cents(&self) -> Option<i64> {
        self.filters.min_price.map(to_cents)
    }

    pub fn max_price_cents(&self) -> Option<i64> {
        self.filters.max_price.map(to_cents)
    }

    /// Normalized search needle (trimmed, lower-cased); blank means no search.
    pub fn search_needle(&self) -> Option<String> {
        self.filters
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Conjunction of every provided filter, restricted to published products.
    pub fn matches(&self, detail: &ProductDetail) -> bool {
        let p = &detail.product;
        let f = &self.filters;

        if !p.published {
            return false;
        }
        if let Some(slug) = &f.collection {
            if detail.collection.as_ref().map(|c| &c.slug) != Some(slug) {
                return false;
            }
        }
        if let Some(category) = f.category {
            if detail.specimen.as_ref().map(|s| s.specimen.category) != Some(category) {
                return false;
            }
        }
        if self.min_price_cents().is_some_and(|min| p.price_cents < min) {
            return false;
        }
        if self.max_price_cents().is_some_and(|max| p.price_cents > max) {
            return false;
        }
        if !f.tags.is_empty() && !p.has_any_tag(&f.tags) {
            return false;
        }
        if let Some(needle) = self.search_needle() {
            let hit = p.title.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
                || p.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        any_variant(detail, f.size.as_deref(), |v| v.size.as_str())
            && any_variant(detail, f.color.as_deref(), |v| v.color.as_str())
            && any_variant(detail, f.material.as_deref(), |v| v.material.as_str())
    }

    /// Listing order with the `created_at` desc, id tie-break.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.sort.order_key() {
            OrderKey::CreatedAtDesc => Ordering::Equal,
            OrderKey::PriceAsc => a.price_cents.cmp(&b.price_cents),
            OrderKey::PriceDesc => b.price_cents.cmp(&a.price_cents),
        };
        primary.then_with(|| newest_first(a, b))
    }

    /// Evaluate against already-loaded records.
    pub fn apply<I>(&self, products: I) -> Page<ProductDetail>
    where
        I: IntoIterator<Item = ProductDetail>,
    {
        let mut hits: Vec<ProductDetail> =
            products.into_iter().filter(|d| self.matches(d)).collect();
        hits.sort_by(|a, b| self.compare(&a.product, &b.product));
        let total = hits.len() as u64;
        let items = hits
            .into_iter()
            .skip(self.pagination.offset as usize)
            .take(self.pagination.limit as usize)
            .collect();
        Page { items, total, pagination: self.pagination }
    }
}

fn any_variant(detail: &ProductDetail, want: Option<&str>, pick: impl Fn(&Variant) -> &str) -> bool {
    match want {
        Some(w) => detail.variants.iter().any(|v| pick(v) == w),
        None => true,
    }
}

/// `created_at` descending, then id descending (UUIDv7 ids are time-ordered).
pub fn newest_first(a: &Product, b: &Product) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Whether `candidate` should be listed as related to `anchor`: published,
/// not the anchor itself, and sharing its collection or its specimen category.
pub fn is_related(anchor: &ProductDetail, candidate: &ProductDetail) -> bool {
    if !candidate.product.published || candidate.product.id == anchor.product.id {
        return false;
    }
    let same_collection = anchor
        .product
        .collection_id
        .is_some_and(|c| candidate.product.collection_id == Some(c));
    let anchor_category = anchor.specimen.as_ref().map(|s| s.specimen.category);
    let same_category = anchor_category
        .is_some_and(|c| candidate.specimen.as_ref().map(|s| s.specimen.category) == Some(c));
    same_collection || same_category
}

/// One page of a listing plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.pagination.limit))
    }

    pub fn has_more(&self) -> bool {
        self.total > u64::from(self.pagination.offset) + self.items.len() as u64
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pagination: self.pagination,
        }
    }
}
