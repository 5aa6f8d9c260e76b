use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use atomic_cart::CheckoutLine;
use atomic_catalog::{Page, Pagination, ProductFilters, ProductQuery, SortBy, SpecimenCategory};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// `GET /products` query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub collection: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Comma-separated tag list.
    pub tags: Option<String>,
    pub search: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductListParams {
    pub fn into_query(self) -> Result<ProductQuery, Response> {
        let category = match non_blank(self.category) {
            Some(raw) => Some(raw.parse::<SpecimenCategory>().map_err(|_| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_category",
                    "category must be one of: Microscope, Geology, BioPatterns, Marine, Astral",
                )
            })?),
            None => None,
        };
        let sort = match non_blank(self.sort_by) {
            Some(raw) => raw.parse::<SortBy>().map_err(|_| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_sort",
                    "sortBy must be one of: newest, price-asc, price-desc, popular",
                )
            })?,
            None => SortBy::default(),
        };
        for (name, bound) in [("minPrice", self.min_price), ("maxPrice", self.max_price)] {
            if bound.is_some_and(|b| !b.is_finite() || b < 0.0) {
                return Err(errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_price",
                    format!("{name} must be a non-negative number"),
                ));
            }
        }
        let tags = self
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ProductQuery::new(
            ProductFilters {
                collection: non_blank(self.collection),
                category,
                min_price: self.min_price,
                max_price: self.max_price,
                tags,
                search: non_blank(self.search),
                size: non_blank(self.size),
                color: non_blank(self.color),
                material: non_blank(self.material),
            },
            sort,
            Pagination::from_page(self.page, self.limit),
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedParams {
    pub limit: Option<u32>,
}

/// `POST /checkout/quote` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub items: Vec<CheckoutLine>,
    #[serde(default)]
    pub discount_code: Option<String>,
}

// -------------------------
// Response envelopes
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl<T> From<&Page<T>> for PageMeta {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.pagination.page(),
            limit: page.pagination.limit,
            total: page.total,
            total_pages: page.total_pages(),
        }
    }
}

/// `{ "success": true, "data": ... }`
pub fn ok<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(serde_json::json!({ "success": true, "data": data }))).into_response()
}

/// `{ "success": true, "data": [...], "meta": { page, limit, total, totalPages } }`
pub fn paged<T: Serialize>(page: Page<T>) -> Response {
    let meta = PageMeta::from(&page);
    Json(serde_json::json!({ "success": true, "data": page.items, "meta": meta })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_build_the_query() {
        let query = ProductListParams {
            category: Some("Geology".into()),
            min_price: Some(40.0),
            max_price: Some(50.0),
            tags: Some("quartz, crystal,,".into()),
            sort_by: Some("price-asc".into()),
            page: Some(3),
            limit: Some(10),
            search: Some("   ".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();

        assert_eq!(query.filters.category, Some(SpecimenCategory::Geology));
        assert_eq!(query.filters.tags, vec!["quartz".to_string(), "crystal".to_string()]);
        assert_eq!(query.filters.search, None);
        assert_eq!(query.sort, SortBy::PriceAsc);
        assert_eq!(query.pagination, Pagination { limit: 10, offset: 20 });
    }

    #[test]
    fn unknown_category_or_sort_is_rejected() {
        let bad_category = ProductListParams { category: Some("Botany".into()), ..Default::default() };
        assert_eq!(bad_category.into_query().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let bad_sort = ProductListParams { sort_by: Some("cheapest".into()), ..Default::default() };
        assert_eq!(bad_sort.into_query().unwrap_err().status(), StatusCode::BAD_REQUEST);

        let negative = ProductListParams { min_price: Some(-1.0), ..Default::default() };
        assert!(negative.into_query().is_err());
    }
}
