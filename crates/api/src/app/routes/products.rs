use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    http::StatusCode,
    response::Response,
    routing::get,
};

use atomic_catalog::RELATED_DEFAULT_LIMIT;
use atomic_core::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

// `:product` is a slug on the detail route and an id on `/related`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/featured", get(featured_products))
        .route("/:product", get(get_product))
        .route("/:product/related", get(related_products))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ProductListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()),
    };
    let query = match params.into_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    match services.storefront.catalog().list_products(&query).await {
        Ok(page) => dto::paged(page),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn featured_products(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.storefront.catalog().featured_products().await {
        Ok(products) => dto::ok(StatusCode::OK, products),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> Response {
    match services.storefront.catalog().product_by_slug(&slug).await {
        Ok(product) => dto::ok(StatusCode::OK, product),
        Err(e) => errors::repository_error_to_response(e),
    }
}

pub async fn related_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    params: Result<Query<dto::RelatedParams>, QueryRejection>,
) -> Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let limit = match params {
        Ok(Query(p)) => p.limit.unwrap_or(RELATED_DEFAULT_LIMIT),
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", e.body_text()),
    };

    match services.storefront.catalog().related_products(product_id, limit).await {
        Ok(products) => dto::ok(StatusCode::OK, products),
        Err(e) => errors::repository_error_to_response(e),
    }
}
