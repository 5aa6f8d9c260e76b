use std::sync::Arc;

use axum::{Router, extract::Extension, http::StatusCode, response::Response, routing::get};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(summary))
        .route("/routes", get(routes))
}

pub async fn summary(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.storefront.impact_summary().await {
        Ok(summary) => dto::ok(StatusCode::OK, summary),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn routes(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.storefront.impact_routes().await {
        Ok(routes) => dto::ok(StatusCode::OK, routes),
        Err(e) => errors::service_error_to_response(e),
    }
}
