use std::sync::Arc;

use axum::{Router, extract::Extension, http::StatusCode, response::Response, routing::get};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", get(list_collections))
}

pub async fn list_collections(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.storefront.catalog().collections().await {
        Ok(collections) => dto::ok(StatusCode::OK, collections),
        Err(e) => errors::repository_error_to_response(e),
    }
}
