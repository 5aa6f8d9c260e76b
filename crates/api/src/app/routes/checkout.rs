use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;

use atomic_cart::CheckoutRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/quote", post(quote))
        .route("/validate", post(validate))
        .route("/orders", post(place_order))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()))
}

pub async fn quote(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::QuoteRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services
        .storefront
        .checkout_quote(&req.items, req.discount_code.as_deref(), Utc::now())
        .await
    {
        Ok(quote) => dto::ok(StatusCode::OK, quote),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn validate(payload: Result<Json<CheckoutRequest>, JsonRejection>) -> Response {
    let req = match body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match req.validate() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let req = match body(payload) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match services.storefront.place_order(&req, Utc::now()).await {
        Ok(order) => dto::ok(StatusCode::CREATED, order),
        Err(e) => errors::service_error_to_response(e),
    }
}
