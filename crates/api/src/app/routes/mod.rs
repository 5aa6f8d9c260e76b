use axum::Router;

pub mod checkout;
pub mod collections;
pub mod impact;
pub mod products;
pub mod system;

/// Router for all storefront endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/collections", collections::router())
        .nest("/impact", impact::router())
        .nest("/checkout", checkout::router())
}
