//! Catalog domain module.
//!
//! This crate contains the catalog records (products, variants, specimens,
//! collections, contributors, impact routes, drops), their validation rules and
//! the product query composer. Everything here is deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod collection;
pub mod contributor;
pub mod drop;
pub mod impact_route;
pub mod product;
pub mod query;
pub mod specimen;

pub use collection::Collection;
pub use contributor::Contributor;
pub use drop::ProductDrop;
pub use impact_route::ImpactRoute;
pub use product::{PrintProvider, Product, ProductDetail, ProductImage, Variant};
pub use query::{
    FEATURED_LIMIT, OrderKey, Page, Pagination, ProductFilters, ProductQuery,
    RELATED_DEFAULT_LIMIT, SortBy, is_related, newest_first,
};
pub use specimen::{Specimen, SpecimenCategory, SpecimenWithContributor};
