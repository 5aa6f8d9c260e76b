//! Products, their images and purchasable variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_core::{
    CollectionId, DomainError, DomainResult, DropId, Entity, ImpactRouteId, ProductId,
    SpecimenId, VariantId, validate,
};

use crate::collection::Collection;
use crate::drop::ProductDrop;
use crate::impact_route::ImpactRoute;
use crate::specimen::SpecimenWithContributor;

/// Catalog product (one design, many variants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub title: String,
    pub sku: String,
    pub description: String,
    pub field_note: Option<String>,
    /// Price in smallest currency unit (cents).
    pub price_cents: i64,
    pub currency: String,
    pub specimen_id: Option<SpecimenId>,
    pub collection_id: Option<CollectionId>,
    pub impact_route_id: Option<ImpactRouteId>,
    pub drop_id: Option<DropId>,
    pub published: bool,
    pub featured: bool,
    pub tags: Vec<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub const DEFAULT_CURRENCY: &'static str = "USD";

    pub fn validate(&self) -> DomainResult<()> {
        validate::length("title", &self.title, 3, 200)?;
        validate::length("slug", &self.slug, 3, 200)?;
        validate::length("sku", &self.sku, 3, 50)?;
        validate::min_length("description", &self.description, 10)?;
        if self.price_cents <= 0 {
            return Err(DomainError::validation("price_cents must be positive"));
        }
        validate::optional_max_length("seo_title", self.seo_title.as_deref(), 60)?;
        validate::optional_max_length("seo_description", self.seo_description.as_deref(), 160)?;
        Ok(())
    }

    /// Tags overlap (has-some) with the requested set.
    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        self.tags.iter().any(|t| wanted.contains(t))
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    pub alt: String,
    pub sort_order: i32,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Print-on-demand provider fulfilling a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintProvider {
    Printful,
    Printify,
    Local,
}

impl PrintProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            PrintProvider::Printful => "printful",
            PrintProvider::Printify => "printify",
            PrintProvider::Local => "local",
        }
    }
}

impl core::str::FromStr for PrintProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "printful" => Ok(PrintProvider::Printful),
            "printify" => Ok(PrintProvider::Printify),
            "local" => Ok(PrintProvider::Local),
            other => Err(DomainError::validation(format!(
                "print_provider_type must be one of: printful, printify, local (got {other})"
            ))),
        }
    }
}

/// Purchasable variant of a product; the cart is keyed by its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub size: String,
    pub color: String,
    pub material: String,
    pub stock_qty: i32,
    pub print_provider_sku: Option<String>,
    pub print_provider_type: Option<PrintProvider>,
    pub weight_grams: Option<i32>,
}

impl Variant {
    pub fn validate(&self) -> DomainResult<()> {
        if self.stock_qty < 0 {
            return Err(DomainError::validation("stock_qty cannot be negative"));
        }
        if matches!(self.weight_grams, Some(w) if w <= 0) {
            return Err(DomainError::validation("weight_grams must be positive"));
        }
        Ok(())
    }

    pub fn in_stock(&self) -> bool {
        self.stock_qty > 0
    }
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> VariantId {
        self.id
    }
}

/// A product together with every relation a product page needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    /// Always ordered by `sort_order` ascending.
    pub images: Vec<ProductImage>,
    pub variants: Vec<Variant>,
    pub specimen: Option<SpecimenWithContributor>,
    pub collection: Option<Collection>,
    pub impact_route: Option<ImpactRoute>,
    pub drop: Option<ProductDrop>,
}

impl ProductDetail {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            images: Vec::new(),
            variants: Vec::new(),
            specimen: None,
            collection: None,
            impact_route: None,
            drop: None,
        }
    }

    /// Sort images into display order.
    pub fn with_images(mut self, mut images: Vec<ProductImage>) -> Self {
        images.sort_by_key(|i| i.sort_order);
        self.images = images;
        self
    }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn valid_product_passes() {
        assert!(product("Salt Crystal T-Shirt", 4500).validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_price() {
        let err = product("Salt Crystal T-Shirt", 0).validate().unwrap_err();
        assert_eq!(err, DomainError::validation("price_cents must be positive"));
    }

    #[test]
    fn rejects_long_seo_title() {
        let mut p = product("Salt Crystal T-Shirt", 4500);
        p.seo_title = Some("x".repeat(61));
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_short_description() {
        let mut p = product("Salt Crystal T-Shirt", 4500);
        p.description = "too short".to_string();
        assert!(p.validate().is_err());
    }

    #[test]
    fn variant_rejects_negative_stock() {
        let mut v = variant(ProductId::new(), "M", "Navy");
        v.stock_qty = -1;
        assert!(v.validate().is_err());
    }

    #[test]
    fn detail_orders_images_by_sort_order() {
        let img = |n: i32| ProductImage {
            url: format!("/products/{n}.jpg"),
            alt: String::new(),
            sort_order: n,
            width: None,
            height: None,
        };
        let detail = ProductDetail::new(product("Quartz Crystal", 4500))
            .with_images(vec![img(2), img(1), img(3)]);
        let order: Vec<i32> = detail.images.iter().map(|i| i.sort_order).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(detail.primary_image().unwrap().url, "/products/1.jpg");
    }

    #[test]
    fn print_provider_parses_known_values_only() {
        assert_eq!("printful".parse::<PrintProvider>().unwrap(), PrintProvider::Printful);
        assert!("gelato".parse::<PrintProvider>().is_err());
    }
}
