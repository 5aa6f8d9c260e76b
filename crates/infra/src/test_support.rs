//! Record builders shared by the repository tests.

use chrono::{Duration, TimeZone, Utc};

use atomic_catalog::{Collection, ImpactRoute, Product, ProductDetail, ProductImage, Variant};
use atomic_core::{CollectionId, ImpactRouteId, ProductId, VariantId};

/// Published product `age_days` older than a fixed instant, with one M/Navy variant.
pub fn detail(title: &str, price_cents: i64, age_days: i64) -> ProductDetail {
    let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() - Duration::days(age_days);
    let slug = title.to_lowercase().replace(' ', "-");
    let id = ProductId::new();
    let product = Product {
        id,
        slug: slug.clone(),
        title: title.to_string(),
        sku: format!("ATOM-{}", slug.to_uppercase()),
        description: "Printed from a field specimen on organic cotton.".to_string(),
        field_note: None,
        price_cents,
        currency: Product::DEFAULT_CURRENCY.to_string(),
        specimen_id: None,
        collection_id: None,
        impact_route_id: None,
        drop_id: None,
        published: true,
        featured: false,
        tags: vec!["crystal".to_string()],
        seo_title: None,
        seo_description: None,
        created_at: at,
        updated_at: at,
    };
    let mut detail = ProductDetail::new(product).with_images(vec![ProductImage {
        url: format!("/images/{slug}.jpg"),
        alt: title.to_string(),
        sort_order: 0,
        width: Some(1200),
        height: Some(1200),
    }]);
    detail.variants.push(Variant {
        id: VariantId::new(),
        product_id: id,
        sku: format!("{slug}-navy-m"),
        size: "M".to_string(),
        color: "Navy".to_string(),
        material: "Organic Cotton".to_string(),
        stock_qty: 25,
        print_provider_sku: None,
        print_provider_type: None,
        weight_grams: Some(180),
    });
    detail
}

pub fn collection(slug: &str, title: &str, sort_order: i32) -> Collection {
    Collection {
        id: CollectionId::new(),
        slug: slug.to_string(),
        title: title.to_string(),
        description: None,
        blurb: None,
        hero_image: None,
        published: true,
        sort_order,
    }
}

pub fn in_collection(mut detail: ProductDetail, collection: &Collection) -> ProductDetail {
    detail.product.collection_id = Some(collection.id);
    detail.collection = Some(collection.clone());
    detail
}

pub fn route(name: &str, route_type: &str, split_bps: u32) -> ImpactRoute {
    ImpactRoute {
        id: ImpactRouteId::new(),
        slug: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        route_type: route_type.to_string(),
        description: None,
        split_bps,
        wallet: None,
        public_url: None,
        location: None,
        active: true,
        notes: None,
    }
}
