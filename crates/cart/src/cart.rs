use serde::{Deserialize, Serialize};

use atomic_catalog::{ProductDetail, Variant};
use atomic_core::{ProductId, VariantId};

/// Fixed key the cart is persisted under.
pub const CART_STORAGE_KEY: &str = "atomic-cart";

/// Cart line item. Unit price is captured when the item is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_title: String,
    pub product_slug: String,
    pub size: String,
    pub color: String,
    pub material: String,
    /// Unit price in cents.
    pub price_cents: i64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub sku: String,
}

impl CartItem {
    /// Line item for `variant` of `detail` at the catalog's current price.
    pub fn from_catalog(detail: &ProductDetail, variant: &Variant, quantity: u32) -> Self {
        let product = &detail.product;
        Self {
            variant_id: variant.id,
            product_id: product.id,
            product_title: product.title.clone(),
            product_slug: product.slug.clone(),
            size: variant.size.clone(),
            color: variant.color.clone(),
            material: variant.material.clone(),
            price_cents: product.price_cents,
            quantity,
            image_url: detail.primary_image().map(|i| i.url.clone()),
            sku: variant.sku.clone(),
        }
    }

    pub fn line_total_cents(&self) -> i64 {
        self.price_cents * i64::from(self.quantity)
    }
}

/// Line items keyed by variant, in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Merge into the existing line for the same variant, or append.
    pub fn add_item(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|i| i.variant_id == item.variant_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => self.items.push(item),
        }
    }

    /// Drop every line for `variant_id`.
    pub fn remove_item(&mut self, variant_id: VariantId) {
        self.items.retain(|i| i.variant_id != variant_id);
    }

    /// Set the quantity; zero or below removes the line.
    pub fn update_quantity(&mut self, variant_id: VariantId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(variant_id);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        for item in self.items.iter_mut().filter(|i| i.variant_id == variant_id) {
            item.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of unit price × quantity, in cents.
    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(CartItem::line_total_cents).sum()
    }

    /// Distinct line items (the badge count).
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::item;
    use super::*;

    #[test]
    fn adding_same_variant_merges_quantities() {
        let v = VariantId::new();
        let mut cart = Cart::new();
        cart.add_item(item(v, 4500, 1));
        cart.add_item(item(v, 4500, 2));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
    }

    #[test]
    fn adding_new_variant_appends_in_order() {
        let (a, b) = (VariantId::new(), VariantId::new());
        let mut cart = Cart::new();
        cart.add_item(item(a, 4500, 1));
        cart.add_item(item(b, 4800, 1));
        cart.add_item(item(a, 4500, 1));
        let order: Vec<_> = cart.items().iter().map(|i| i.variant_id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn subtotal_is_price_times_quantity() {
        let mut cart = Cart::new();
        cart.add_item(item(VariantId::new(), 4500, 2));
        cart.add_item(item(VariantId::new(), 4800, 1));
        assert_eq!(cart.subtotal_cents(), 13_800);
        assert_eq!(cart.unit_count(), 3);
    }

    #[test]
    fn update_to_zero_or_below_removes_the_line() {
        let (a, b) = (VariantId::new(), VariantId::new());
        let mut cart = Cart::new();
        cart.add_item(item(a, 4500, 2));
        cart.add_item(item(b, 4800, 1));

        cart.update_quantity(a, 0);
        assert!(cart.items().iter().all(|i| i.variant_id != a));

        cart.update_quantity(b, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn update_sets_quantity() {
        let v = VariantId::new();
        let mut cart = Cart::new();
        cart.add_item(item(v, 4500, 2));
        cart.update_quantity(v, 5);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.subtotal_cents(), 22_500);
    }

    #[test]
    fn update_of_unknown_variant_is_a_no_op() {
        let mut cart = Cart::new();
        cart.add_item(item(VariantId::new(), 4500, 2));
        let before = cart.clone();
        cart.update_quantity(VariantId::new(), 7);
        assert_eq!(cart, before);
    }

    #[test]
    fn remove_and_clear() {
        let (a, b) = (VariantId::new(), VariantId::new());
        let mut cart = Cart::new();
        cart.add_item(item(a, 4500, 1));
        cart.add_item(item(b, 4500, 1));
        cart.remove_item(a);
        assert_eq!(cart.item_count(), 1);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal_cents(), 0);
    }

    #[test]
    fn serializes_as_plain_item_list() {
        let mut cart = Cart::new();
        cart.add_item(item(VariantId::new(), 4500, 1));
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["priceCents"], 4500);
        assert!(json[0].get("imageUrl").is_none());
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Merging never changes the subtotal compared to summing the additions.
            #[test]
            fn subtotal_matches_sum_of_additions(
                prices in proptest::collection::vec(1i64..10_000, 4),
                adds in proptest::collection::vec((0usize..4, 1u32..10), 0..30)
            ) {
                let variants: Vec<VariantId> = (0..4).map(|_| VariantId::new()).collect();
                let mut cart = Cart::new();
                let mut expected = 0i64;
                for (slot, qty) in &adds {
                    cart.add_item(item(variants[*slot], prices[*slot], *qty));
                    expected += prices[*slot] * i64::from(*qty);
                }
                prop_assert_eq!(cart.subtotal_cents(), expected);
                prop_assert!(cart.item_count() <= 4);
            }
        }
    }
}
