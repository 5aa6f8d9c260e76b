//! Checkout requests and pricing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_core::{DomainError, DomainResult, VariantId, validate};

use crate::cart::{Cart, CartItem};
use crate::discount::DiscountCode;

/// Requested variant and quantity; prices are resolved server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub variant_id: VariantId,
    pub quantity: i64,
}

fn default_country() -> String {
    "US".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    fn validate(&self, prefix: &str) -> DomainResult<()> {
        let field = |name: &str| format!("{prefix}.{name}");
        validate::min_length(&field("name"), &self.name, 2)?;
        validate::min_length(&field("address1"), &self.address1, 5)?;
        validate::min_length(&field("city"), &self.city, 2)?;
        validate::min_length(&field("state"), &self.state, 2)?;
        validate::min_length(&field("zip"), &self.zip, 3)?;
        validate::min_length(&field("country"), &self.country, 2)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub email: String,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub discount_code: Option<String>,
}

impl CheckoutRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("items must contain at least one line"));
        }
        if let Some(line) = self.items.iter().find(|l| l.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "quantity for variant {} must be positive",
                line.variant_id
            )));
        }
        validate::email("email", &self.email)?;
        self.shipping_address.validate("shippingAddress")?;
        if let Some(billing) = &self.billing_address {
            billing.validate("billingAddress")?;
        }
        Ok(())
    }
}

/// Store-wide pricing knobs applied at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPolicy {
    /// Flat shipping charge in cents.
    pub shipping_cents: i64,
    /// Discounted subtotal at or above which shipping is free.
    pub free_shipping_threshold_cents: Option<i64>,
    /// Sales tax on the discounted subtotal, in basis points.
    pub tax_bps: u32,
}

impl CheckoutPolicy {
    pub fn shipping_for(&self, taxable_cents: i64) -> i64 {
        match self.free_shipping_threshold_cents {
            Some(threshold) if taxable_cents >= threshold => 0,
            _ => self.shipping_cents,
        }
    }

    /// Nearest cent, halves up.
    pub fn tax_for(&self, taxable_cents: i64) -> i64 {
        (taxable_cents * i64::from(self.tax_bps) + 5_000) / 10_000
    }
}

/// Priced cart, ready to hand to a payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    pub items: Vec<CartItem>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub discount_code: Option<String>,
}

impl CheckoutQuote {
    pub fn price(
        cart: &Cart,
        discount: Option<&DiscountCode>,
        policy: &CheckoutPolicy,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if cart.is_empty() {
            return Err(DomainError::validation("cart is empty"));
        }
        let subtotal_cents = cart.subtotal_cents();
        let discount_cents = match discount {
            Some(code) => code.redeem(subtotal_cents, at)?,
            None => 0,
        };
        let taxable = subtotal_cents - discount_cents;
        let shipping_cents = policy.shipping_for(taxable);
        let tax_cents = policy.tax_for(taxable);

        Ok(Self {
            items: cart.items().to_vec(),
            subtotal_cents,
            shipping_cents,
            tax_cents,
            discount_cents,
            total_cents: taxable + shipping_cents + tax_cents,
            discount_code: discount.map(|d| d.code.clone()),
        })
    }
}
