use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_cart::CheckoutQuote;
use atomic_core::{
    DomainError, DomainResult, Entity, ImpactRouteId, OrderId, ProductId, VariantId, validate,
};

/// Order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Fulfilled,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Statuses that count as a completed sale.
    pub const SOLD: [OrderStatus; 2] = [OrderStatus::Paid, OrderStatus::Fulfilled];

    pub fn is_sold(self) -> bool {
        Self::SOLD.contains(&self)
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid) | (Pending, Cancelled) | (Paid, Fulfilled) | (Paid, Refunded) | (Fulfilled, Refunded)
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "fulfilled" => Ok(OrderStatus::Fulfilled),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::validation(format!("unknown order status: {other}"))),
        }
    }
}

/// Snapshot of a purchased variant. Stored as JSON on the order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub title: String,
    pub sku: String,
    pub price_cents: i64,
    /// Older rows may omit the quantity; absent or zero counts as one unit.
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub impact_route_id: Option<ImpactRouteId>,
}

impl OrderItem {
    pub fn units(&self) -> u32 {
        self.quantity.filter(|q| *q > 0).unwrap_or(1)
    }

    pub fn line_total_cents(&self) -> i64 {
        self.price_cents * i64::from(self.units())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub email: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub discount_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// New `pending` order from a priced quote. `route_of` resolves the impact
    /// route each product funds.
    pub fn place(
        email: &str,
        quote: &CheckoutQuote,
        route_of: impl Fn(ProductId) -> Option<ImpactRouteId>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        validate::email("email", email)?;
        if quote.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        let items = quote
            .items
            .iter()
            .map(|i| OrderItem {
                variant_id: i.variant_id,
                product_id: i.product_id,
                title: i.product_title.clone(),
                sku: i.sku.clone(),
                price_cents: i.price_cents,
                quantity: Some(i.quantity),
                impact_route_id: route_of(i.product_id),
            })
            .collect();

        Ok(Self {
            id: OrderId::new(),
            email: email.trim().to_string(),
            status: OrderStatus::Pending,
            items,
            subtotal_cents: quote.subtotal_cents,
            shipping_cents: quote.shipping_cents,
            tax_cents: quote.tax_cents,
            discount_cents: quote.discount_cents,
            total_cents: quote.total_cents,
            discount_code: quote.discount_code.clone(),
            created_at: at,
            updated_at: at,
        })
    }

    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.units())).sum()
    }

    /// Move to `next`, enforcing the fulfilment lifecycle.
    pub fn transition_to(&mut self, next: OrderStatus, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status == next {
            return Err(DomainError::conflict(format!("order is already {next}")));
        }
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "order cannot move from {} to {next}",
                self.status
            )));
        }
        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn order(status: OrderStatus, quantities: &[Option<u32>]) -> Order {
        let at = Utc::now();
        Order {
            id: OrderId::new(),
            email: "ada@example.com".into(),
            status,
            items: quantities
                .iter()
                .map(|q| OrderItem {
                    variant_id: VariantId::new(),
                    product_id: ProductId::new(),
                    title: "Salt Crystal T-Shirt".into(),
                    sku: "bella-3001-navy-m".into(),
                    price_cents: 4500,
                    quantity: *q,
                    impact_route_id: None,
                })
                .collect(),
            subtotal_cents: 0,
            shipping_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 0,
            discount_code: None,
            created_at: at,
            updated_at: at,
        }
    }
}
