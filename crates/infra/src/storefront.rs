//! Storefront services: repository reads combined with the pure domain
//! components (query composer, checkout pricing, impact summarizer).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, instrument};

use atomic_cart::{Cart, CartItem, CheckoutLine, CheckoutPolicy, CheckoutQuote, CheckoutRequest, DiscountCode};
use atomic_catalog::{ImpactRoute, ProductDetail};
use atomic_core::{DomainError, OrderId, VariantId};
use atomic_impact::{ImpactSummary, summarize};
use atomic_orders::{ImpactLedgerEntry, Order, OrderStatus, allocate_order};

use crate::catalog::CatalogRepository;
use crate::discounts::DiscountRepository;
use crate::error::RepositoryError;
use crate::impact::ImpactRepository;
use crate::orders::OrderRepository;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Clone)]
pub struct Storefront {
    catalog: Arc<dyn CatalogRepository>,
    impact: Arc<dyn ImpactRepository>,
    orders: Arc<dyn OrderRepository>,
    discounts: Arc<dyn DiscountRepository>,
    policy: CheckoutPolicy,
}

impl Storefront {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        impact: Arc<dyn ImpactRepository>,
        orders: Arc<dyn OrderRepository>,
        discounts: Arc<dyn DiscountRepository>,
        policy: CheckoutPolicy,
    ) -> Self {
        Self { catalog, impact, orders, discounts, policy }
    }

    pub fn catalog(&self) -> &dyn CatalogRepository {
        self.catalog.as_ref()
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    pub async fn impact_routes(&self) -> ServiceResult<Vec<ImpactRoute>> {
        Ok(self.impact.active_routes().await?)
    }

    #[instrument(skip(self), err)]
    pub async fn impact_summary(&self) -> ServiceResult<ImpactSummary> {
        let entries = self.impact.reported_entries().await?;
        let routes = self.impact.routes().await?;
        let orders = self.orders.sold_orders().await?;
        Ok(summarize(&entries, &routes, &orders))
    }

    /// Price `lines` against current catalog prices.
    #[instrument(skip(self, lines), fields(line_count = lines.len()), err)]
    pub async fn checkout_quote(
        &self,
        lines: &[CheckoutLine],
        discount_code: Option<&str>,
        at: DateTime<Utc>,
    ) -> ServiceResult<CheckoutQuote> {
        Ok(self.priced(lines, discount_code, at).await?.0)
    }

    /// Validate the request, price it and record a `pending` order.
    #[instrument(skip(self, request), fields(line_count = request.items.len()), err)]
    pub async fn place_order(&self, request: &CheckoutRequest, at: DateTime<Utc>) -> ServiceResult<Order> {
        request.validate()?;
        let (quote, details) = self
            .priced(&request.items, request.discount_code.as_deref(), at)
            .await?;

        let order = Order::place(
            &request.email,
            &quote,
            |product_id| {
                details
                    .iter()
                    .find(|d| d.product.id == product_id)
                    .and_then(|d| d.product.impact_route_id)
            },
            at,
        )?;
        self.orders.insert(&order).await?;
        if let Some(code) = &quote.discount_code {
            if let Err(err) = self.discounts.record_use(code).await {
                if let Err(cleanup) = self.orders.delete(order.id).await {
                    error!(order_id = %order.id, error = %cleanup, "failed to remove order after discount redemption failed");
                }
                return Err(err.into());
            }
        }
        info!(order_id = %order.id, total_cents = order.total_cents, "order placed");
        Ok(order)
    }

    /// Move an order to `next`.
    #[instrument(skip(self), fields(order_id = %order_id, next = %next), err)]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> ServiceResult<Order> {
        let mut order = self.orders.get(order_id).await?;
        let from = order.status;
        order.transition_to(next, at)?;
        self.orders.update_status(&order, from).await?;
        Ok(order)
    }

    /// Mark an order paid and allocate its proceeds to impact routes.
    ///
    /// Only one concurrent settlement of an order wins the status change. If the
    /// ledger append fails the order is put back to its previous status, so the
    /// settlement can be retried.
    #[instrument(skip(self), fields(order_id = %order_id), err)]
    pub async fn settle_payment(&self, order_id: OrderId, at: DateTime<Utc>) -> ServiceResult<Vec<ImpactLedgerEntry>> {
        let before = self.orders.get(order_id).await?;
        let mut order = before.clone();
        order.transition_to(OrderStatus::Paid, at)?;
        let routes = self.impact.routes().await?;
        let entries = allocate_order(&order, &routes, at);

        self.orders.update_status(&order, before.status).await?;
        if let Err(err) = self.impact.append(&entries).await {
            if let Err(revert) = self.orders.update_status(&before, OrderStatus::Paid).await {
                error!(error = %revert, "failed to revert order status after ledger append failed");
            }
            return Err(err.into());
        }
        info!(entry_count = entries.len(), "impact allocated");
        Ok(entries)
    }

    async fn priced(
        &self,
        lines: &[CheckoutLine],
        discount_code: Option<&str>,
        at: DateTime<Utc>,
    ) -> ServiceResult<(CheckoutQuote, Vec<ProductDetail>)> {
        if lines.is_empty() {
            return Err(DomainError::validation("items: at least one item is required").into());
        }
        let variant_ids: Vec<VariantId> = lines.iter().map(|l| l.variant_id).collect();
        let details = self.catalog.products_by_variant(&variant_ids).await?;

        let mut cart = Cart::new();
        for line in lines {
            let quantity = u32::try_from(line.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| DomainError::validation("items.quantity: must be a positive integer"))?;
            let (detail, variant) = details
                .iter()
                .find_map(|d| d.variant(line.variant_id).map(|v| (d, v)))
                .ok_or_else(|| DomainError::not_found(format!("variant {}", line.variant_id)))?;
            cart.add_item(CartItem::from_catalog(detail, variant, quantity));
        }

        let discount = match discount_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                self.discounts
                    .find(code)
                    .await?
                    .ok_or_else(|| DomainError::validation(format!("discount code {} is not valid", DiscountCode::normalize(code))))?,
            ),
            None => None,
        };

        let quote = CheckoutQuote::price(&cart, discount.as_ref(), &self.policy, at)?;
        Ok((quote, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::discounts::InMemoryDiscounts;
    use crate::impact::InMemoryImpactLedger;
    use crate::orders::InMemoryOrders;
    use crate::test_support::{detail, route};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use atomic_cart::{Address, DiscountKind};
    use atomic_orders::LedgerStatus;

    use crate::error::RepositoryResult;

    struct Fixture {
        storefront: Storefront,
        tee: VariantId,
        hoodie: VariantId,
    }

    /// Seeded in-memory repositories, kept concrete so tests can wrap them.
    struct Repos {
        catalog: Arc<InMemoryCatalog>,
        impact: Arc<InMemoryImpactLedger>,
        orders: Arc<InMemoryOrders>,
        discounts: Arc<InMemoryDiscounts>,
        tee: VariantId,
        hoodie: VariantId,
    }

    const POLICY: CheckoutPolicy =
        CheckoutPolicy { shipping_cents: 500, free_shipping_threshold_cents: None, tax_bps: 0 };

    fn repos() -> Repos {
        let catalog = Arc::new(InMemoryCatalog::new());
        let impact = Arc::new(InMemoryImpactLedger::new());
        let discounts = Arc::new(InMemoryDiscounts::new());

        let labs = route("North Babylon School Labs", "Education", 1500);
        impact.upsert_route(labs.clone()).unwrap();

        let mut tee = detail("Salt Crystal T-Shirt", 4500, 2);
        tee.product.impact_route_id = Some(labs.id);
        let hoodie = detail("Diatom Grid Hoodie", 4800, 1);
        let (tee_variant, hoodie_variant) = (tee.variants[0].id, hoodie.variants[0].id);
        catalog.upsert_product(tee).unwrap();
        catalog.upsert_product(hoodie).unwrap();

        discounts
            .upsert(DiscountCode {
                code: "STUDENT25".into(),
                kind: DiscountKind::Percentage,
                value: 25,
                min_purchase_cents: None,
                max_uses: Some(1),
                uses: 0,
                active: true,
                starts_at: None,
                expires_at: None,
            })
            .unwrap();

        Repos {
            catalog,
            impact,
            orders: Arc::new(InMemoryOrders::new()),
            discounts,
            tee: tee_variant,
            hoodie: hoodie_variant,
        }
    }

    fn fixture() -> Fixture {
        let r = repos();
        let storefront = Storefront::new(r.catalog, r.impact, r.orders, r.discounts, POLICY);
        Fixture { storefront, tee: r.tee, hoodie: r.hoodie }
    }

    /// Orders repository that can yield between read and write, or refuse inserts.
    struct ScriptedOrders {
        inner: Arc<InMemoryOrders>,
        yield_after_get: bool,
        fail_insert: bool,
        inserted: Mutex<Vec<OrderId>>,
    }

    impl ScriptedOrders {
        fn new(inner: Arc<InMemoryOrders>) -> Self {
            Self { inner, yield_after_get: false, fail_insert: false, inserted: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl OrderRepository for ScriptedOrders {
        async fn insert(&self, order: &Order) -> RepositoryResult<()> {
            if self.fail_insert {
                return Err(RepositoryError::Database("connection reset".into()));
            }
            self.inserted.lock().unwrap().push(order.id);
            self.inner.insert(order).await
        }

        async fn get(&self, id: OrderId) -> RepositoryResult<Order> {
            let order = self.inner.get(id).await?;
            if self.yield_after_get {
                tokio::task::yield_now().await;
            }
            Ok(order)
        }

        async fn update_status(&self, order: &Order, from: OrderStatus) -> RepositoryResult<()> {
            self.inner.update_status(order, from).await
        }

        async fn delete(&self, id: OrderId) -> RepositoryResult<()> {
            self.inner.delete(id).await
        }

        async fn sold_orders(&self) -> RepositoryResult<Vec<Order>> {
            self.inner.sold_orders().await
        }
    }

    /// Ledger whose next `failures` appends fail.
    struct FlakyLedger {
        inner: Arc<InMemoryImpactLedger>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl ImpactRepository for FlakyLedger {
        async fn routes(&self) -> RepositoryResult<Vec<ImpactRoute>> {
            self.inner.routes().await
        }

        async fn active_routes(&self) -> RepositoryResult<Vec<ImpactRoute>> {
            self.inner.active_routes().await
        }

        async fn reported_entries(&self) -> RepositoryResult<Vec<ImpactLedgerEntry>> {
            self.inner.reported_entries().await
        }

        async fn append(&self, entries: &[ImpactLedgerEntry]) -> RepositoryResult<()> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(RepositoryError::Database("connection reset".into()));
            }
            self.inner.append(entries).await
        }
    }

    /// Discounts whose redemption always loses the race for the last use.
    struct ExhaustedOnUse(Arc<InMemoryDiscounts>);

    #[async_trait]
    impl DiscountRepository for ExhaustedOnUse {
        async fn find(&self, code: &str) -> RepositoryResult<Option<DiscountCode>> {
            self.0.find(code).await
        }

        async fn record_use(&self, code: &str) -> RepositoryResult<()> {
            Err(RepositoryError::Conflict(format!("discount code {code} is exhausted")))
        }
    }

    fn line(variant_id: VariantId, quantity: i64) -> CheckoutLine {
        CheckoutLine { variant_id, quantity }
    }

    fn request(lines: Vec<CheckoutLine>, code: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            items: lines,
            email: "ada@example.com".into(),
            shipping_address: Address {
                name: "Ada Lovelace".into(),
                address1: "12 Crystal Lane".into(),
                address2: None,
                city: "Babylon".into(),
                state: "NY".into(),
                zip: "11702".into(),
                country: "US".into(),
                phone: None,
            },
            billing_address: None,
            discount_code: code.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn quote_uses_catalog_prices_and_merges_lines() {
        let f = fixture();
        let quote = f
            .storefront
            .checkout_quote(&[line(f.tee, 1), line(f.hoodie, 1), line(f.tee, 1)], None, Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.items.len(), 2);
        assert_eq!(quote.subtotal_cents, 13_800);
        assert_eq!(quote.total_cents, 14_300);
    }

    #[tokio::test]
    async fn quote_applies_discount_codes() {
        let f = fixture();
        let quote = f
            .storefront
            .checkout_quote(&[line(f.tee, 2), line(f.hoodie, 1)], Some("student25"), Utc::now())
            .await
            .unwrap();
        assert_eq!(quote.discount_cents, 3_450);
        assert_eq!(quote.discount_code.as_deref(), Some("STUDENT25"));

        let err = f
            .storefront
            .checkout_quote(&[line(f.tee, 1)], Some("NOPE"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_variant_is_not_found() {
        let f = fixture();
        let err = f
            .storefront
            .checkout_quote(&[line(VariantId::new(), 1)], None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let f = fixture();
        let err = f.storefront.checkout_quote(&[line(f.tee, 0)], None, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn settled_orders_feed_the_impact_summary() {
        let f = fixture();
        let now = Utc::now();
        let order = f
            .storefront
            .place_order(&request(vec![line(f.tee, 2), line(f.hoodie, 1)], Some("STUDENT25")), now)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let before = f.storefront.impact_summary().await.unwrap();
        assert_eq!(before.total_orders, 0);

        let entries = f.storefront.settle_payment(order.id, now).await.unwrap();
        assert_eq!(entries.len(), 1);
        // 15% of the 9000 tee line.
        assert_eq!(entries[0].amount_cents, 1_350);
        assert_eq!(entries[0].status, LedgerStatus::Allocated);

        let summary = f.storefront.impact_summary().await.unwrap();
        assert_eq!(summary.total_donated_cents, 1_350);
        assert_eq!(summary.route_breakdown[0].route_type, "Education");
        assert_eq!(summary.route_breakdown[0].percentage, 100);
        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.total_products, 3);

        let again = f.storefront.settle_payment(order.id, now).await.unwrap_err();
        assert!(matches!(again, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn exhausted_discount_blocks_the_second_order() {
        let f = fixture();
        let req = request(vec![line(f.tee, 1)], Some("STUDENT25"));
        f.storefront.place_order(&req, Utc::now()).await.unwrap();
        let err = f.storefront.place_order(&req, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn concurrent_settlements_allocate_once() {
        let r = repos();
        let mut orders = ScriptedOrders::new(r.orders.clone());
        orders.yield_after_get = true;
        let storefront = Storefront::new(r.catalog, r.impact, Arc::new(orders), r.discounts, POLICY);
        let now = Utc::now();
        let order = storefront.place_order(&request(vec![line(r.tee, 1)], None), now).await.unwrap();

        let (a, b) = tokio::join!(
            storefront.settle_payment(order.id, now),
            storefront.settle_payment(order.id, now)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_err() { a } else { b };
        assert!(matches!(loser, Err(ServiceError::Repository(RepositoryError::Conflict(_)))));

        let summary = storefront.impact_summary().await.unwrap();
        // 15% of one 4500 tee.
        assert_eq!(summary.total_donated_cents, 675);
        assert_eq!(summary.total_orders, 1);
    }

    #[tokio::test]
    async fn failed_ledger_append_leaves_the_order_settleable() {
        let r = repos();
        let ledger = Arc::new(FlakyLedger { inner: r.impact.clone(), failures: AtomicUsize::new(1) });
        let storefront = Storefront::new(r.catalog, ledger, r.orders.clone(), r.discounts, POLICY);
        let now = Utc::now();
        let order = storefront.place_order(&request(vec![line(r.tee, 1)], None), now).await.unwrap();

        let err = storefront.settle_payment(order.id, now).await.unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::Database(_))));
        assert_eq!(r.orders.get(order.id).await.unwrap().status, OrderStatus::Pending);
        assert_eq!(storefront.impact_summary().await.unwrap().total_orders, 0);

        let entries = storefront.settle_payment(order.id, now).await.unwrap();
        assert_eq!(entries.len(), 1);
        let summary = storefront.impact_summary().await.unwrap();
        assert_eq!(summary.total_donated_cents, 675);
        assert_eq!(summary.total_orders, 1);
    }

    #[tokio::test]
    async fn failed_order_insert_keeps_the_discount_unused() {
        let r = repos();
        let mut orders = ScriptedOrders::new(r.orders.clone());
        orders.fail_insert = true;
        let storefront =
            Storefront::new(r.catalog, r.impact, Arc::new(orders), r.discounts.clone(), POLICY);

        let err = storefront
            .place_order(&request(vec![line(r.tee, 1)], Some("STUDENT25")), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::Database(_))));
        assert_eq!(r.discounts.find("STUDENT25").await.unwrap().unwrap().uses, 0);
    }

    #[tokio::test]
    async fn failed_redemption_removes_the_order() {
        let r = repos();
        let orders = Arc::new(ScriptedOrders::new(r.orders.clone()));
        let storefront = Storefront::new(
            r.catalog,
            r.impact,
            orders.clone(),
            Arc::new(ExhaustedOnUse(r.discounts)),
            POLICY,
        );

        let err = storefront
            .place_order(&request(vec![line(r.tee, 1)], Some("STUDENT25")), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::Conflict(_))));

        let inserted = orders.inserted.lock().unwrap().clone();
        assert_eq!(inserted.len(), 1);
        assert!(matches!(r.orders.get(inserted[0]).await, Err(RepositoryError::NotFound(_))));
    }
}
