use serde::{Deserialize, Serialize};

use atomic_catalog::ImpactRoute;
use atomic_core::ImpactRouteId;
use atomic_orders::{ImpactLedgerEntry, Order};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteBreakdown {
    pub route_id: ImpactRouteId,
    pub route_name: String,
    /// Empty when the route record no longer exists.
    pub route_type: String,
    pub amount_cents: i64,
    pub percentage: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactSummary {
    pub total_donated_cents: i64,
    pub route_breakdown: Vec<RouteBreakdown>,
    pub total_orders: u64,
    pub total_products: u64,
}

/// Aggregate reported ledger entries per route and count completed sales.
///
/// Only `allocated`/`paid` entries and `paid`/`fulfilled` orders contribute;
/// anything else in the input is ignored. Routes appear in the order they are
/// first seen in `entries`.
pub fn summarize(entries: &[ImpactLedgerEntry], routes: &[ImpactRoute], orders: &[Order]) -> ImpactSummary {
    let mut breakdown: Vec<RouteBreakdown> = Vec::new();
    let mut total: i64 = 0;

    for entry in entries.iter().filter(|e| e.status.is_reported()) {
        total += entry.amount_cents;
        match breakdown.iter_mut().find(|b| b.route_id == entry.impact_route_id) {
            Some(existing) => existing.amount_cents += entry.amount_cents,
            None => breakdown.push(RouteBreakdown {
                route_id: entry.impact_route_id,
                route_name: entry.impact_route_name.clone(),
                route_type: routes
                    .iter()
                    .find(|r| r.id == entry.impact_route_id)
                    .map(|r| r.route_type.clone())
                    .unwrap_or_default(),
                amount_cents: entry.amount_cents,
                percentage: 0,
            }),
        }
    }

    for route in &mut breakdown {
        route.percentage = percentage_of(route.amount_cents, total);
    }

    let sold = orders.iter().filter(|o| o.status.is_sold());
    let (total_orders, total_products) = sold.fold((0u64, 0u64), |(n, units), o| (n + 1, units + o.unit_count()));

    ImpactSummary {
        total_donated_cents: total,
        route_breakdown: breakdown,
        total_orders,
        total_products,
    }
}

/// `amount / total` as a whole percentage, halves rounded up. Zero when
/// `total` is not positive.
pub fn percentage_of(amount: i64, total: i64) -> u32 {
    if total <= 0 || amount <= 0 {
        return 0;
    }
    let pct = (i128::from(amount) * 200 + i128::from(total)) / (i128::from(total) * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}
