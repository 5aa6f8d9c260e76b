use chrono::{DateTime, Utc};

use atomic_catalog::ImpactRoute;
use atomic_core::{ImpactRouteId, LedgerEntryId};

use crate::{ImpactLedgerEntry, LedgerStatus, Order};

/// Split a paid order's proceeds across the impact routes its items fund.
///
/// Each item contributes `line_total * split_bps / 10000` (floored) to its
/// route. Amounts are merged per route in first-encounter order. Items whose
/// route is unknown or inactive are skipped, as are zero amounts.
pub fn allocate_order(
    order: &Order,
    routes: &[ImpactRoute],
    at: DateTime<Utc>,
) -> Vec<ImpactLedgerEntry> {
    let mut per_route: Vec<(&ImpactRoute, i64)> = Vec::new();

    for item in &order.items {
        let Some(route_id) = item.impact_route_id else {
            continue;
        };
        let Some(route) = find_active(routes, route_id) else {
            continue;
        };
        let share = route.share_of(item.line_total_cents());
        match per_route.iter_mut().find(|(r, _)| r.id == route_id) {
            Some((_, amount)) => *amount += share,
            None => per_route.push((route, share)),
        }
    }

    per_route
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(route, amount_cents)| ImpactLedgerEntry {
            id: LedgerEntryId::new(),
            order_id: Some(order.id),
            impact_route_id: route.id,
            impact_route_name: route.name.clone(),
            amount_cents,
            status: LedgerStatus::Allocated,
            created_at: at,
        })
        .collect()
}

fn find_active(routes: &[ImpactRoute], id: ImpactRouteId) -> Option<&ImpactRoute> {
    routes.iter().find(|r| r.id == id && r.active)
}
