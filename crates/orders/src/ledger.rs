use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_core::{DomainError, Entity, ImpactRouteId, LedgerEntryId, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    /// Recorded but not yet committed to a route.
    Pending,
    /// Committed to a route, awaiting payout.
    Allocated,
    /// Paid out to the beneficiary.
    Paid,
}

impl LedgerStatus {
    /// Statuses that count toward reported impact.
    pub const REPORTED: [LedgerStatus; 2] = [LedgerStatus::Allocated, LedgerStatus::Paid];

    pub fn is_reported(self) -> bool {
        Self::REPORTED.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Allocated => "allocated",
            LedgerStatus::Paid => "paid",
        }
    }
}

impl core::str::FromStr for LedgerStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LedgerStatus::Pending),
            "allocated" => Ok(LedgerStatus::Allocated),
            "paid" => Ok(LedgerStatus::Paid),
            other => Err(DomainError::validation(format!("unknown ledger status: {other}"))),
        }
    }
}

/// Amount routed to an impact beneficiary. The route name is denormalized so
/// reports survive route renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactLedgerEntry {
    pub id: LedgerEntryId,
    pub order_id: Option<OrderId>,
    pub impact_route_id: ImpactRouteId,
    pub impact_route_name: String,
    pub amount_cents: i64,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for ImpactLedgerEntry {
    type Id = LedgerEntryId;

    fn id(&self) -> LedgerEntryId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allocated_and_paid_are_reported() {
        assert!(!LedgerStatus::Pending.is_reported());
        assert!(LedgerStatus::Allocated.is_reported());
        assert!(LedgerStatus::Paid.is_reported());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [LedgerStatus::Pending, LedgerStatus::Allocated, LedgerStatus::Paid] {
            assert_eq!(s.as_str().parse::<LedgerStatus>().unwrap(), s);
        }
        assert!("void".parse::<LedgerStatus>().is_err());
    }
}
