//! Discount codes and their evaluation against a cart subtotal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_core::{DomainError, DomainResult, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a whole percentage (1..=100).
    Percentage,
    /// `value` is an amount in cents.
    FixedAmount,
}

impl DiscountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::FixedAmount => "fixed_amount",
        }
    }
}

impl core::str::FromStr for DiscountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountKind::Percentage),
            "fixed_amount" => Ok(DiscountKind::FixedAmount),
            other => Err(DomainError::validation(format!(
                "discount type must be percentage or fixed_amount (got {other})"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    /// Stored upper-case; lookups go through [`DiscountCode::normalize`].
    pub code: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    pub value: i64,
    pub min_purchase_cents: Option<i64>,
    pub max_uses: Option<u32>,
    pub uses: u32,
    pub active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    pub fn normalize(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate::length("code", &self.code, 3, 50)?;
        if self.code != Self::normalize(&self.code) {
            return Err(DomainError::validation("code must be upper-case"));
        }
        if self.value <= 0 {
            return Err(DomainError::validation("value must be positive"));
        }
        if self.kind == DiscountKind::Percentage && self.value > 100 {
            return Err(DomainError::validation("percentage value cannot exceed 100"));
        }
        if matches!(self.min_purchase_cents, Some(m) if m < 0) {
            return Err(DomainError::validation("min_purchase_cents cannot be negative"));
        }
        if self.max_uses == Some(0) {
            return Err(DomainError::validation("max_uses must be positive"));
        }
        Ok(())
    }

    /// Check the code can be redeemed at `at` against `subtotal_cents`.
    pub fn ensure_redeemable(&self, subtotal_cents: i64, at: DateTime<Utc>) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::validation(format!("discount code {} is not active", self.code)));
        }
        if self.starts_at.is_some_and(|start| at < start) {
            return Err(DomainError::validation(format!("discount code {} is not valid yet", self.code)));
        }
        if self.expires_at.is_some_and(|end| at > end) {
            return Err(DomainError::validation(format!("discount code {} has expired", self.code)));
        }
        if self.max_uses.is_some_and(|max| self.uses >= max) {
            return Err(DomainError::validation(format!(
                "discount code {} has reached its usage limit",
                self.code
            )));
        }
        if let Some(min) = self.min_purchase_cents {
            if subtotal_cents < min {
                return Err(DomainError::validation(format!(
                    "discount code {} requires a subtotal of at least {min} cents",
                    self.code
                )));
            }
        }
        Ok(())
    }

    /// Discount in cents for `subtotal_cents`, never more than the subtotal.
    pub fn amount_for(&self, subtotal_cents: i64) -> i64 {
        let raw = match self.kind {
            // Nearest cent, halves up.
            DiscountKind::Percentage => (subtotal_cents * self.value + 50) / 100,
            DiscountKind::FixedAmount => self.value,
        };
        raw.clamp(0, subtotal_cents.max(0))
    }

    /// [`ensure_redeemable`](Self::ensure_redeemable) then [`amount_for`](Self::amount_for).
    pub fn redeem(&self, subtotal_cents: i64, at: DateTime<Utc>) -> DomainResult<i64> {
        self.ensure_redeemable(subtotal_cents, at)?;
        Ok(self.amount_for(subtotal_cents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn student25() -> DiscountCode {
        DiscountCode {
            code: "STUDENT25".into(),
            kind: DiscountKind::Percentage,
            value: 25,
            min_purchase_cents: None,
            max_uses: None,
            uses: 0,
            active: true,
            starts_at: None,
            expires_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn percentage_rounds_to_nearest_cent() {
        let code = student25();
        assert_eq!(code.redeem(13_800, now()).unwrap(), 3_450);
        assert_eq!(code.amount_for(4_502), 1_126); // 1125.5 rounds up
        assert_eq!(code.amount_for(4_501), 1_125); // 1125.25 rounds down
    }

    #[test]
    fn fixed_amount_never_exceeds_subtotal() {
        let code = DiscountCode { kind: DiscountKind::FixedAmount, value: 5_000, ..student25() };
        assert_eq!(code.amount_for(12_000), 5_000);
        assert_eq!(code.amount_for(3_000), 3_000);
        assert_eq!(code.amount_for(0), 0);
    }

    #[test]
    fn inactive_expired_and_future_codes_are_rejected() {
        assert!(DiscountCode { active: false, ..student25() }.redeem(4_500, now()).is_err());
        assert!(
            DiscountCode { expires_at: Some(now() - Duration::seconds(1)), ..student25() }
                .redeem(4_500, now())
                .is_err()
        );
        assert!(
            DiscountCode { starts_at: Some(now() + Duration::days(1)), ..student25() }
                .redeem(4_500, now())
                .is_err()
        );
        assert!(
            DiscountCode { expires_at: Some(now()), ..student25() }
                .redeem(4_500, now())
                .is_ok()
        );
    }

    #[test]
    fn exhausted_codes_are_rejected() {
        let code = DiscountCode { max_uses: Some(10), uses: 10, ..student25() };
        assert!(code.redeem(4_500, now()).is_err());
        let code = DiscountCode { uses: 9, ..code };
        assert!(code.redeem(4_500, now()).is_ok());
    }

    #[test]
    fn minimum_purchase_is_enforced() {
        let code = DiscountCode { min_purchase_cents: Some(5_000), ..student25() };
        assert!(code.redeem(4_999, now()).is_err());
        assert_eq!(code.redeem(5_000, now()).unwrap(), 1_250);
    }

    #[test]
    fn validation_rules() {
        assert!(student25().validate().is_ok());
        assert!(DiscountCode { value: 101, ..student25() }.validate().is_err());
        assert!(DiscountCode { value: 0, ..student25() }.validate().is_err());
        assert!(DiscountCode { code: "student25".into(), ..student25() }.validate().is_err());
        assert!(DiscountCode { code: "AB".into(), ..student25() }.validate().is_err());
        assert_eq!(DiscountCode::normalize(" student25 "), "STUDENT25");
    }

    #[test]
    fn kind_uses_snake_case_wire_names() {
        assert_eq!(serde_json::to_string(&DiscountKind::FixedAmount).unwrap(), "\"fixed_amount\"");
        assert_eq!("percentage".parse::<DiscountKind>().unwrap(), DiscountKind::Percentage);
    }
}
