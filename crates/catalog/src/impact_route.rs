use serde::{Deserialize, Serialize};

use atomic_core::{DomainResult, Entity, ImpactRouteId, validate};

/// Named beneficiary receiving a share of proceeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRoute {
    pub id: ImpactRouteId,
    pub slug: String,
    pub name: String,
    /// Free-form kind, e.g. "Education", "Restoration", "Youth Program".
    #[serde(rename = "type")]
    pub route_type: String,
    pub description: Option<String>,
    /// Share of a line's proceeds, in basis points (0..=10000).
    pub split_bps: u32,
    pub wallet: Option<String>,
    pub public_url: Option<String>,
    pub location: Option<String>,
    pub active: bool,
    pub notes: Option<String>,
}

impl ImpactRoute {
    pub fn validate(&self) -> DomainResult<()> {
        validate::length("slug", &self.slug, 3, 100)?;
        validate::length("name", &self.name, 3, 200)?;
        validate::basis_points("split_bps", self.split_bps)?;
        if let Some(url) = &self.public_url {
            validate::url("public_url", url)?;
        }
        Ok(())
    }

    /// Portion of `amount_cents` routed here (floored to the cent).
    pub fn share_of(&self, amount_cents: i64) -> i64 {
        amount_cents * i64::from(self.split_bps) / 10_000
    }
}

impl Entity for ImpactRoute {
    type Id = ImpactRouteId;

    fn id(&self) -> ImpactRouteId {
        self.id
    }
}
