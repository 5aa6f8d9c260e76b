use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use atomic_core::{ContributorId, DomainResult, Entity, validate};

/// Scientist, lab or photographer credited for a specimen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub id: ContributorId,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub socials: BTreeMap<String, String>,
    /// Revenue share in basis points.
    pub rev_share_bps: Option<u32>,
    pub verified: bool,
}

impl Contributor {
    pub fn validate(&self) -> DomainResult<()> {
        validate::length("name", &self.name, 2, 200)?;
        if let Some(email) = &self.email {
            validate::email("email", email)?;
        }
        if let Some(website) = &self.website {
            validate::url("website", website)?;
        }
        if let Some(bps) = self.rev_share_bps {
            validate::basis_points("rev_share_bps", bps)?;
        }
        Ok(())
    }
}

impl Entity for Contributor {
    type Id = ContributorId;

    fn id(&self) -> ContributorId {
        self.id
    }
}
