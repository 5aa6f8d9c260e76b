use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_core::{DomainError, DomainResult, DropId, Entity, validate};

/// Time-boxed, optionally limited product release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDrop {
    pub id: DropId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub limited: bool,
    pub edition_size: Option<u32>,
    pub published: bool,
}

impl ProductDrop {
    pub fn validate(&self) -> DomainResult<()> {
        validate::length("slug", &self.slug, 3, 100)?;
        validate::length("title", &self.title, 3, 200)?;
        if self.edition_size == Some(0) {
            return Err(DomainError::validation("edition_size must be positive"));
        }
        if matches!(self.end_at, Some(end) if end < self.start_at) {
            return Err(DomainError::validation("end_at cannot precede start_at"));
        }
        Ok(())
    }

    /// Published and `start_at <= at <= end_at` (open-ended when `end_at` is absent).
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        self.published && self.start_at <= at && self.end_at.is_none_or(|end| at <= end)
    }
}

impl Entity for ProductDrop {
    type Id = DropId;

    fn id(&self) -> DropId {
        self.id
    }
}
