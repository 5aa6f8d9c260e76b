//! Specimens: the captured scientific images products are designed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atomic_core::{ContributorId, DomainError, DomainResult, Entity, SpecimenId, validate};

use crate::contributor::Contributor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecimenCategory {
    Microscope,
    Geology,
    BioPatterns,
    Marine,
    Astral,
}

impl SpecimenCategory {
    pub const ALL: [SpecimenCategory; 5] = [
        SpecimenCategory::Microscope,
        SpecimenCategory::Geology,
        SpecimenCategory::BioPatterns,
        SpecimenCategory::Marine,
        SpecimenCategory::Astral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpecimenCategory::Microscope => "Microscope",
            SpecimenCategory::Geology => "Geology",
            SpecimenCategory::BioPatterns => "BioPatterns",
            SpecimenCategory::Marine => "Marine",
            SpecimenCategory::Astral => "Astral",
        }
    }
}

impl core::fmt::Display for SpecimenCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SpecimenCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecimenCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "category must be one of: Microscope, Geology, BioPatterns, Marine, Astral (got {s})"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specimen {
    pub id: SpecimenId,
    pub code: String,
    pub title: String,
    pub category: SpecimenCategory,
    pub technique: Option<String>,
    pub magnification: Option<String>,
    pub source_note: Option<String>,
    pub location: Option<String>,
    pub capture_date: Option<DateTime<Utc>>,
    pub contributor_id: Option<ContributorId>,
    pub asset_url: String,
    pub thumbnail_url: Option<String>,
    /// Free-form taxonomy (kingdom…species for organisms, compound/formula for minerals).
    pub taxonomy: serde_json::Map<String, serde_json::Value>,
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Specimen {
    pub fn validate(&self) -> DomainResult<()> {
        validate::length("code", &self.code, 3, 50)?;
        validate::length("title", &self.title, 3, 200)?;
        if self.asset_url.trim().is_empty() {
            return Err(DomainError::validation("asset_url cannot be empty"));
        }
        Ok(())
    }

    /// Taxonomy value as text, if present and a string.
    pub fn taxon(&self, rank: &str) -> Option<&str> {
        self.taxonomy.get(rank).and_then(|v| v.as_str())
    }
}

impl Entity for Specimen {
    type Id = SpecimenId;

    fn id(&self) -> SpecimenId {
        self.id
    }
}

/// Specimen joined with its contributor, as shown on product pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecimenWithContributor {
    #[serde(flatten)]
    pub specimen: Specimen,
    pub contributor: Option<Contributor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_exact_names() {
        assert_eq!("BioPatterns".parse::<SpecimenCategory>().unwrap(), SpecimenCategory::BioPatterns);
        assert!("biopatterns".parse::<SpecimenCategory>().is_err());
    }

    #[test]
    fn category_serializes_as_its_name() {
        let json = serde_json::to_string(&SpecimenCategory::Marine).unwrap();
        assert_eq!(json, "\"Marine\"");
    }

    #[test]
    fn taxon_reads_string_ranks() {
        let mut taxonomy = serde_json::Map::new();
        taxonomy.insert("genus".into(), serde_json::json!("Morpho"));
        taxonomy.insert("hardness".into(), serde_json::json!(7));
        let specimen = Specimen {
            id: SpecimenId::new(),
            code: "SPEC-BIO-MORPHO-001".into(),
            title: "Morpho Butterfly Wing Scales".into(),
            category: SpecimenCategory::BioPatterns,
            technique: None,
            magnification: Some("500x".into()),
            source_note: None,
            location: None,
            capture_date: None,
            contributor_id: None,
            asset_url: "/art/original/morpho-wing-500x.jpg".into(),
            thumbnail_url: None,
            taxonomy,
            meta: serde_json::Map::new(),
        };
        assert!(specimen.validate().is_ok());
        assert_eq!(specimen.taxon("genus"), Some("Morpho"));
        assert_eq!(specimen.taxon("hardness"), None);
        assert_eq!(specimen.taxon("species"), None);
    }
}
