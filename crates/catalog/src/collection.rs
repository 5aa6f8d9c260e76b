use serde::{Deserialize, Serialize};

use atomic_core::{CollectionId, DomainResult, Entity, validate};

/// Curated product grouping (Microscope, Geology, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub blurb: Option<String>,
    pub hero_image: Option<String>,
    pub published: bool,
    pub sort_order: i32,
}

impl Collection {
    pub fn validate(&self) -> DomainResult<()> {
        validate::length("title", &self.title, 3, 100)?;
        validate::length("slug", &self.slug, 3, 100)?;
        validate::optional_max_length("blurb", self.blurb.as_deref(), 200)?;
        if let Some(url) = &self.hero_image {
            validate::url("hero_image", url)?;
        }
        Ok(())
    }

    /// Display order: `sort_order`, then title.
    pub fn display_order(a: &Collection, b: &Collection) -> core::cmp::Ordering {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.title.cmp(&b.title))
    }
}

impl Entity for Collection {
    type Id = CollectionId;

    fn id(&self) -> CollectionId {
        self.id
    }
}
