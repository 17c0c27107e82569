//! Milestone photo model

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_optional, Draft, Entity, EntityKind, MilestoneId, Patch, PhotoId};
use crate::error::{Error, Result};

/// A photo in a milestone's gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    /// Owning milestone
    pub milestone_id: MilestoneId,
    /// Public URL of the stored image
    pub photo_url: String,
    #[serde(default)]
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Photo {
    type Id = PhotoId;
    type Draft = PhotoDraft;
    type Patch = PhotoPatch;

    const KIND: EntityKind = EntityKind::Photo;

    fn id(&self) -> PhotoId {
        self.id
    }

    fn natural_order(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoDraft {
    pub milestone_id: MilestoneId,
    pub photo_url: String,
    pub caption: Option<String>,
}

impl Draft for PhotoDraft {
    fn prepare(self) -> Result<Self> {
        let photo_url = self.photo_url.trim().to_string();
        if photo_url.is_empty() {
            return Err(Error::Validation("A photo URL is required".to_string()));
        }
        Ok(Self {
            milestone_id: self.milestone_id,
            photo_url,
            caption: normalize_optional(self.caption),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhotoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<Option<String>>,
}

impl Patch<Photo> for PhotoPatch {
    fn prepare(self) -> Result<Self> {
        Ok(Self {
            caption: self.caption.map(normalize_optional),
        })
    }

    fn apply_to(&self, photo: &mut Photo) {
        if let Some(caption) = &self.caption {
            photo.caption.clone_from(caption);
        }
    }
}
