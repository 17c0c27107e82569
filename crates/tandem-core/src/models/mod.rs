//! Data models for Tandem
//!
//! Every row that crosses the gateway boundary is parsed into one of these
//! explicit schemas before it reaches the local store.

mod event;
mod goal;
mod id;
mod milestone;
mod photo;

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

pub use event::{Event, EventDraft, EventPatch, MAX_NOTIFICATION_DAYS};
pub use goal::{Goal, GoalDraft, GoalPatch};
pub use id::{EventId, GoalId, MilestoneId, PhotoId};
pub use milestone::{Milestone, MilestoneDraft, MilestonePatch, MilestoneType};
pub use photo::{Photo, PhotoDraft, PhotoPatch};

/// The four remote collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Event,
    Goal,
    Milestone,
    Photo,
}

impl EntityKind {
    /// Remote collection (table) name.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Event => "calendar_events",
            Self::Goal => "couple_goals",
            Self::Milestone => "relationship_milestones",
            Self::Photo => "milestone_photos",
        }
    }

    /// Whether rows carry a `user_id` owner column stamped on insert.
    #[must_use]
    pub const fn owned_by_user(self) -> bool {
        !matches!(self, Self::Photo)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Event => "event",
            Self::Goal => "goal",
            Self::Milestone => "milestone",
            Self::Photo => "photo",
        };
        f.write_str(label)
    }
}

/// A record mirrored from one remote collection.
pub trait Entity: Clone + fmt::Debug + DeserializeOwned + Serialize + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;
    type Draft: Draft;
    type Patch: Patch<Self>;

    const KIND: EntityKind;

    fn id(&self) -> Self::Id;

    /// Natural display order of the collection.
    ///
    /// `Ordering::Equal` for every pair means insertion order.
    fn natural_order(a: &Self, b: &Self) -> Ordering;
}

/// Insert payload for a new entity.
pub trait Draft: Serialize + Send + Sync + Sized {
    /// Validate required fields and normalize optional text.
    fn prepare(self) -> Result<Self>;
}

/// Partial update payload for an existing entity.
pub trait Patch<T>: Serialize + Clone + Send + Sync + Sized {
    /// Validate present fields and normalize optional text.
    fn prepare(self) -> Result<Self>;

    /// Apply the patch to a cached entity.
    fn apply_to(&self, entity: &mut T);
}

/// Entities with a title and optional description for text search.
pub trait Searchable {
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
}

/// Read a nullable column, mapping `null` to the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn require_title(title: &str, kind: EntityKind) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(crate::Error::Validation(format!("Every {kind} needs a title")));
    }
    Ok(title.to_string())
}

pub(crate) fn normalize_optional(value: Option<String>) -> Option<String> {
    crate::util::normalize_text_option(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_match_backend_tables() {
        assert_eq!(EntityKind::Event.collection(), "calendar_events");
        assert_eq!(EntityKind::Goal.collection(), "couple_goals");
        assert_eq!(EntityKind::Milestone.collection(), "relationship_milestones");
        assert_eq!(EntityKind::Photo.collection(), "milestone_photos");
    }

    #[test]
    fn photos_are_not_user_owned() {
        assert!(EntityKind::Goal.owned_by_user());
        assert!(!EntityKind::Photo.owned_by_user());
    }

    #[test]
    fn blank_title_is_a_validation_error() {
        let error = require_title("   ", EntityKind::Goal).unwrap_err();
        assert!(matches!(error, crate::Error::Validation(_)));
        assert_eq!(
            require_title("", EntityKind::Event).unwrap_err().user_message(),
            "Every event needs a title"
        );
        assert_eq!(require_title(" Trip ", EntityKind::Goal).unwrap(), "Trip");
    }
}
