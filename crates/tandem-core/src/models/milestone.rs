//! Relationship milestone model

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    normalize_optional, null_as_default, require_title, Draft, Entity, EntityKind, MilestoneId,
    Patch, Searchable,
};
use crate::error::{Error, Result};

/// Kind of milestone.
///
/// Unrecognized values stored by older clients read as `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneType {
    Anniversary,
    First,
    Special,
    #[default]
    #[serde(other)]
    Other,
}

impl MilestoneType {
    pub const ALL: [Self; 4] = [Self::Anniversary, Self::First, Self::Special, Self::Other];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anniversary => "anniversary",
            Self::First => "first",
            Self::Special => "special",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MilestoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MilestoneType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("Unknown milestone type: {s}")))
    }
}

/// A remembered moment in the relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    pub milestone_type: MilestoneType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Milestone {
    type Id = MilestoneId;
    type Draft = MilestoneDraft;
    type Patch = MilestonePatch;

    const KIND: EntityKind = EntityKind::Milestone;

    fn id(&self) -> MilestoneId {
        self.id
    }

    /// Most recent date first.
    fn natural_order(a: &Self, b: &Self) -> Ordering {
        b.date.cmp(&a.date)
    }
}

impl Searchable for Milestone {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneDraft {
    pub title: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub milestone_type: MilestoneType,
    pub is_favorite: bool,
}

impl MilestoneDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, date: NaiveDate, milestone_type: MilestoneType) -> Self {
        Self {
            title: title.into(),
            date,
            description: None,
            milestone_type,
            is_favorite: false,
        }
    }
}

impl Draft for MilestoneDraft {
    fn prepare(self) -> Result<Self> {
        Ok(Self {
            title: require_title(&self.title, EntityKind::Milestone)?,
            description: normalize_optional(self.description),
            ..self
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MilestonePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_type: Option<MilestoneType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl MilestonePatch {
    #[must_use]
    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }
}

impl Patch<Milestone> for MilestonePatch {
    fn prepare(self) -> Result<Self> {
        let title = match self.title {
            Some(title) => Some(require_title(&title, EntityKind::Milestone)?),
            None => None,
        };
        Ok(Self {
            title,
            description: self.description.map(normalize_optional),
            ..self
        })
    }

    fn apply_to(&self, milestone: &mut Milestone) {
        if let Some(title) = &self.title {
            milestone.title.clone_from(title);
        }
        if let Some(date) = self.date {
            milestone.date = date;
        }
        if let Some(description) = &self.description {
            milestone.description.clone_from(description);
        }
        if let Some(milestone_type) = self.milestone_type {
            milestone.milestone_type = milestone_type;
        }
        if let Some(is_favorite) = self.is_favorite {
            milestone.is_favorite = is_favorite;
        }
    }
}
