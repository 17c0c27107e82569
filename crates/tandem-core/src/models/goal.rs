//! Couple goal model

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    normalize_optional, null_as_default, require_title, Draft, Entity, EntityKind, GoalId, Patch,
    Searchable,
};
use crate::error::Result;

/// A goal the couple plans to achieve together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Stamped on every edit and completion toggle
    pub updated_at: DateTime<Utc>,
}

impl Goal {
    /// Target date at midnight UTC, the instant used for date buckets.
    #[must_use]
    pub fn target_instant(&self) -> Option<DateTime<Utc>> {
        self.target_date
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| midnight.and_utc())
    }
}

impl Entity for Goal {
    type Id = GoalId;
    type Draft = GoalDraft;
    type Patch = GoalPatch;

    const KIND: EntityKind = EntityKind::Goal;

    fn id(&self) -> GoalId {
        self.id
    }

    /// Newest first.
    fn natural_order(a: &Self, b: &Self) -> Ordering {
        b.created_at.cmp(&a.created_at)
    }
}

impl Searchable for Goal {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalDraft {
    pub title: String,
    pub target_date: Option<NaiveDate>,
    pub description: Option<String>,
}

impl GoalDraft {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            target_date: None,
            description: None,
        }
    }
}

impl Draft for GoalDraft {
    fn prepare(self) -> Result<Self> {
        Ok(Self {
            title: require_title(&self.title, EntityKind::Goal)?,
            target_date: self.target_date,
            description: normalize_optional(self.description),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoalPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GoalPatch {
    /// Minimal payload for the completion toggle.
    #[must_use]
    pub fn completion(completed: bool, now: DateTime<Utc>) -> Self {
        Self {
            completed: Some(completed),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Stamp the update time, as every goal edit does.
    #[must_use]
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(now),
            ..self
        }
    }
}

impl Patch<Goal> for GoalPatch {
    fn prepare(self) -> Result<Self> {
        let title = match self.title {
            Some(title) => Some(require_title(&title, EntityKind::Goal)?),
            None => None,
        };
        Ok(Self {
            title,
            description: self.description.map(normalize_optional),
            ..self
        })
    }

    fn apply_to(&self, goal: &mut Goal) {
        if let Some(title) = &self.title {
            goal.title.clone_from(title);
        }
        if let Some(target_date) = self.target_date {
            goal.target_date = target_date;
        }
        if let Some(description) = &self.description {
            goal.description.clone_from(description);
        }
        if let Some(completed) = self.completed {
            goal.completed = completed;
        }
        if let Some(updated_at) = self.updated_at {
            goal.updated_at = updated_at;
        }
    }
}
