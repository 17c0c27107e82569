//! Milestone filters: text, type and favorites.

use super::{Criteria, TextQuery};
use crate::models::{Milestone, MilestoneType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TypeFilter {
    #[default]
    All,
    Only(MilestoneType),
}

impl TypeFilter {
    #[must_use]
    pub fn matches(self, milestone_type: MilestoneType) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == milestone_type,
        }
    }
}

impl From<MilestoneType> for TypeFilter {
    fn from(value: MilestoneType) -> Self {
        Self::Only(value)
    }
}

impl From<Option<MilestoneType>> for TypeFilter {
    fn from(value: Option<MilestoneType>) -> Self {
        value.map_or(Self::All, Self::Only)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MilestoneCriteria {
    pub query: TextQuery,
    pub milestone_type: TypeFilter,
    pub favorites_only: bool,
}

impl MilestoneCriteria {
    #[must_use]
    pub fn with_query(self, raw: &str) -> Self {
        Self {
            query: TextQuery::new(raw),
            ..self
        }
    }

    #[must_use]
    pub fn with_type(self, milestone_type: impl Into<TypeFilter>) -> Self {
        Self {
            milestone_type: milestone_type.into(),
            ..self
        }
    }

    #[must_use]
    pub fn favorites_only(self, favorites_only: bool) -> Self {
        Self {
            favorites_only,
            ..self
        }
    }

    #[must_use]
    pub fn clear(self) -> Self {
        Self::default()
    }
}

impl Criteria<Milestone> for MilestoneCriteria {
    fn matches(&self, milestone: &Milestone) -> bool {
        self.query.matches(milestone)
            && self.milestone_type.matches(milestone.milestone_type)
            && (!self.favorites_only || milestone.is_favorite)
    }

    fn is_active(&self) -> bool {
        !self.query.is_empty() || self.milestone_type != TypeFilter::All || self.favorites_only
    }
}
