//! View projections.
//!
//! Pure functions deriving the displayed subset of a cached collection from
//! user-entered criteria. Projections filter but never re-sort: the result
//! keeps the input order, and the same input always yields the same output.

mod calendar;
mod goals;
mod milestones;

use crate::models::Searchable;

pub use calendar::{days_with_events, events_for_date, select_day, DaySelection};
pub use goals::{goal_stats, goals_in_tab, DateBucket, GoalCriteria, GoalStats, GoalStatus};
pub use milestones::{MilestoneCriteria, TypeFilter};

/// A set of predicates over one entity kind, combined with logical AND.
pub trait Criteria<T> {
    fn matches(&self, item: &T) -> bool;

    /// Whether any predicate narrows the result.
    fn is_active(&self) -> bool;
}

/// Keep the items matching `criteria`, in input order.
pub fn project<T: Clone, C: Criteria<T>>(items: &[T], criteria: &C) -> Vec<T> {
    items
        .iter()
        .filter(|item| criteria.matches(item))
        .cloned()
        .collect()
}

/// Case-insensitive substring query over title and description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextQuery(String);

impl TextQuery {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty query matches everything; an absent description never
    /// matches a non-empty query.
    pub fn matches<S: Searchable>(&self, item: &S) -> bool {
        if self.0.is_empty() {
            return true;
        }
        item.title().to_lowercase().contains(&self.0)
            || item
                .description()
                .is_some_and(|description| description.to_lowercase().contains(&self.0))
    }
}
