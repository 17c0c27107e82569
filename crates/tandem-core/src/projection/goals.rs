//! Goal filters and completion statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Criteria, TextQuery};
use crate::models::Goal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    All,
    Active,
    Completed,
}

impl GoalStatus {
    #[must_use]
    pub const fn matches(self, goal: &Goal) -> bool {
        match self {
            Self::All => true,
            Self::Active => !goal.completed,
            Self::Completed => goal.completed,
        }
    }
}

/// Bucket of a goal's target date relative to a reference instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateBucket {
    #[default]
    All,
    Upcoming,
    Past,
    NoDate,
}

impl DateBucket {
    /// Goals without a target date only ever match `All` and `NoDate`.
    #[must_use]
    pub fn matches(self, goal: &Goal, now: DateTime<Utc>) -> bool {
        match self {
            Self::All => true,
            Self::NoDate => goal.target_date.is_none(),
            Self::Upcoming => goal.target_instant().is_some_and(|target| target > now),
            Self::Past => goal.target_instant().is_some_and(|target| target < now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCriteria {
    pub query: TextQuery,
    pub status: GoalStatus,
    pub date_bucket: DateBucket,
    /// Reference instant for the date buckets. Part of the criteria so a
    /// projection depends on nothing but its inputs.
    pub now: DateTime<Utc>,
}

impl GoalCriteria {
    /// Criteria matching every goal, evaluated against `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            query: TextQuery::default(),
            status: GoalStatus::All,
            date_bucket: DateBucket::All,
            now,
        }
    }

    #[must_use]
    pub fn with_query(self, raw: &str) -> Self {
        Self {
            query: TextQuery::new(raw),
            ..self
        }
    }

    #[must_use]
    pub fn with_status(self, status: GoalStatus) -> Self {
        Self { status, ..self }
    }

    #[must_use]
    pub fn with_date_bucket(self, date_bucket: DateBucket) -> Self {
        Self {
            date_bucket,
            ..self
        }
    }

    /// Reset every filter, keeping the reference instant.
    #[must_use]
    pub fn clear(self) -> Self {
        Self::new(self.now)
    }
}

impl Criteria<Goal> for GoalCriteria {
    fn matches(&self, goal: &Goal) -> bool {
        self.query.matches(goal)
            && self.status.matches(goal)
            && self.date_bucket.matches(goal, self.now)
    }

    fn is_active(&self) -> bool {
        !self.query.is_empty()
            || self.status != GoalStatus::All
            || self.date_bucket != DateBucket::All
    }
}

/// Split of an already projected list into the all / active / completed tabs.
#[must_use]
pub fn goals_in_tab(goals: &[Goal], tab: GoalStatus) -> Vec<Goal> {
    goals.iter().filter(|goal| tab.matches(goal)).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalStats {
    pub completed: usize,
    pub total: usize,
    /// Rounded completion percentage, 0 when there are no goals
    pub percentage: u8,
}

#[must_use]
pub fn goal_stats(goals: &[Goal]) -> GoalStats {
    let total = goals.len();
    let completed = goals.iter().filter(|goal| goal.completed).count();
    let percentage = if total == 0 {
        0
    } else {
        // Integer round-half-up of completed / total * 100.
        u8::try_from((completed * 200 + total) / (total * 2)).unwrap_or(100)
    };
    GoalStats {
        completed,
        total,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::GoalId;
    use crate::projection::project;

    fn now() -> DateTime<Utc> {
        "2024-06-15T12:00:00Z".parse().unwrap()
    }

    fn goal(title: &str, completed: bool, target: Option<&str>) -> Goal {
        Goal {
            id: GoalId::new(),
            title: title.to_string(),
            target_date: target.map(|day| day.parse::<NaiveDate>().unwrap()),
            description: None,
            completed,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn titles(goals: &[Goal]) -> Vec<&str> {
        goals.iter().map(|goal| goal.title.as_str()).collect()
    }

    #[test]
    fn status_filter_splits_active_and_completed() {
        let goals = vec![goal("Trip", false, None), goal("Move in", true, None)];
        let active = project(&goals, &GoalCriteria::new(now()).with_status(GoalStatus::Active));
        let done = project(&goals, &GoalCriteria::new(now()).with_status(GoalStatus::Completed));
        assert_eq!(titles(&active), vec!["Trip"]);
        assert_eq!(titles(&done), vec!["Move in"]);
    }

    #[test]
    fn date_buckets_compare_against_reference_instant() {
        let goals = vec![
            goal("future", false, Some("2024-12-01")),
            goal("past", false, Some("2024-01-01")),
            goal("undated", false, None),
        ];
        let pick = |bucket: DateBucket| {
            let criteria = GoalCriteria::new(now()).with_date_bucket(bucket);
            titles(&project(&goals, &criteria))
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        assert_eq!(pick(DateBucket::Upcoming), vec!["future"]);
        assert_eq!(pick(DateBucket::Past), vec!["past"]);
        assert_eq!(pick(DateBucket::NoDate), vec!["undated"]);
        assert_eq!(pick(DateBucket::All).len(), 3);
    }

    #[test]
    fn today_counts_as_past_after_midnight() {
        let goals = vec![goal("today", false, Some("2024-06-15"))];
        let past = project(&goals, &GoalCriteria::new(now()).with_date_bucket(DateBucket::Past));
        assert_eq!(past.len(), 1);
    }

    #[test]
    fn criteria_combine_with_and() {
        let goals = vec![
            goal("Paris trip", false, Some("2024-12-01")),
            goal("Paris dinner", true, Some("2024-12-01")),
            goal("Rome trip", false, Some("2024-01-01")),
        ];
        let criteria = GoalCriteria::new(now())
            .with_query("PARIS")
            .with_status(GoalStatus::Active)
            .with_date_bucket(DateBucket::Upcoming);
        assert_eq!(titles(&project(&goals, &criteria)), vec!["Paris trip"]);
        assert!(criteria.is_active());
        assert!(!criteria.clear().is_active());
    }

    #[test]
    fn projection_is_deterministic_and_keeps_order() {
        let goals = vec![
            goal("c", false, None),
            goal("a", false, None),
            goal("b", true, None),
        ];
        let criteria = GoalCriteria::new(now()).with_status(GoalStatus::Active);
        let first = project(&goals, &criteria);
        let second = project(&goals, &criteria);
        assert_eq!(first, second);
        assert_eq!(titles(&first), vec!["c", "a"]);
    }

    #[test]
    fn stats_round_percentage() {
        let goals = vec![
            goal("a", true, None),
            goal("b", false, None),
            goal("c", false, None),
        ];
        assert_eq!(
            goal_stats(&goals),
            GoalStats {
                completed: 1,
                total: 3,
                percentage: 33
            }
        );
        assert_eq!(goal_stats(&[]).percentage, 0);
        assert_eq!(goal_stats(&goals[..2]).percentage, 50);
    }

    #[test]
    fn tabs_filter_projected_goals() {
        let goals = vec![goal("a", true, None), goal("b", false, None)];
        assert_eq!(titles(&goals_in_tab(&goals, GoalStatus::Completed)), vec!["a"]);
        assert_eq!(goals_in_tab(&goals, GoalStatus::All).len(), 2);
    }
}
