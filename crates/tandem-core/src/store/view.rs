//! Memoized projections.

use crate::models::Entity;

use super::Collection;

/// Remembers the last projection of a collection.
///
/// The cached result is reused only while both the collection revision and
/// the criteria are unchanged; any store mutation bumps the revision.
#[derive(Debug)]
pub struct ProjectionCache<T, C> {
    entry: Option<CacheEntry<T, C>>,
}

#[derive(Debug)]
struct CacheEntry<T, C> {
    revision: u64,
    criteria: C,
    result: Vec<T>,
}

impl<T, C> Default for ProjectionCache<T, C> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T: Entity, C: Clone + PartialEq> ProjectionCache<T, C> {
    pub fn get_or_compute(
        &mut self,
        collection: &Collection<T>,
        criteria: &C,
        compute: impl FnOnce(&[T], &C) -> Vec<T>,
    ) -> &[T] {
        let fresh = self.entry.as_ref().is_some_and(|entry| {
            entry.revision == collection.revision() && entry.criteria == *criteria
        });
        if !fresh {
            self.entry = Some(CacheEntry {
                revision: collection.revision(),
                criteria: criteria.clone(),
                result: compute(collection.items(), criteria),
            });
        }
        match &self.entry {
            Some(entry) => entry.result.as_slice(),
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Utc;

    use super::*;
    use crate::models::{Goal, GoalId};

    fn goal(title: &str) -> Goal {
        let now = Utc::now();
        Goal {
            id: GoalId::new(),
            title: title.to_string(),
            target_date: None,
            description: None,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn recomputes_only_when_revision_or_criteria_change() {
        let mut goals = Collection::default();
        goals.load(vec![goal("a")]);
        let mut cache: ProjectionCache<Goal, String> = ProjectionCache::default();
        let runs = Cell::new(0);
        let compute = |items: &[Goal], _: &String| {
            runs.set(runs.get() + 1);
            items.to_vec()
        };

        cache.get_or_compute(&goals, &"x".to_string(), compute);
        cache.get_or_compute(&goals, &"x".to_string(), compute);
        assert_eq!(runs.get(), 1);

        cache.get_or_compute(&goals, &"y".to_string(), compute);
        assert_eq!(runs.get(), 2);

        goals.apply_create(goal("b"));
        let result = cache.get_or_compute(&goals, &"y".to_string(), compute);
        assert_eq!(result.len(), 2);
        assert_eq!(runs.get(), 3);
    }
}
