//! Local collection store.
//!
//! An in-memory, ordered mirror of each remote collection. It is refreshed
//! wholesale by `load` and patched by the coordinator after the gateway has
//! confirmed a mutation. It is never the source of truth.

mod collection;
mod view;

use chrono::{DateTime, Utc};

use crate::gateway::Filter;
use crate::models::{Entity, Event, Goal, GoalPatch, Milestone, Photo};
use crate::projection::{GoalCriteria, MilestoneCriteria};

pub use collection::Collection;
pub use view::ProjectionCache;

#[derive(Debug, Default)]
pub struct Store {
    pub events: Collection<Event>,
    pub goals: Collection<Goal>,
    pub milestones: Collection<Milestone>,
    pub photos: Collection<Photo>,
    pub(crate) goal_views: ProjectionCache<Goal, GoalCriteria>,
    pub(crate) milestone_views: ProjectionCache<Milestone, MilestoneCriteria>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn collection<T: Stored>(&self) -> &Collection<T> {
        T::collection(self)
    }

    pub fn collection_mut<T: Stored>(&mut self) -> &mut Collection<T> {
        T::collection_mut(self)
    }

    /// Forget everything, e.g. when the session ends.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Remove an entity and whatever cached data depends on it.
    pub fn remove<T: Stored>(&mut self, id: T::Id) -> Option<T> {
        let removed = T::collection_mut(self).apply_delete(id);
        T::after_remove(self, id);
        removed
    }
}

/// Entities with a home in the [`Store`].
pub trait Stored: Entity {
    fn collection(store: &Store) -> &Collection<Self>;
    fn collection_mut(store: &mut Store) -> &mut Collection<Self>;

    /// Selection used by a wholesale `load`.
    fn load_filter() -> Filter {
        Filter::all()
    }

    /// Last chance to adjust a validated patch before it is sent.
    fn before_update(patch: Self::Patch, _now: DateTime<Utc>) -> Self::Patch {
        patch
    }

    /// Hook for cached data owned by the removed entity.
    fn after_remove(_store: &mut Store, _id: Self::Id) {}
}

impl Stored for Event {
    fn collection(store: &Store) -> &Collection<Self> {
        &store.events
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.events
    }
}

impl Stored for Goal {
    fn collection(store: &Store) -> &Collection<Self> {
        &store.goals
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.goals
    }

    fn load_filter() -> Filter {
        Filter::all().order_by("created_at", false)
    }

    fn before_update(patch: GoalPatch, now: DateTime<Utc>) -> GoalPatch {
        patch.touched(now)
    }
}

impl Stored for Milestone {
    fn collection(store: &Store) -> &Collection<Self> {
        &store.milestones
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.milestones
    }

    fn load_filter() -> Filter {
        Filter::all().order_by("date", false)
    }

    fn after_remove(store: &mut Store, id: Self::Id) {
        let dropped = store.photos.retain(|photo| photo.milestone_id != id);
        if dropped > 0 {
            tracing::debug!("Dropped {} cached photos of milestone {}", dropped, id);
        }
    }
}

impl Stored for Photo {
    fn collection(store: &Store) -> &Collection<Self> {
        &store.photos
    }

    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.photos
    }

    fn load_filter() -> Filter {
        Filter::all().order_by("created_at", false)
    }
}
