//! Ordered cache of one entity kind.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{Entity, Patch};

/// Entities of one kind in natural order, plus a revision counter bumped on
/// every change so memoized projections know when to recompute.
#[derive(Debug, Clone)]
pub struct Collection<T: Entity> {
    items: Vec<T>,
    revision: u64,
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            revision: 0,
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Replace the whole collection with a fresh fetch result.
    pub fn load(&mut self, rows: Vec<T>) -> &[T] {
        let mut seen = HashSet::new();
        let mut rows = rows;
        rows.retain(|row| seen.insert(row.id()));
        rows.sort_by(T::natural_order);
        self.items = rows;
        self.touch();
        &self.items
    }

    /// Add a just-created entity at its natural position.
    ///
    /// An entity whose id is already cached replaces the cached copy, so an
    /// id never appears twice.
    pub fn apply_create(&mut self, entity: T) {
        if let Some(index) = self.position(entity.id()) {
            self.items.remove(index);
        }
        let index = self
            .items
            .partition_point(|existing| T::natural_order(existing, &entity) != Ordering::Greater);
        self.items.insert(index, entity);
        self.touch();
    }

    /// Apply a confirmed patch. Returns the updated entity, or `None` when
    /// the id is not cached.
    pub fn apply_update(&mut self, id: T::Id, patch: &T::Patch) -> Option<&T> {
        let index = self.position(id)?;
        patch.apply_to(&mut self.items[index]);
        self.items.sort_by(T::natural_order);
        self.touch();
        self.get(id)
    }

    /// Drop an entity. Unknown ids are ignored.
    pub fn apply_delete(&mut self, id: T::Id) -> Option<T> {
        let index = self.position(id)?;
        let removed = self.items.remove(index);
        self.touch();
        Some(removed)
    }

    /// Keep only entities matching `keep`; returns how many were dropped.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(keep);
        let dropped = before - self.items.len();
        if dropped > 0 {
            self.touch();
        }
        dropped
    }

    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: T::Id) -> bool {
        self.position(id).is_some()
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    fn position(&self, id: T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
