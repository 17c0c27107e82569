//! Per-target mutation state.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::models::EntityKind;

/// `Idle -> Submitting -> {Committed | Failed}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Submitting,
    Committed,
    /// Holds the display text of the failure
    Failed(String),
}

impl MutationState {
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

/// What a mutation acts on: one entity, or a kind's create form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationTarget {
    pub kind: EntityKind,
    pub id: Option<String>,
}

impl MutationTarget {
    #[must_use]
    pub const fn create(kind: EntityKind) -> Self {
        Self { kind, id: None }
    }

    pub fn entity(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self {
            kind,
            id: Some(id.to_string()),
        }
    }
}

impl fmt::Display for MutationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} {id}", self.kind),
            None => write!(f, "new {}", self.kind),
        }
    }
}

/// The user action behind a mutation, used for notices and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub(crate) const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub(crate) const fn past(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

/// Shared table of mutation states keyed by target.
#[derive(Debug, Clone, Default)]
pub struct MutationTracker {
    states: Arc<Mutex<HashMap<MutationTarget, MutationState>>>,
}

impl MutationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MutationTarget, MutationState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `target` for a new submission.
    ///
    /// Fails with [`Error::MutationInFlight`] while an earlier submission for
    /// the same target has not finished.
    pub fn begin(&self, target: MutationTarget) -> Result<MutationGuard> {
        let mut states = self.lock();
        if states.get(&target).is_some_and(MutationState::is_submitting) {
            return Err(Error::MutationInFlight(target.to_string()));
        }
        states.insert(target.clone(), MutationState::Submitting);
        Ok(MutationGuard {
            tracker: self.clone(),
            target,
            finished: false,
        })
    }

    #[must_use]
    pub fn state(&self, target: &MutationTarget) -> MutationState {
        self.lock().get(target).cloned().unwrap_or_default()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// A claimed submission slot.
///
/// Dropping the guard without finishing returns the target to `Idle`, so a
/// caller that goes away mid-flight never leaves the slot locked.
#[derive(Debug)]
pub struct MutationGuard {
    tracker: MutationTracker,
    target: MutationTarget,
    finished: bool,
}

impl MutationGuard {
    #[must_use]
    pub const fn target(&self) -> &MutationTarget {
        &self.target
    }

    pub fn commit(mut self) {
        self.finish(MutationState::Committed);
    }

    pub fn fail(mut self, error: &Error) {
        self.finish(MutationState::Failed(error.user_message()));
    }

    fn finish(&mut self, state: MutationState) {
        self.tracker.lock().insert(self.target.clone(), state);
        self.finished = true;
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.lock().remove(&self.target);
        }
    }
}
