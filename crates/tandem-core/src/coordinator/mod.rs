//! Mutation coordinator.
//!
//! Orchestrates every user-initiated change as validate, call the gateway,
//! then reconcile the local store. Failures are turned into notices here and
//! leave the store exactly as it was. Reads go through the same shared store
//! so views always reflect confirmed state only.

mod mutation;

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{AuthBackend, AuthResult};
use crate::config::{ClientConfig, DEFAULT_PHOTO_BUCKET};
use crate::error::{Error, Result};
use crate::gateway::{parse_row, parse_rows, Filter, Gateway, SupabaseGateway};
use crate::models::{
    Draft, Entity, EntityKind, Event, Goal, GoalId, GoalPatch, Milestone, MilestoneId,
    MilestonePatch, Patch, Photo, PhotoDraft, PhotoId,
};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::projection::{
    self, goal_stats, goals_in_tab, project, DaySelection, GoalCriteria, GoalStats, GoalStatus,
    MilestoneCriteria,
};
use crate::session::{Session, SessionHandle};
use crate::store::{Store, Stored};

use self::mutation::Action;
pub use self::mutation::{MutationGuard, MutationState, MutationTarget, MutationTracker};

/// Result of a delete request.
///
/// The entity stays in every view until the gateway confirms the delete.
#[derive(Debug)]
pub enum DeleteOutcome<T> {
    /// Confirmed by the gateway; carries the cached copy if there was one
    Removed(Option<T>),
    /// The delete did not take effect
    StillPresent(Error),
}

impl<T> DeleteOutcome<T> {
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            Self::Removed(entity) => Ok(entity),
            Self::StillPresent(error) => Err(error),
        }
    }
}

/// Shared entry point for loads, mutations and views.
#[derive(Clone)]
pub struct MutationCoordinator {
    gateway: Arc<dyn Gateway>,
    store: Arc<Mutex<Store>>,
    tracker: MutationTracker,
    notifier: Arc<dyn Notifier>,
    photo_bucket: String,
}

impl MutationCoordinator {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            store: Arc::new(Mutex::new(Store::new())),
            tracker: MutationTracker::new(),
            notifier: Arc::new(TracingNotifier),
            photo_bucket: DEFAULT_PHOTO_BUCKET.to_string(),
        }
    }

    /// Coordinator over the hosted backend, authorized by `session`.
    pub fn connect(config: &ClientConfig, session: SessionHandle) -> Result<Self> {
        let gateway = SupabaseGateway::new(config, session)?;
        Ok(Self::new(Arc::new(gateway)).with_photo_bucket(config.photo_bucket.clone()))
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_photo_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.photo_bucket = bucket.into();
        self
    }

    // Loads

    /// Replace the cached collection of `T` with a fresh fetch.
    pub async fn load<T: Stored>(&self) -> Result<Vec<T>> {
        tracing::debug!("Loading {} collection", T::KIND);
        match self.fetch::<T>(&T::load_filter()).await {
            Ok(rows) => {
                let mut store = self.store.lock().await;
                let loaded = store.collection_mut::<T>().load(rows).to_vec();
                tracing::info!("Loaded {} {} rows", loaded.len(), T::KIND);
                Ok(loaded)
            }
            Err(error) => Err(self.load_failed(T::KIND, error)),
        }
    }

    /// Load events, goals and milestones concurrently.
    pub async fn load_all(&self) -> Result<()> {
        tokio::try_join!(
            self.load::<Event>(),
            self.load::<Goal>(),
            self.load::<Milestone>()
        )?;
        Ok(())
    }

    /// Load the gallery of one milestone, replacing the cached photos.
    pub async fn load_photos(&self, milestone_id: MilestoneId) -> Result<Vec<Photo>> {
        let filter =
            <Photo as Stored>::load_filter().eq("milestone_id", milestone_id.to_string());
        match self.fetch::<Photo>(&filter).await {
            Ok(rows) => {
                let mut store = self.store.lock().await;
                Ok(store.photos.load(rows).to_vec())
            }
            Err(error) => Err(self.load_failed(EntityKind::Photo, error)),
        }
    }

    /// Fetch one milestone by id for its detail view and cache it.
    ///
    /// A missing row is `NotFound`, which sends the view back to the list.
    pub async fn fetch_milestone(&self, id: MilestoneId) -> Result<Milestone> {
        let filter = Filter::all().eq("id", id.to_string());
        let fetched = match self.fetch::<Milestone>(&filter).await {
            Ok(rows) => rows.into_iter().next(),
            Err(error) => return Err(self.load_failed(EntityKind::Milestone, error)),
        };
        let Some(milestone) = fetched else {
            tracing::debug!("Milestone {} not found", id);
            return Err(Error::NotFound(format!("milestone {id}")));
        };
        self.store
            .lock()
            .await
            .milestones
            .apply_create(milestone.clone());
        Ok(milestone)
    }

    async fn fetch<T: Entity>(&self, filter: &Filter) -> Result<Vec<T>> {
        let rows = self.gateway.select(T::KIND, filter).await?;
        Ok(parse_rows(rows))
    }

    // Mutations

    pub async fn create<T: Stored>(&self, draft: T::Draft) -> Result<T> {
        let draft = match draft.prepare() {
            Ok(draft) => draft,
            Err(error) => return Err(self.rejected(T::KIND, Action::Create, error)),
        };
        let guard = self.tracker.begin(MutationTarget::create(T::KIND))?;
        tracing::debug!("Creating {}", T::KIND);

        let result: Result<T> = async {
            let fields = serde_json::to_value(&draft)?;
            let row = self.gateway.insert(T::KIND, fields).await?;
            parse_row::<T>(row)
        }
        .await;

        match result {
            Ok(entity) => {
                self.store
                    .lock()
                    .await
                    .collection_mut::<T>()
                    .apply_create(entity.clone());
                self.committed(guard, T::KIND, Action::Create);
                Ok(entity)
            }
            Err(error) => Err(self.failed(guard, T::KIND, Action::Create, error)),
        }
    }

    /// Update a cached entity. Unknown ids fail with `NotFound` without a
    /// gateway call.
    pub async fn update<T: Stored>(&self, id: T::Id, patch: T::Patch) -> Result<T> {
        let patch = match patch.prepare() {
            Ok(patch) => patch,
            Err(error) => return Err(self.rejected(T::KIND, Action::Update, error)),
        };
        if !self.store.lock().await.collection::<T>().contains(id) {
            let error = Error::NotFound(format!("{} {id}", T::KIND));
            return Err(self.rejected(T::KIND, Action::Update, error));
        }
        let guard = self.tracker.begin(MutationTarget::entity(T::KIND, id))?;
        self.submit_update::<T>(guard, id, patch).await
    }

    /// Flip a goal's completed flag, reading the value only once the
    /// submission slot is held.
    pub async fn toggle_goal_completed(&self, id: GoalId) -> Result<Goal> {
        let guard = self
            .tracker
            .begin(MutationTarget::entity(EntityKind::Goal, id))?;
        let current = self.store.lock().await.goals.get(id).map(|goal| goal.completed);
        let Some(completed) = current else {
            let error = Error::NotFound(format!("goal {id}"));
            return Err(self.failed(guard, EntityKind::Goal, Action::Update, error));
        };
        let patch = GoalPatch::completion(!completed, Utc::now());
        self.submit_update::<Goal>(guard, id, patch).await
    }

    pub async fn toggle_milestone_favorite(&self, id: MilestoneId) -> Result<Milestone> {
        let guard = self
            .tracker
            .begin(MutationTarget::entity(EntityKind::Milestone, id))?;
        let current = self
            .store
            .lock()
            .await
            .milestones
            .get(id)
            .map(|milestone| milestone.is_favorite);
        let Some(is_favorite) = current else {
            let error = Error::NotFound(format!("milestone {id}"));
            return Err(self.failed(guard, EntityKind::Milestone, Action::Update, error));
        };
        self.submit_update::<Milestone>(guard, id, MilestonePatch::favorite(!is_favorite))
            .await
    }

    async fn submit_update<T: Stored>(
        &self,
        guard: MutationGuard,
        id: T::Id,
        patch: T::Patch,
    ) -> Result<T> {
        let patch = T::before_update(patch, Utc::now());
        tracing::debug!("Updating {} {}", T::KIND, id);

        let result: Result<T> = async {
            let fields = serde_json::to_value(&patch)?;
            let row = self.gateway.update(T::KIND, &id.to_string(), fields).await?;
            parse_row::<T>(row)
        }
        .await;

        match result {
            Ok(remote) => {
                let entity = {
                    let mut store = self.store.lock().await;
                    store
                        .collection_mut::<T>()
                        .apply_update(id, &patch)
                        .cloned()
                        .unwrap_or(remote)
                };
                self.committed(guard, T::KIND, Action::Update);
                Ok(entity)
            }
            Err(error) => Err(self.failed(guard, T::KIND, Action::Update, error)),
        }
    }

    /// Delete by id. The cached entity is removed only after the gateway
    /// confirms; removing a milestone also drops its cached photos.
    pub async fn delete<T: Stored>(&self, id: T::Id) -> DeleteOutcome<T> {
        let guard = match self.tracker.begin(MutationTarget::entity(T::KIND, id)) {
            Ok(guard) => guard,
            Err(error) => return DeleteOutcome::StillPresent(error),
        };
        tracing::debug!("Deleting {} {}", T::KIND, id);

        match self.gateway.delete(T::KIND, &id.to_string()).await {
            Ok(()) => {
                let removed = self.store.lock().await.remove::<T>(id);
                self.committed(guard, T::KIND, Action::Delete);
                DeleteOutcome::Removed(removed)
            }
            Err(error) => {
                DeleteOutcome::StillPresent(self.failed(guard, T::KIND, Action::Delete, error))
            }
        }
    }

    /// Upload an image into the photo bucket and attach it to a milestone.
    pub async fn add_photo(
        &self,
        milestone_id: MilestoneId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<String>,
    ) -> Result<Photo> {
        if bytes.is_empty() {
            let error = Error::Validation("Choose a photo to upload".to_string());
            return Err(self.rejected(EntityKind::Photo, Action::Create, error));
        }
        let guard = self.tracker.begin(MutationTarget::create(EntityKind::Photo))?;
        let path = photo_path(milestone_id, file_name);
        let content_type = mime_guess::from_path(file_name).first_or_octet_stream();
        tracing::debug!("Uploading {} ({} bytes)", path, bytes.len());

        let result: Result<Photo> = async {
            let stored = self
                .gateway
                .upload_blob(
                    &self.photo_bucket,
                    &path,
                    bytes,
                    Some(content_type.essence_str()),
                )
                .await?;
            let draft = PhotoDraft {
                milestone_id,
                photo_url: self.gateway.public_url(&self.photo_bucket, &stored),
                caption,
            }
            .prepare()?;
            let row = self
                .gateway
                .insert(EntityKind::Photo, serde_json::to_value(&draft)?)
                .await?;
            parse_row::<Photo>(row)
        }
        .await;

        match result {
            Ok(photo) => {
                self.store.lock().await.photos.apply_create(photo.clone());
                self.committed(guard, EntityKind::Photo, Action::Create);
                Ok(photo)
            }
            Err(error) => Err(self.failed(guard, EntityKind::Photo, Action::Create, error)),
        }
    }

    pub async fn delete_photo(&self, id: PhotoId) -> DeleteOutcome<Photo> {
        self.delete::<Photo>(id).await
    }

    // Views

    /// Goals matching `criteria`, memoized until the goals or the criteria
    /// change.
    pub async fn goals_view(&self, criteria: &GoalCriteria) -> Vec<Goal> {
        let mut store = self.store.lock().await;
        let Store {
            goals, goal_views, ..
        } = &mut *store;
        goal_views.get_or_compute(goals, criteria, project).to_vec()
    }

    pub async fn goals_tab(&self, criteria: &GoalCriteria, tab: GoalStatus) -> Vec<Goal> {
        goals_in_tab(&self.goals_view(criteria).await, tab)
    }

    /// Completion statistics over every cached goal.
    pub async fn goal_stats(&self) -> GoalStats {
        goal_stats(self.store.lock().await.goals.items())
    }

    pub async fn milestones_view(&self, criteria: &MilestoneCriteria) -> Vec<Milestone> {
        let mut store = self.store.lock().await;
        let Store {
            milestones,
            milestone_views,
            ..
        } = &mut *store;
        milestone_views
            .get_or_compute(milestones, criteria, project)
            .to_vec()
    }

    pub async fn milestone(&self, id: MilestoneId) -> Option<Milestone> {
        self.store.lock().await.milestones.get(id).cloned()
    }

    /// Cached photos of one milestone, newest first.
    pub async fn photos_for(&self, milestone_id: MilestoneId) -> Vec<Photo> {
        self.store
            .lock()
            .await
            .photos
            .items()
            .iter()
            .filter(|photo| photo.milestone_id == milestone_id)
            .cloned()
            .collect()
    }

    pub async fn events_for_date(&self, date: NaiveDate) -> Vec<Event> {
        projection::events_for_date(self.store.lock().await.events.items(), date)
    }

    pub async fn select_day(&self, date: NaiveDate) -> DaySelection {
        projection::select_day(self.store.lock().await.events.items(), date)
    }

    pub async fn days_with_events(&self, month: NaiveDate) -> Vec<NaiveDate> {
        projection::days_with_events(self.store.lock().await.events.items(), month)
            .into_iter()
            .collect()
    }

    /// Copy of the cached collection of `T`, in natural order.
    pub async fn snapshot<T: Stored>(&self) -> Vec<T> {
        self.store.lock().await.collection::<T>().items().to_vec()
    }

    #[must_use]
    pub fn state(&self, target: &MutationTarget) -> MutationState {
        self.tracker.state(target)
    }

    /// Sign out and drop every cached row, even when the remote sign-out
    /// fails, so the next user starts from an empty store.
    pub async fn sign_out<A: AuthBackend>(&self, session: &Session<A>) -> AuthResult<()> {
        let result = session.sign_out().await;
        self.clear().await;
        result
    }

    /// Drop every cached row and mutation state.
    pub async fn clear(&self) {
        self.store.lock().await.clear();
        self.tracker.clear();
        tracing::debug!("Cleared local store");
    }

    // Outcome reporting

    fn committed(&self, guard: MutationGuard, kind: EntityKind, action: Action) {
        tracing::info!("{} committed", guard.target());
        guard.commit();
        self.notifier.notify(Notice::success(
            format!("{} {}", capitalized(kind), action.past()),
            format!("Your {kind} has been {}.", action.past()),
        ));
    }

    fn failed(
        &self,
        guard: MutationGuard,
        kind: EntityKind,
        action: Action,
        error: Error,
    ) -> Error {
        tracing::warn!("Failed to {} {}: {}", action.verb(), guard.target(), error);
        guard.fail(&error);
        self.notify_error(kind, action, &error);
        error
    }

    /// Report an error caught before any submission started.
    fn rejected(&self, kind: EntityKind, action: Action, error: Error) -> Error {
        tracing::debug!("Rejected {} {}: {}", action.verb(), kind, error);
        self.notify_error(kind, action, &error);
        error
    }

    fn load_failed(&self, kind: EntityKind, error: Error) -> Error {
        tracing::warn!("Failed to load {}: {}", kind.collection(), error);
        self.notifier.notify(Notice::error(
            format!("Could not load {kind}s"),
            error.user_message(),
        ));
        error
    }

    fn notify_error(&self, kind: EntityKind, action: Action, error: &Error) {
        self.notifier.notify(Notice::error(
            format!("Could not {} {kind}", action.verb()),
            error.user_message(),
        ));
    }
}

fn capitalized(kind: EntityKind) -> String {
    let label = kind.to_string();
    let mut chars = label.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Object path of a new milestone photo: `milestone-photos/{milestone}-{random}.{ext}`.
fn photo_path(milestone_id: MilestoneId, file_name: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map_or_else(|| "jpg".to_string(), str::to_ascii_lowercase);
    format!(
        "milestone-photos/{milestone_id}-{}.{extension}",
        Uuid::new_v4().simple()
    )
}
