// 📋 Entity List View
//
// A mounted presentation unit: owns a transient cache of one collection,
// a local name filter, and a bus subscription that keeps the cache in step
// with status changes made anywhere else. Unmounting cancels the view's
// token; late responses check it and are dropped instead of applied.
//
// Loads are numbered. Only the newest load's response is stored, and any
// bus events that arrived while it was outstanding are replayed onto the
// fetched rows first, so a slow fetch never undoes a broadcast status.

use crate::api::RemoteStore;
use crate::bus::{StatusBus, StatusChangeEvent, Subscription};
use crate::entity::{Entity, EntityKey, GoLiveDates, ListKind};
use crate::error::{Result, TrackerError};
use crate::status::{Status, StatusCounts};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

// ============================================================================
// VIEW STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient toast-style message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Default)]
struct ViewState {
    entities: Vec<Entity>,
    filter: String,
    load: LoadState,
    error: Option<String>,
    notice: Option<Notice>,
    generation: u64,
    loads_in_flight: usize,
    /// Bus events seen while any load is outstanding
    missed: Vec<StatusChangeEvent>,
}

fn lock(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One outstanding load. The last ticket dropped clears the replay log.
struct LoadTicket<'a> {
    state: &'a Mutex<ViewState>,
    generation: u64,
    replay_from: usize,
}

impl Drop for LoadTicket<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        if state.loads_in_flight == 0 {
            state.missed.clear();
        }
    }
}

/// Apply one bus event to a cache. Only rows with the event's key change.
pub fn reconcile(entities: &mut [Entity], event: &StatusChangeEvent) -> usize {
    let mut touched = 0;
    for entity in entities.iter_mut().filter(|e| e.id == event.key) {
        entity.apply_status(event.status, None);
        touched += 1;
    }
    touched
}

// ============================================================================
// ENTITY LIST VIEW
// ============================================================================

pub struct EntityListView {
    list: ListKind,
    store: Arc<dyn RemoteStore>,
    state: Arc<Mutex<ViewState>>,
    mounted: CancellationToken,
    subscription: Subscription,
}

impl EntityListView {
    /// Subscribe to the bus and return an empty view; call `load` to fetch
    pub fn mount(list: ListKind, bus: &StatusBus, store: Arc<dyn RemoteStore>) -> Self {
        let state = Arc::new(Mutex::new(ViewState::default()));

        let handler_state = Arc::clone(&state);
        let subscription = bus.subscribe(move |event| {
            let mut state = lock(&handler_state);
            if state.loads_in_flight > 0 {
                state.missed.push(*event);
            }
            let touched = reconcile(&mut state.entities, event);
            if touched > 0 {
                tracing::debug!(list = list.route(), key = %event.key, status = %event.status, "view reconciled");
            }
        });

        tracing::debug!(list = list.route(), "view mounted");

        EntityListView {
            list,
            store,
            state,
            mounted: CancellationToken::new(),
            subscription,
        }
    }

    pub fn list(&self) -> ListKind {
        self.list
    }

    pub fn is_mounted(&self) -> bool {
        !self.mounted.is_cancelled()
    }

    /// Release the subscription and discard anything that arrives later
    pub fn unmount(&self) {
        self.mounted.cancel();
        self.subscription.unsubscribe();
        tracing::debug!(list = self.list.route(), "view unmounted");
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Fetch the collection. An empty unfiltered collection is a failure:
    /// an empty table must never pass for an authoritative answer.
    /// A response overtaken by a newer load is dropped and returns `Ok(0)`.
    pub async fn load(&self) -> Result<usize> {
        if !self.is_mounted() {
            return Ok(0);
        }

        let (ticket, search) = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.loads_in_flight += 1;
            state.load = LoadState::Loading;
            state.error = None;
            let ticket = LoadTicket {
                state: &self.state,
                generation: state.generation,
                replay_from: state.missed.len(),
            };
            let search = self
                .list
                .searches_remotely()
                .then(|| state.filter.clone())
                .filter(|f| !f.trim().is_empty());
            (ticket, search)
        };

        let query = self.list.query(search.as_deref());
        let result = self.store.list_entities(&query).await;

        if !self.is_mounted() {
            tracing::debug!(list = self.list.route(), "discarding load response after unmount");
            return Ok(0);
        }

        let result = match result {
            Ok(entities) if entities.is_empty() && query.search_term().is_none() => Err(
                TrackerError::load(self.list.title(), "No data available"),
            ),
            other => other,
        };

        let mut state = lock(&self.state);
        if state.generation != ticket.generation {
            tracing::debug!(
                list = self.list.route(),
                generation = ticket.generation,
                "discarding superseded load response"
            );
            return Ok(0);
        }

        match result {
            Ok(mut entities) => {
                let mut replayed = 0;
                for event in &state.missed[ticket.replay_from..] {
                    replayed += reconcile(&mut entities, event);
                }
                let count = entities.len();
                tracing::info!(list = self.list.route(), count, replayed, "view loaded");
                state.entities = entities;
                state.load = LoadState::Ready;
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(list = self.list.route(), error = %e, "view load failed");
                state.load = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn retry(&self) -> Result<usize> {
        self.load().await
    }

    /// Local name filter; no network
    pub fn set_filter(&self, query: &str) {
        lock(&self.state).filter = query.to_string();
    }

    /// Billers search server-side; every other list filters what it holds
    pub async fn search(&self, query: &str) -> Result<usize> {
        self.set_filter(query);
        if self.list.searches_remotely() {
            self.load().await
        } else {
            Ok(self.rows().len())
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Rows passing the current filter
    pub fn rows(&self) -> Vec<Entity> {
        let state = lock(&self.state);
        state
            .entities
            .iter()
            .filter(|e| e.matches_search(&state.filter))
            .cloned()
            .collect()
    }

    pub fn entity(&self, key: EntityKey) -> Option<Entity> {
        lock(&self.state).entities.iter().find(|e| e.id == key).cloned()
    }

    pub fn status_of(&self, key: EntityKey) -> Option<Status> {
        self.entity(key).map(|e| e.status)
    }

    pub fn filter(&self) -> String {
        lock(&self.state).filter.clone()
    }

    pub fn load_state(&self) -> LoadState {
        lock(&self.state).load.clone()
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub fn take_notice(&self) -> Option<Notice> {
        lock(&self.state).notice.take()
    }

    /// Footer totals over the visible rows
    pub fn counts(&self) -> StatusCounts {
        let rows = self.rows();
        StatusCounts::tally(rows.iter().map(|e| &e.status))
    }

    // ------------------------------------------------------------------------
    // Writes from the lifecycle controller
    // ------------------------------------------------------------------------

    /// Returns false when the view is gone and the update was dropped
    pub(crate) fn apply_committed(
        &self,
        key: EntityKey,
        status: Status,
        dates: Option<GoLiveDates>,
    ) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let mut state = lock(&self.state);
        for entity in state.entities.iter_mut().filter(|e| e.id == key) {
            entity.apply_status(status, dates);
        }
        state.error = None;
        state.notice = Some(Notice {
            kind: NoticeKind::Success,
            message: "Status updated successfully".to_string(),
        });
        true
    }

    pub(crate) fn record_failure(&self, message: &str) {
        if !self.is_mounted() {
            return;
        }
        let mut state = lock(&self.state);
        state.error = Some(message.to_string());
        state.notice = Some(Notice {
            kind: NoticeKind::Error,
            message: message.to_string(),
        });
    }
}

impl Drop for EntityListView {
    fn drop(&mut self) {
        self.mounted.cancel();
    }
}

// ============================================================================
// TESTS
// ============================================================================
