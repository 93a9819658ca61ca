// In-memory RemoteStore for unit tests: scripted failures, call recording,
// an optional gate that holds status updates until released, and held list
// calls that snapshot their rows and wait for `release_list`.

use crate::api::{
    DashboardOverview, RemoteStore, StatusHistoryEntry, StatusUpdateRequest, StatusUpdateResponse,
};
use crate::entity::{CountScope, Entity, EntityKey, EntityQuery};
use crate::error::{Result, TrackerError};
use crate::status::StatusCounts;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

#[derive(Default)]
pub struct FakeStore {
    entities: Mutex<Vec<Entity>>,
    updates: Mutex<Vec<(EntityKey, StatusUpdateRequest)>>,
    last_query: Mutex<Option<EntityQuery>>,
    list_calls: AtomicUsize,
    fail_list: Mutex<Option<String>>,
    reject_update: Mutex<Option<String>>,
    transport_error: Mutex<Option<String>>,
    gate: Option<Semaphore>,
    held_lists: AtomicUsize,
    list_release: Notify,
}

impl FakeStore {
    pub fn new(entities: Vec<Entity>) -> Self {
        FakeStore {
            entities: Mutex::new(entities),
            ..FakeStore::default()
        }
    }

    /// Status updates block until `release` is called
    pub fn gated(entities: Vec<Entity>) -> Self {
        FakeStore {
            entities: Mutex::new(entities),
            gate: Some(Semaphore::new(0)),
            ..FakeStore::default()
        }
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    /// The next `count` list calls take their snapshot, then wait
    pub fn hold_next_lists(&self, count: usize) {
        self.held_lists.store(count, Ordering::SeqCst);
    }

    /// Let the oldest held list call answer
    pub fn release_list(&self) {
        self.list_release.notify_one();
    }

    pub fn fail_next_list(&self, message: &str) {
        *self.fail_list.lock().unwrap() = Some(message.to_string());
    }

    /// Next update answers `{success: false, error}`
    pub fn reject_next_update(&self, message: &str) {
        *self.reject_update.lock().unwrap() = Some(message.to_string());
    }

    /// Next update never reaches the store
    pub fn drop_next_update(&self, message: &str) {
        *self.transport_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn updates(&self) -> Vec<(EntityKey, StatusUpdateRequest)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<EntityQuery> {
        self.last_query.lock().unwrap().clone()
    }

    pub fn stored(&self, key: EntityKey) -> Option<Entity> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == key)
            .cloned()
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query.clone());

        if let Some(message) = self.fail_list.lock().unwrap().take() {
            return Err(TrackerError::load("entities", message));
        }

        let rows: Vec<Entity> = {
            let entities = self.entities.lock().unwrap();
            entities
                .iter()
                .filter(|e| !query.top_50 || e.is_top_50)
                .filter(|e| match query.category_filter() {
                    Some(c) => e.category.as_deref() == Some(c),
                    None => true,
                })
                .filter(|e| query.search_term().map_or(true, |s| e.matches_search(s)))
                .cloned()
                .collect()
        };

        let held = self
            .held_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if held {
            self.list_release.notified().await;
        }

        Ok(rows)
    }

    async fn status_counts(&self, scope: &CountScope) -> Result<StatusCounts> {
        let entities = self.entities.lock().unwrap();
        let statuses: Vec<_> = entities
            .iter()
            .filter(|e| match scope.category_filter() {
                Some(c) => e.category.as_deref() == Some(c),
                None => true,
            })
            .filter(|e| !scope.top_50 || e.is_top_50)
            .map(|e| e.status)
            .collect();
        Ok(StatusCounts::tally(&statuses))
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let entities = self.entities.lock().unwrap();
        let mut categories: Vec<String> =
            entities.iter().filter_map(|e| e.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn update_status(
        &self,
        key: EntityKey,
        update: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse> {
        self.updates.lock().unwrap().push((key, update.clone()));

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if let Some(message) = self.transport_error.lock().unwrap().take() {
            return Err(TrackerError::Persist(message));
        }
        if let Some(message) = self.reject_update.lock().unwrap().take() {
            return Ok(StatusUpdateResponse {
                success: false,
                error: Some(message),
                ..StatusUpdateResponse::default()
            });
        }

        let mut entities = self.entities.lock().unwrap();
        let entity = entities
            .iter_mut()
            .find(|e| e.id == key)
            .ok_or(TrackerError::NotFound(key))?;
        let crossed = entity.status.is_terminal() != update.status.is_terminal();
        entity.apply_status(update.status, update.dates());
        let data = entity.clone();

        Ok(StatusUpdateResponse {
            success: true,
            data: Some(data),
            dashboard: crossed.then(|| overview_of(&entities)),
            ..StatusUpdateResponse::default()
        })
    }

    async fn dashboard_overview(&self) -> Result<DashboardOverview> {
        Ok(overview_of(&self.entities.lock().unwrap()))
    }

    async fn status_history(&self, _key: EntityKey) -> Result<Vec<StatusHistoryEntry>> {
        Ok(Vec::new())
    }
}

fn overview_of(entities: &[Entity]) -> DashboardOverview {
    let unavailable = |category: &str| {
        entities
            .iter()
            .filter(|e| e.category.as_deref() == Some(category))
            .filter(|e| !e.status.is_terminal())
            .count() as i64
    };
    DashboardOverview {
        target_count: entities.len() as i64,
        unavailable_isp: unavailable("ISP"),
        unavailable_mfi: unavailable("MFI"),
        ..DashboardOverview::default()
    }
}
