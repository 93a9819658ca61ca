// 🔄 Status Lifecycle Controller
//
// Mediates every status transition:
//
//   not_started / in_progress  → single phase: persist, update cache, publish
//   go_live                    → request phase opens a confirmation carrying
//                                the entity and the list it came from; the
//                                commit phase validates both dates, then
//                                persists, updates cache, publishes
//
// Publish happens only after the store confirmed the write. A failed write
// leaves every cache untouched and nothing goes on the bus.

use crate::api::{DashboardOverview, RemoteStore, StatusUpdateRequest};
use crate::bus::{StatusBus, StatusChangeEvent};
use crate::entity::{EntityKey, GoLiveDates, ListKind};
use crate::error::{Result, TrackerError};
use crate::status::Status;
use crate::view::EntityListView;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Instrument;
use uuid::Uuid;

const GENERIC_PERSIST_ERROR: &str = "Failed to update status";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// TRANSITION TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Persisted and broadcast
    Committed(StatusChangeEvent),

    /// Terminal transition requested; nothing sent yet
    ConfirmationRequired(GoLiveConfirmation),
}

/// Open confirmation step for the terminal transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoLiveConfirmation {
    pub key: EntityKey,
    pub name: String,
    /// Where the operator returns afterwards
    pub list: ListKind,
    /// Status shown before the request, restored on cancel
    pub previous: Status,
}

/// Raw operator input at the confirmation step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoLiveForm {
    pub integration_date: String,
    pub onboarding_date: String,
}

impl GoLiveForm {
    pub fn new(integration_date: &str, onboarding_date: &str) -> Self {
        GoLiveForm {
            integration_date: integration_date.to_string(),
            onboarding_date: onboarding_date.to_string(),
        }
    }

    pub fn validate(&self) -> Result<GoLiveDates> {
        let integration = self.integration_date.trim();
        let onboarding = self.onboarding_date.trim();

        if integration.is_empty() || onboarding.is_empty() {
            return Err(TrackerError::Validation(
                "Both dates are required.".to_string(),
            ));
        }

        Ok(GoLiveDates {
            integration_date: parse_date("Integration date", integration)?,
            onboarding_date: parse_date("Onboarding date", onboarding)?,
        })
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        TrackerError::Validation(format!("{} must be a date in YYYY-MM-DD form.", field))
    })
}

// ============================================================================
// IN-FLIGHT TRACKING
// ============================================================================

/// Marks one entity busy until dropped
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<EntityKey>>,
    key: EntityKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(&self.key);
    }
}

fn lock(set: &Mutex<HashSet<EntityKey>>) -> MutexGuard<'_, HashSet<EntityKey>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// One per session, shared by every view. Keeps at most one persisting
/// request per entity in flight, across all views.
pub struct StatusController {
    store: Arc<dyn RemoteStore>,
    bus: StatusBus,
    in_flight: Mutex<HashSet<EntityKey>>,
    /// Overview piggybacked on the last commit that crossed go_live
    dashboard: Mutex<Option<DashboardOverview>>,
}

impl StatusController {
    pub fn new(store: Arc<dyn RemoteStore>, bus: StatusBus) -> Self {
        StatusController {
            store,
            bus,
            in_flight: Mutex::new(HashSet::new()),
            dashboard: Mutex::new(None),
        }
    }

    /// Fresh overview from the latest go_live commit, if one came back
    pub fn take_dashboard(&self) -> Option<DashboardOverview> {
        self.dashboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether the entity's control should render disabled
    pub fn is_in_flight(&self, key: EntityKey) -> bool {
        lock(&self.in_flight).contains(&key)
    }

    fn begin(&self, key: EntityKey) -> Result<InFlightGuard<'_>> {
        if !lock(&self.in_flight).insert(key) {
            return Err(TrackerError::InFlight(key));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            key,
        })
    }

    /// Operator picked `target` for the entity `key` shown in `view`
    pub async fn request_transition(
        &self,
        view: &EntityListView,
        key: EntityKey,
        target: Status,
    ) -> Result<TransitionOutcome> {
        let entity = view.entity(key).ok_or(TrackerError::NotFound(key))?;

        if self.is_in_flight(key) {
            return Err(TrackerError::InFlight(key));
        }
        if !entity.status.can_transition_to(target) {
            return Err(TrackerError::InvalidTransition {
                from: entity.status,
                to: target,
            });
        }

        if target.requires_confirmation() {
            tracing::info!(%key, list = view.list().route(), "go-live confirmation opened");
            return Ok(TransitionOutcome::ConfirmationRequired(GoLiveConfirmation {
                key,
                name: entity.name,
                list: view.list(),
                previous: entity.status,
            }));
        }

        let event = self
            .commit(view, key, StatusUpdateRequest::plain(target))
            .await?;
        Ok(TransitionOutcome::Committed(event))
    }

    /// Commit phase. Validation failures return before anything is sent.
    pub async fn confirm_go_live(
        &self,
        view: &EntityListView,
        confirmation: &GoLiveConfirmation,
        form: &GoLiveForm,
    ) -> Result<StatusChangeEvent> {
        let dates = form.validate()?;
        self.commit(view, confirmation.key, StatusUpdateRequest::go_live(dates))
            .await
    }

    /// Operator backed out. No remote call; returns the list to go back to.
    pub fn cancel_go_live(&self, confirmation: GoLiveConfirmation) -> ListKind {
        tracing::info!(key = %confirmation.key, "go-live confirmation cancelled");
        confirmation.list
    }

    async fn commit(
        &self,
        view: &EntityListView,
        key: EntityKey,
        update: StatusUpdateRequest,
    ) -> Result<StatusChangeEvent> {
        update.validate()?;
        let guard = self.begin(key)?;

        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("status_commit", %request_id, %key, status = %update.status);

        async move {
            let mut dashboard = None;
            let failure = match self.store.update_status(key, &update).await {
                Ok(response) if response.success => {
                    dashboard = response.dashboard;
                    None
                }
                Ok(response) => Some(
                    response
                        .error
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| GENERIC_PERSIST_ERROR.to_string()),
                ),
                Err(TrackerError::Persist(message)) => Some(message),
                Err(e) => Some(format!("{}: {}", GENERIC_PERSIST_ERROR, e)),
            };

            drop(guard);

            if let Some(message) = failure {
                tracing::warn!(error = %message, "status update failed");
                view.record_failure(&message);
                return Err(TrackerError::Persist(message));
            }

            if !view.apply_committed(key, update.status, update.dates()) {
                tracing::debug!("view unmounted before response; cache update dropped");
            }

            if dashboard.is_some() {
                *self.dashboard.lock().unwrap_or_else(PoisonError::into_inner) = dashboard;
            }

            let event = StatusChangeEvent::new(key, update.status);
            self.bus.publish(event);
            tracing::info!("status committed");
            Ok(event)
        }
        .instrument(span)
        .await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::testing::FakeStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn acme() -> Entity {
        let mut e = Entity::new(7, "Acme", Status::NotStarted);
        e.is_top_50 = true;
        e
    }

    fn setup(entities: Vec<Entity>) -> (Arc<FakeStore>, StatusBus, StatusController) {
        let store = Arc::new(FakeStore::new(entities));
        let bus = StatusBus::new();
        let controller = StatusController::new(store.clone(), bus.clone());
        (store, bus, controller)
    }

    fn count_publishes(bus: &StatusBus) -> (Arc<AtomicUsize>, crate::bus::Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let sub = bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, sub)
    }

    #[test]
    fn test_form_validation() {
        let blank = GoLiveForm::new("2024-01-10", "  ");
        let err = blank.validate().unwrap_err();
        assert_eq!(err.to_string(), "Both dates are required.");

        let malformed = GoLiveForm::new("10/01/2024", "2024-02-01");
        assert!(malformed.validate().unwrap_err().is_validation());

        let ok = GoLiveForm::new("2024-01-10", "2024-02-01").validate().unwrap();
        assert_eq!(ok.integration_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[tokio::test]
    async fn test_single_phase_transition_persists_and_publishes() {
        let (store, bus, controller) = setup(vec![acme()]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();
        let (published, _sub) = count_publishes(&bus);

        let outcome = controller
            .request_transition(&view, EntityKey(7), Status::InProgress)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Committed(StatusChangeEvent::new(EntityKey(7), Status::InProgress))
        );
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::InProgress));
        assert_eq!(store.updates(), vec![(EntityKey(7), StatusUpdateRequest::plain(Status::InProgress))]);
        assert_eq!(published.load(Ordering::SeqCst), 1);
        assert!(controller.take_dashboard().is_none());
        assert!(!controller.is_in_flight(EntityKey(7)));

        println!("✅ Single-phase transition test PASSED");
    }

    #[tokio::test]
    async fn test_go_live_scenario_syncs_second_view() {
        let (store, bus, controller) = setup(vec![acme()]);
        let billers = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        let top50 = EntityListView::mount(ListKind::Top50Billers, &bus, store.clone());
        billers.load().await.unwrap();
        top50.load().await.unwrap();
        let fetches = store.list_calls();
        let (published, _sub) = count_publishes(&bus);

        // Request phase: nothing reaches the store
        let outcome = controller
            .request_transition(&billers, EntityKey(7), Status::GoLive)
            .await
            .unwrap();
        let confirmation = match outcome {
            TransitionOutcome::ConfirmationRequired(c) => c,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(confirmation.list, ListKind::Billers);
        assert_eq!(confirmation.previous, Status::NotStarted);
        assert!(store.updates().is_empty());

        // Commit phase
        let form = GoLiveForm::new("2024-01-10", "2024-02-01");
        let event = controller
            .confirm_go_live(&billers, &confirmation, &form)
            .await
            .unwrap();

        assert_eq!(event, StatusChangeEvent::new(EntityKey(7), Status::GoLive));
        let (key, request) = store.updates().remove(0);
        assert_eq!(key, EntityKey(7));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "status": "go_live",
                "integration_date": "2024-01-10",
                "onboarding_date": "2024-02-01"
            })
        );

        assert_eq!(billers.status_of(EntityKey(7)), Some(Status::GoLive));
        assert_eq!(
            billers.entity(EntityKey(7)).unwrap().integration_date,
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(top50.status_of(EntityKey(7)), Some(Status::GoLive));
        assert_eq!(store.list_calls(), fetches, "second view must not refetch");
        assert_eq!(published.load(Ordering::SeqCst), 1);

        // Crossing go_live hands back a fresh overview, once
        let overview = controller.take_dashboard().unwrap();
        assert_eq!(overview.target_count, 1);
        assert!(controller.take_dashboard().is_none());

        println!("✅ Go-live scenario test PASSED");
    }

    #[tokio::test]
    async fn test_blank_date_sends_nothing() {
        let (store, bus, controller) = setup(vec![acme()]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();
        let (published, _sub) = count_publishes(&bus);

        let confirmation = GoLiveConfirmation {
            key: EntityKey(7),
            name: "Acme".to_string(),
            list: ListKind::Billers,
            previous: Status::NotStarted,
        };
        let err = controller
            .confirm_go_live(&view, &confirmation, &GoLiveForm::new("", "2024-02-01"))
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.updates().is_empty());
        assert_eq!(published.load(Ordering::SeqCst), 0);
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::NotStarted));
    }

    #[tokio::test]
    async fn test_cancel_leaves_everything_unchanged() {
        let (store, bus, controller) = setup(vec![acme()]);
        let billers = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        let top50 = EntityListView::mount(ListKind::Top50Billers, &bus, store.clone());
        billers.load().await.unwrap();
        top50.load().await.unwrap();

        let outcome = controller
            .request_transition(&top50, EntityKey(7), Status::GoLive)
            .await
            .unwrap();
        let TransitionOutcome::ConfirmationRequired(confirmation) = outcome else {
            panic!("expected confirmation");
        };

        assert_eq!(controller.cancel_go_live(confirmation), ListKind::Top50Billers);
        assert!(store.updates().is_empty());
        assert_eq!(billers.status_of(EntityKey(7)), Some(Status::NotStarted));
        assert_eq!(top50.status_of(EntityKey(7)), Some(Status::NotStarted));
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_state_unchanged() {
        let (store, bus, controller) = setup(vec![acme()]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();
        let (published, _sub) = count_publishes(&bus);

        store.reject_next_update("Biller not found");
        let err = controller
            .request_transition(&view, EntityKey(7), Status::InProgress)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Biller not found");
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::NotStarted));
        assert_eq!(view.error().as_deref(), Some("Biller not found"));
        assert_eq!(published.load(Ordering::SeqCst), 0);
        assert!(!controller.is_in_flight(EntityKey(7)));
    }

    #[tokio::test]
    async fn test_rejected_go_live_confirmation_changes_nothing() {
        let (store, bus, controller) = setup(vec![acme()]);
        let billers = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        let top50 = EntityListView::mount(ListKind::Top50Billers, &bus, store.clone());
        billers.load().await.unwrap();
        top50.load().await.unwrap();
        let (published, _sub) = count_publishes(&bus);

        let outcome = controller
            .request_transition(&billers, EntityKey(7), Status::GoLive)
            .await
            .unwrap();
        let TransitionOutcome::ConfirmationRequired(confirmation) = outcome else {
            panic!("expected confirmation");
        };

        store.reject_next_update("Onboarding date precedes integration");
        let err = controller
            .confirm_go_live(&billers, &confirmation, &GoLiveForm::new("2024-01-10", "2024-02-01"))
            .await
            .unwrap_err();

        assert!(matches!(err, TrackerError::Persist(_)));
        assert_eq!(store.updates().len(), 1);
        assert_eq!(billers.status_of(EntityKey(7)), Some(Status::NotStarted));
        assert_eq!(top50.status_of(EntityKey(7)), Some(Status::NotStarted));
        assert_eq!(billers.entity(EntityKey(7)).unwrap().integration_date, None);
        assert_eq!(
            billers.error().as_deref(),
            Some("Onboarding date precedes integration")
        );
        assert_eq!(top50.error(), None);
        assert_eq!(published.load(Ordering::SeqCst), 0);
        assert!(controller.take_dashboard().is_none());

        println!("✅ Rejected go-live confirmation test PASSED");
    }

    #[tokio::test]
    async fn test_rejection_without_message_uses_generic() {
        let (store, bus, controller) = setup(vec![acme()]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();

        store.reject_next_update("");
        let err = controller
            .request_transition(&view, EntityKey(7), Status::InProgress)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), GENERIC_PERSIST_ERROR);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_state_unchanged() {
        let (store, bus, controller) = setup(vec![acme()]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();

        store.drop_next_update("network unreachable");
        assert!(controller
            .request_transition(&view, EntityKey(7), Status::InProgress)
            .await
            .is_err());
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::NotStarted));

        // Successful retry clears the error
        controller
            .request_transition(&view, EntityKey(7), Status::InProgress)
            .await
            .unwrap();
        assert_eq!(view.error(), None);
    }

    #[tokio::test]
    async fn test_same_status_still_round_trips() {
        let mut e = acme();
        e.status = Status::InProgress;
        let (store, bus, controller) = setup(vec![e]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();

        controller
            .request_transition(&view, EntityKey(7), Status::InProgress)
            .await
            .unwrap();

        assert_eq!(store.updates().len(), 1);
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::InProgress));
    }

    #[tokio::test]
    async fn test_no_transition_out_of_go_live() {
        let mut e = acme();
        e.status = Status::GoLive;
        let (store, bus, controller) = setup(vec![e]);
        let view = EntityListView::mount(ListKind::Billers, &bus, store.clone());
        view.load().await.unwrap();

        let err = controller
            .request_transition(&view, EntityKey(7), Status::NotStarted)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidTransition { .. }));
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_second_request_while_in_flight_is_refused() {
        let mut other = Entity::new(8, "Other", Status::NotStarted);
        other.category = Some("Utilities".to_string());
        let store = Arc::new(FakeStore::gated(vec![acme(), other]));
        let bus = StatusBus::new();
        let controller = Arc::new(StatusController::new(store.clone(), bus.clone()));
        let view = Arc::new(EntityListView::mount(ListKind::Billers, &bus, store.clone()));
        view.load().await.unwrap();

        let (c, v) = (Arc::clone(&controller), Arc::clone(&view));
        let first = tokio::spawn(async move {
            c.request_transition(&v, EntityKey(7), Status::InProgress).await
        });

        while !controller.is_in_flight(EntityKey(7)) {
            tokio::task::yield_now().await;
        }

        let err = controller
            .request_transition(&view, EntityKey(7), Status::NotStarted)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InFlight(EntityKey(7))));
        // Other entities are not blocked
        assert!(!controller.is_in_flight(EntityKey(8)));

        store.release(1);
        first.await.unwrap().unwrap();
        assert!(!controller.is_in_flight(EntityKey(7)));
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::InProgress));
    }

    #[tokio::test]
    async fn test_response_after_unmount_is_tolerated() {
        let store = Arc::new(FakeStore::gated(vec![acme()]));
        let bus = StatusBus::new();
        let controller = Arc::new(StatusController::new(store.clone(), bus.clone()));
        let view = Arc::new(EntityListView::mount(ListKind::Billers, &bus, store.clone()));
        view.load().await.unwrap();

        let other = EntityListView::mount(ListKind::Top50Billers, &bus, store.clone());
        other.load().await.unwrap();

        let (c, v) = (Arc::clone(&controller), Arc::clone(&view));
        let pending = tokio::spawn(async move {
            c.request_transition(&v, EntityKey(7), Status::InProgress).await
        });
        while !controller.is_in_flight(EntityKey(7)) {
            tokio::task::yield_now().await;
        }

        view.unmount();
        store.release(1);

        // Remote write succeeded: still broadcast, unmounted cache untouched
        pending.await.unwrap().unwrap();
        assert_eq!(view.status_of(EntityKey(7)), Some(Status::NotStarted));
        assert_eq!(other.status_of(EntityKey(7)), Some(Status::InProgress));
        assert_eq!(store.stored(EntityKey(7)).unwrap().status, Status::InProgress);
    }
}
