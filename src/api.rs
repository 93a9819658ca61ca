// 🔌 Remote API Contracts
// Wire types for the entity store and the `RemoteStore` seam every view and
// the lifecycle controller talk through. Implemented over HTTP by
// `client::HttpStore` and over an embedded SQLite file by `db::SqliteStore`.

use crate::entity::{CountScope, Entity, EntityKey, EntityQuery, GoLiveDates};
use crate::error::{Result, TrackerError};
use crate::status::{Status, StatusCounts};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// RESPONSE ENVELOPES
// ============================================================================

/// `{success, data, error?}` wrapper used by list/history routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,

    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            total: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            total: None,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    /// A response counts only when it says so AND carries data
    pub fn into_data(self, what: &str) -> Result<T> {
        if !self.success {
            return Err(TrackerError::load(
                what,
                self.error.unwrap_or_else(|| "No data received from server".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| TrackerError::load(what, "No data received from server"))
    }
}

// ============================================================================
// STATUS UPDATE
// ============================================================================

/// Body of `POST /entities/{id}/status`. Dates are required exactly when the
/// status is go_live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Status,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_date: Option<NaiveDate>,
}

impl StatusUpdateRequest {
    /// Single-phase transition (not_started / in_progress)
    pub fn plain(status: Status) -> Self {
        StatusUpdateRequest {
            status,
            integration_date: None,
            onboarding_date: None,
        }
    }

    pub fn go_live(dates: GoLiveDates) -> Self {
        StatusUpdateRequest {
            status: Status::GoLive,
            integration_date: Some(dates.integration_date),
            onboarding_date: Some(dates.onboarding_date),
        }
    }

    pub fn dates(&self) -> Option<GoLiveDates> {
        match (self.integration_date, self.onboarding_date) {
            (Some(integration_date), Some(onboarding_date)) => Some(GoLiveDates {
                integration_date,
                onboarding_date,
            }),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let has_any_date = self.integration_date.is_some() || self.onboarding_date.is_some();
        match self.status {
            Status::GoLive if self.dates().is_none() => Err(TrackerError::Validation(
                "integration_date and onboarding_date are required for go_live".to_string(),
            )),
            Status::NotStarted | Status::InProgress if has_any_date => {
                Err(TrackerError::Validation(format!(
                    "Dates are only accepted with go_live, not {}",
                    self.status
                )))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Entity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<StatusHistoryEntry>,

    /// Fresh overview, sent when the change crossed the go_live boundary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<DashboardOverview>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// DASHBOARD + HISTORY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub target_count: i64,
    pub unavailable_isp: i64,
    pub unavailable_mfi: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub target_count: i64,
    pub unavailable_isp: i64,
    pub unavailable_mfi: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

/// One row of the status-change audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub entity_id: EntityKey,
    pub entity_name: String,
    pub old_status: Option<Status>,
    pub new_status: Status,
    pub changed_at: DateTime<Utc>,
}

// ============================================================================
// REMOTE STORE
// ============================================================================

/// The authoritative store. Entities are created and destroyed only here;
/// the client holds a transient cache per mounted view.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// `GET /entities`
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>>;

    /// `GET /entities/status-counts`
    async fn status_counts(&self, scope: &CountScope) -> Result<StatusCounts>;

    /// `GET /categories`
    async fn categories(&self) -> Result<Vec<String>>;

    /// `POST /entities/{key}/status`. Transport failures are `Err`; a store
    /// that answered but refused comes back as `success: false`.
    async fn update_status(
        &self,
        key: EntityKey,
        update: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse>;

    /// `GET /dashboard-overview`
    async fn dashboard_overview(&self) -> Result<DashboardOverview>;

    /// `GET /entities/{key}/history`
    async fn status_history(&self, key: EntityKey) -> Result<Vec<StatusHistoryEntry>>;
}

// ============================================================================
// TESTS
// ============================================================================
