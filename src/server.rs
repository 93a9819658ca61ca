// 🌐 REST API
// axum router over the SQLite store. Shapes match `api` so `HttpStore`
// (or any other client) can talk to it.

use crate::api::{ApiResponse, StatusUpdateRequest, StatusUpdateResponse};
use crate::db;
use crate::entity::{CountScope, EntityKey, EntityQuery};
use crate::error::TrackerError;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        AppState { db }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Error mapping
// ============================================================================

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::Validation(_) | TrackerError::InvalidTransition { .. } => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Conflict(_) | TrackerError::InFlight(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, %status, "request rejected");
        }

        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, TrackerError>;

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/entities?search=&category=&status=&top_50=
async fn list_entities(
    State(state): State<AppState>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<ApiResponse<Vec<crate::entity::Entity>>> {
    let entities = db::query_entities(&state.conn(), &query)?;
    let total = entities.len();
    Ok(Json(ApiResponse::ok(entities).with_total(total)))
}

/// GET /api/entities/status-counts?category=&top_50=
async fn status_counts(
    State(state): State<AppState>,
    Query(scope): Query<CountScope>,
) -> ApiResult<crate::status::StatusCounts> {
    Ok(Json(db::status_counts(&state.conn(), &scope)?))
}

/// GET /api/categories
async fn categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(Json(db::categories(&state.conn())?))
}

/// POST /api/entities/:id/status
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<StatusUpdateResponse>, TrackerError> {
    let Json(update) = payload.map_err(|rejection| {
        TrackerError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let response = db::update_status(&mut state.conn(), EntityKey(id), &update)?;
    Ok(Json(response))
}

/// GET /api/entities/:id/history
async fn status_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<Vec<crate::api::StatusHistoryEntry>>> {
    let history = db::status_history(&state.conn(), EntityKey(id))?;
    Ok(Json(ApiResponse::ok(history)))
}

/// GET /api/dashboard-overview
async fn dashboard_overview(
    State(state): State<AppState>,
) -> ApiResult<crate::api::DashboardOverview> {
    Ok(Json(db::dashboard_overview(&state.conn())?))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/entities", get(list_entities))
        .route("/entities/status-counts", get(status_counts))
        .route("/entities/:id/status", post(update_status))
        .route("/entities/:id/history", get(status_history))
        .route("/categories", get(categories))
        .route("/dashboard-overview", get(dashboard_overview))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
