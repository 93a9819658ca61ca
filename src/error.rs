// ⚠️ Error Taxonomy
// Load / Validation / Persist failures, plus the transport and storage errors behind them

use crate::entity::EntityKey;
use crate::status::Status;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Remote fetch failed or returned a malformed/empty shape
    #[error("Failed to load {what}: {message}")]
    Load { what: String, message: String },

    /// Confirmation step submitted with missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Status-change request rejected or never reached the store
    #[error("{0}")]
    Persist(String),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("A status update for entity {0} is already in flight")]
    InFlight(EntityKey),

    #[error("Entity {0} not found")]
    NotFound(EntityKey),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl TrackerError {
    pub fn load(what: impl Into<String>, message: impl Into<String>) -> Self {
        TrackerError::Load {
            what: what.into(),
            message: message.into(),
        }
    }

    /// True for failures the operator fixes at the confirmation step
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TrackerError::Validation(_) | TrackerError::InvalidTransition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
