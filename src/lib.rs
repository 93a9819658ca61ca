// Status Tracker - Core Library
// Status bus, lifecycle controller, views and stores shared by the terminal
// dashboard, the REST server, and tests

pub mod api;
pub mod bus;
pub mod chart;
pub mod client;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod logging;
pub mod status;
pub mod view;

#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use api::{
    ApiResponse, DashboardOverview, RemoteStore, StatusHistoryEntry, StatusUpdateRequest,
    StatusUpdateResponse, Trend,
};
pub use bus::{StatusBus, StatusChangeEvent, Subscription};
pub use chart::{OverviewView, StatusChartView};
pub use client::HttpStore;
pub use config::{ClientConfig, ServerConfig};
pub use db::{
    insert_entities, load_csv, setup_database, verify_count, SeedEntity, SqliteStore,
};
pub use entity::{
    CountScope, Entity, EntityKey, EntityKind, EntityQuery, GoLiveDates, ListKind,
};
pub use error::{Result, TrackerError};
pub use export::{export_view, write_rows};
pub use lifecycle::{GoLiveConfirmation, GoLiveForm, StatusController, TransitionOutcome};
pub use status::{Status, StatusCounts};
pub use view::{EntityListView, LoadState, Notice, NoticeKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
