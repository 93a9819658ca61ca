// 📊 Chart + Overview Views
// Aggregate counts come from the store. The chart view listens on the bus
// only to know its numbers went stale; it never recounts locally.

use crate::api::{DashboardOverview, RemoteStore, Trend};
use crate::bus::{StatusBus, Subscription};
use crate::entity::CountScope;
use crate::error::Result;
use crate::status::{Status, StatusCounts};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ALL_CATEGORIES: &str = "all";

// ============================================================================
// STATUS CHART
// ============================================================================

pub struct StatusChartView {
    store: Arc<dyn RemoteStore>,
    top_50: bool,
    categories: Vec<String>,
    selected: usize,
    counts: Option<StatusCounts>,
    stale: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl StatusChartView {
    /// `top_50` scopes the counts to the top-50 subset
    pub fn mount(bus: &StatusBus, store: Arc<dyn RemoteStore>, top_50: bool) -> Self {
        let stale = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&stale);
        let subscription = bus.subscribe(move |_| flag.store(true, Ordering::SeqCst));

        StatusChartView {
            store,
            top_50,
            categories: vec![ALL_CATEGORIES.to_string()],
            selected: 0,
            counts: None,
            stale,
            _subscription: subscription,
        }
    }

    pub async fn load_categories(&mut self) -> Result<usize> {
        let mut categories = self.store.categories().await?;
        categories.retain(|c| !c.trim().is_empty() && !c.eq_ignore_ascii_case(ALL_CATEGORIES));
        categories.insert(0, ALL_CATEGORIES.to_string());

        let current = self.selected_category().to_string();
        self.selected = categories.iter().position(|c| *c == current).unwrap_or(0);
        self.categories = categories;
        Ok(self.categories.len())
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn selected_category(&self) -> &str {
        self.categories
            .get(self.selected)
            .map(String::as_str)
            .unwrap_or(ALL_CATEGORIES)
    }

    pub fn select_category(&mut self, category: &str) -> bool {
        match self.categories.iter().position(|c| c == category) {
            Some(index) => {
                self.selected = index;
                self.stale.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Advance to the next category, wrapping around
    pub fn cycle_category(&mut self) -> &str {
        self.selected = (self.selected + 1) % self.categories.len().max(1);
        self.stale.store(true, Ordering::SeqCst);
        self.selected_category()
    }

    pub fn scope(&self) -> CountScope {
        CountScope {
            category: Some(self.selected_category().to_string()),
            top_50: self.top_50,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Refetch counts if anything changed since the last fetch
    pub async fn refresh(&mut self) -> Result<StatusCounts> {
        if let (false, Some(counts)) = (self.is_stale(), self.counts) {
            return Ok(counts);
        }

        // Clear first so an event arriving mid-fetch keeps the flag set
        self.stale.store(false, Ordering::SeqCst);
        match self.store.status_counts(&self.scope()).await {
            Ok(counts) => {
                tracing::debug!(category = self.selected_category(), total = counts.total(), "chart refreshed");
                self.counts = Some(counts);
                Ok(counts)
            }
            Err(e) => {
                self.stale.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    pub fn counts(&self) -> Option<StatusCounts> {
        self.counts
    }

    pub fn bars(&self) -> Vec<(Status, &'static str, i64)> {
        self.counts.unwrap_or_default().bars()
    }
}

// ============================================================================
// DASHBOARD OVERVIEW
// ============================================================================

#[derive(Default)]
pub struct OverviewView {
    overview: Option<DashboardOverview>,
}

impl OverviewView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, store: &dyn RemoteStore) -> Result<DashboardOverview> {
        let mut overview = store.dashboard_overview().await?;
        overview.trend.get_or_insert_with(Trend::default);
        self.overview = Some(overview.clone());
        Ok(overview)
    }

    /// Status responses that crossed go_live carry a fresh overview
    pub fn replace(&mut self, mut overview: DashboardOverview) {
        overview.trend.get_or_insert_with(Trend::default);
        self.overview = Some(overview);
    }

    pub fn overview(&self) -> Option<&DashboardOverview> {
        self.overview.as_ref()
    }
}

// ============================================================================
// TESTS
// ============================================================================
