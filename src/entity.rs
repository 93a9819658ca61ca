// 🏢 Entity Model - Billers, ISPs and MFIs
//
// Every kind lives in one store table and shares one numeric id space, so a
// single `EntityKey` identifies a row no matter which list shows it.
// Names are display values only; two entities may share a name.

use crate::status::Status;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// KEY + KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(pub i64);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityKey {
    fn from(id: i64) -> Self {
        EntityKey(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Biller,
    Isp,
    Mfi,
}

impl EntityKind {
    pub fn from_category(category: Option<&str>) -> Self {
        match category.map(|c| c.trim().to_ascii_uppercase()) {
            Some(ref c) if c == "ISP" => EntityKind::Isp,
            Some(ref c) if c == "MFI" => EntityKind::Mfi,
            _ => EntityKind::Biller,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Biller => "Biller",
            EntityKind::Isp => "ISP",
            EntityKind::Mfi => "MFI",
        }
    }
}

// ============================================================================
// LIST KIND
// ============================================================================

/// The collections a view can display. A go-live confirmation remembers which
/// one it came from so the operator returns to the same list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Billers,
    Top50Billers,
    UnavailableIsp,
    UnavailableMfi,
}

impl ListKind {
    pub const ALL: [ListKind; 4] = [
        ListKind::Billers,
        ListKind::Top50Billers,
        ListKind::UnavailableIsp,
        ListKind::UnavailableMfi,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ListKind::Billers => "Billers",
            ListKind::Top50Billers => "Top 50 Billers",
            ListKind::UnavailableIsp => "Unavailable ISP",
            ListKind::UnavailableMfi => "Unavailable MFI",
        }
    }

    pub fn route(&self) -> &'static str {
        match self {
            ListKind::Billers => "billers",
            ListKind::Top50Billers => "top-50-billers",
            ListKind::UnavailableIsp => "unavailable-isp",
            ListKind::UnavailableMfi => "unavailable-mfi",
        }
    }

    /// Unknown routes fall back to the main biller list
    pub fn from_route(route: &str) -> Self {
        ListKind::ALL
            .into_iter()
            .find(|l| l.route() == route)
            .unwrap_or(ListKind::Billers)
    }

    /// Only the main biller list searches server-side
    pub fn searches_remotely(&self) -> bool {
        matches!(self, ListKind::Billers)
    }

    /// Remote query for this list, with an optional server-side search term
    pub fn query(&self, search: Option<&str>) -> EntityQuery {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty() && self.searches_remotely())
            .map(str::to_string);

        match self {
            ListKind::Billers => EntityQuery {
                search,
                ..EntityQuery::default()
            },
            ListKind::Top50Billers => EntityQuery {
                top_50: true,
                ..EntityQuery::default()
            },
            ListKind::UnavailableIsp => EntityQuery {
                category: Some("ISP".to_string()),
                ..EntityQuery::default()
            },
            ListKind::UnavailableMfi => EntityQuery {
                category: Some("MFI".to_string()),
                ..EntityQuery::default()
            },
        }
    }
}

// ============================================================================
// QUERIES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub top_50: bool,
}

impl EntityQuery {
    /// `category=all` means no category filter
    pub fn category_filter(&self) -> Option<&str> {
        non_wildcard(self.category.as_deref())
    }

    pub fn status_filter(&self) -> Option<&str> {
        non_wildcard(self.status.as_deref())
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Scope for aggregate counts: a category, the top-50 subset, or everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub top_50: bool,
}

impl CountScope {
    pub fn category_filter(&self) -> Option<&str> {
        non_wildcard(self.category.as_deref())
    }
}

fn non_wildcard(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityKey,
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    pub status: Status,

    #[serde(default)]
    pub web: Option<String>,

    #[serde(default)]
    pub is_top_50: bool,

    /// Only present once status is go_live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_date: Option<NaiveDate>,
}

impl Entity {
    pub fn new(id: i64, name: &str, status: Status) -> Self {
        Entity {
            id: EntityKey(id),
            name: name.to_string(),
            category: None,
            status,
            web: None,
            is_top_50: false,
            integration_date: None,
            onboarding_date: None,
        }
    }

    pub fn key(&self) -> EntityKey {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        EntityKind::from_category(self.category.as_deref())
    }

    /// Link target for the `web` column; bare hosts get an https scheme
    pub fn web_url(&self) -> Option<String> {
        let web = self.web.as_deref()?.trim();
        if web.is_empty() {
            return None;
        }
        if web.starts_with("http://") || web.starts_with("https://") {
            Some(web.to_string())
        } else {
            Some(format!("https://{}", web))
        }
    }

    /// Case-insensitive substring match on name. Blank query matches all.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }

    /// Set status, keeping the dates consistent with it
    pub fn apply_status(&mut self, status: Status, dates: Option<GoLiveDates>) {
        self.status = status;
        match (status, dates) {
            (Status::GoLive, Some(dates)) => {
                self.integration_date = Some(dates.integration_date);
                self.onboarding_date = Some(dates.onboarding_date);
            }
            (Status::GoLive, None) => {}
            _ => {
                self.integration_date = None;
                self.onboarding_date = None;
            }
        }
    }
}

/// The two data points the terminal transition requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoLiveDates {
    pub integration_date: NaiveDate,
    pub onboarding_date: NaiveDate,
}

// ============================================================================
// TESTS
// ============================================================================
