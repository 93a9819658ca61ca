// 🚦 Status Vocabulary
// The three-stage lifecycle every tracked entity moves through:
//
//   not_started ↔ in_progress
//   {not_started, in_progress} → go_live   (terminal, needs confirmation)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NotStarted,
    InProgress,
    GoLive,
}

impl Status {
    /// Lifecycle order, used for charts and pickers
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::InProgress, Status::GoLive];

    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not_started",
            Status::InProgress => "in_progress",
            Status::GoLive => "go_live",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::GoLive => "Go Live",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::GoLive)
    }

    /// Moving into this status needs the two-phase confirm step
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Status::GoLive)
    }

    /// Nothing leaves go_live. Re-selecting go_live is allowed and goes
    /// through confirmation again.
    pub fn can_transition_to(&self, target: Status) -> bool {
        match self {
            Status::NotStarted | Status::InProgress => true,
            Status::GoLive => target == Status::GoLive,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    /// Accepts wire values and spreadsheet labels alike:
    /// "go_live", "Go Live", "GO-LIVE", "in progress"...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "not_started" => Ok(Status::NotStarted),
            "in_progress" => Ok(Status::InProgress),
            "go_live" => Ok(Status::GoLive),
            _ => Err(format!("Invalid status: {}", s.trim())),
        }
    }
}

// ============================================================================
// AGGREGATE COUNTS
// ============================================================================

/// Per-status counts. Owned by the remote store; the client only tallies
/// locally for footers over rows it already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_started: i64,
    pub in_progress: i64,
    pub go_live: i64,
}

impl StatusCounts {
    pub fn tally<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a Status>,
    {
        let mut counts = StatusCounts::default();
        for status in statuses {
            counts.increment(*status);
        }
        counts
    }

    pub fn increment(&mut self, status: Status) {
        match status {
            Status::NotStarted => self.not_started += 1,
            Status::InProgress => self.in_progress += 1,
            Status::GoLive => self.go_live += 1,
        }
    }

    pub fn get(&self, status: Status) -> i64 {
        match status {
            Status::NotStarted => self.not_started,
            Status::InProgress => self.in_progress,
            Status::GoLive => self.go_live,
        }
    }

    pub fn total(&self) -> i64 {
        self.not_started + self.in_progress + self.go_live
    }

    /// Chart rows in lifecycle order
    pub fn bars(&self) -> Vec<(Status, &'static str, i64)> {
        Status::ALL
            .iter()
            .map(|s| (*s, s.label(), self.get(*s)))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
