use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::verdict::{RiskLevel, ScoredItem};

/// Strongly typed ID for patrol sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(pub Uuid);

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of catalog a patrol run walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionKind {
    /// Paginated storefront search endpoint.
    RemoteCatalog,
    /// Pre-parsed bulk file export, processed all-or-nothing.
    BulkFile,
}

/// Lifecycle status of a patrol session.
///
/// Transitions are monotonic except for operator-triggered resume
/// (`Paused`/`Aborted` back to `Processing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionStatus {
    Processing,
    Paused,
    Aborted,
    Completed,
}

impl SessionStatus {
    /// Whether an operator may restart a run from this status.
    pub fn is_resumable(&self) -> bool {
        matches!(self, SessionStatus::Paused | SessionStatus::Aborted)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Processing)
    }
}

/// Derived counters, recomputed from the full result sequence on every
/// persist rather than maintained incrementally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub critical: usize,
}

impl SessionSummary {
    pub fn of(results: &[ScoredItem]) -> Self {
        Self {
            total: results.len(),
            high: results
                .iter()
                .filter(|r| r.verdict.risk_level == RiskLevel::High)
                .count(),
            medium: results
                .iter()
                .filter(|r| r.verdict.risk_level == RiskLevel::Medium)
                .count(),
            critical: results.iter().filter(|r| r.verdict.is_critical).count(),
        }
    }
}

/// The persisted record of one patrol run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    /// Shop URL or comma-joined file name list.
    pub target: String,
    /// Resolved shop display name, when the target is a remote catalog.
    pub shop_name: Option<String>,
    pub status: SessionStatus,
    /// Last fully processed page index for remote runs; 0 for bulk runs.
    pub cursor: u32,
    pub results: Vec<ScoredItem>,
    pub summary: SessionSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Fresh session at the start of a run.
    pub fn new(kind: SessionKind, target: impl Into<String>, shop_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            kind,
            target: target.into(),
            shop_name,
            status: SessionStatus::Processing,
            cursor: 0,
            results: Vec::new(),
            summary: SessionSummary::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
