use crate::item::Item;

/// Classifier risk grade for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Classification itself failed (timeout, exhausted retries, malformed
    /// response). Failures are data so the pipeline keeps moving.
    Error,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Error => "error",
        }
    }
}

/// Classifier output merged onto an item.
///
/// Invariant: `is_critical` implies `risk_level == High`. [`Verdict::new`]
/// clamps the flag so the invariant cannot be violated by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Verdict {
    pub risk_level: RiskLevel,
    pub is_critical: bool,
    pub reason: String,
}

impl Verdict {
    pub fn new(risk_level: RiskLevel, is_critical: bool, reason: impl Into<String>) -> Self {
        Self {
            risk_level,
            is_critical: is_critical && risk_level == RiskLevel::High,
            reason: reason.into(),
        }
    }

    /// Verdict for an item that could not be classified.
    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(RiskLevel::Error, false, reason)
    }

    /// Local low-risk verdict for rows that never reach the classifier.
    pub fn low(reason: impl Into<String>) -> Self {
        Self::new(RiskLevel::Low, false, reason)
    }
}

/// An item paired with its verdict; the unit the session accumulates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoredItem {
    pub item: Item,
    pub verdict: Verdict,
}
