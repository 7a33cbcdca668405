//! Core data model definitions shared across Shopwarden crates.
#![allow(missing_docs)]

pub mod item;
pub mod session;
pub mod verdict;

pub use item::Item;
pub use session::{
    Session, SessionId, SessionKind, SessionStatus, SessionSummary,
};
pub use verdict::{RiskLevel, ScoredItem, Verdict};
