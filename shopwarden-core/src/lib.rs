//! # Shopwarden Core
//!
//! The scan pipeline behind Shopwarden: turns an e-commerce catalog — a
//! paginated remote storefront or a set of bulk file exports — into an
//! ordered stream of per-item infringement risk verdicts, while tolerating
//! transient failures, respecting rate limits, supporting pause/resume
//! across process restarts, and keeping an auditable persisted session.
//!
//! ## Architecture
//!
//! - [`source`]: ordered, lazily-paginated item producers (remote catalog
//!   and bulk files)
//! - [`classifier`]: the external risk-assessment client, with bounded
//!   retry/backoff and response normalization
//! - [`scheduler`]: concurrency-bounded batching with pacing delays
//! - [`session`] / [`store`]: the persisted, resumable session record
//! - [`controller`]: the page loop and the
//!   `Processing -> {Completed, Paused, Aborted}` state machine
//! - [`events`]: live progress reporting
//! - [`report`]: CSV export of gathered verdicts
//!
//! Presentation concerns (dashboards, history browsing, upload forms,
//! authentication) are deliberately outside this crate; they only read the
//! session records this pipeline writes.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Exponential backoff policy for throttled classifier calls
pub mod backoff;

/// Risk classifier client and response normalization
pub mod classifier;

/// Scan controller state machine
pub mod controller;

/// Error types and error handling utilities
pub mod error;

/// Live progress events
pub mod events;

/// CSV export of patrol results
pub mod report;

/// Batch scheduling and concurrency modes
pub mod scheduler;

/// Per-run session state
pub mod session;

/// Item sources: remote catalog and bulk files
pub mod source;

/// Session persistence
pub mod store;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub use classifier::{Classifier, HttpClassifyEndpoint, RiskClassifier};
pub use controller::{PatrolController, PatrolHandle};
pub use error::{PatrolError, Result};
pub use events::PatrolProgress;
pub use scheduler::{BatchScheduler, ConcurrencyMode};
pub use session::SessionState;
pub use source::{BulkEncoding, BulkFileSource, CatalogSource, ItemPage, ItemSource};
pub use store::{MemorySessionStore, PostgresSessionStore, SessionStore};
