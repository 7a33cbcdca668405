//! Session persistence: append-only creation plus keyed update.
//!
//! Reading sessions back for listing, filtering, and deletion belongs to
//! the history surface, not the pipeline; `fetch` exists so an operator
//! can resume one known session. Stores are last-write-wins — concurrent
//! runs against the same session are not coordinated (documented
//! single-writer assumption).

use async_trait::async_trait;
use shopwarden_model::{Session, SessionId};

use crate::error::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PostgresSessionStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session record. Fails if the id already exists.
    async fn create(&self, session: &Session) -> Result<()>;

    /// Overwrite the stored state of an existing session.
    async fn update(&self, session: &Session) -> Result<()>;

    /// Load one session for resume.
    async fn fetch(&self, id: SessionId) -> Result<Option<Session>>;
}
