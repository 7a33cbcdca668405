//! In-memory session state for one patrol run.
//!
//! The controller exclusively owns this for the duration of a run; the
//! store only ever sees snapshots. The summary is recomputed from the full
//! result sequence on every persist — O(n) once per page/batch is a fair
//! price for counters that can always be audited against the results.

use chrono::Utc;
use shopwarden_model::{ScoredItem, Session, SessionStatus, SessionSummary};
use tracing::debug;

use crate::error::Result;
use crate::store::SessionStore;

#[derive(Debug)]
pub struct SessionState {
    session: Session,
}

impl SessionState {
    /// Wrap a freshly created session.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Restore a paused or aborted session for another pass. The operator
    /// resume transition is the one place status moves backwards.
    pub fn resume(mut session: Session) -> Self {
        debug!(
            session = %session.id,
            cursor = session.cursor,
            carried = session.results.len(),
            "resuming session"
        );
        session.status = SessionStatus::Processing;
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn cursor(&self) -> u32 {
        self.session.cursor
    }

    pub fn processed(&self) -> usize {
        self.session.results.len()
    }

    /// Append newly classified results and recompute the summary.
    pub fn apply_results(&mut self, new_results: Vec<ScoredItem>) -> SessionSummary {
        self.session.results.extend(new_results);
        self.session.summary = SessionSummary::of(&self.session.results);
        self.session.summary
    }

    /// Persist the current state. The cursor is monotonic: a persist can
    /// never move it backwards.
    pub async fn persist(
        &mut self,
        status: SessionStatus,
        cursor: u32,
        store: &dyn SessionStore,
    ) -> Result<()> {
        self.session.cursor = self.session.cursor.max(cursor);
        self.session.status = status;
        self.session.summary = SessionSummary::of(&self.session.results);
        self.session.updated_at = Utc::now();
        store.update(&self.session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use shopwarden_model::{Item, RiskLevel, SessionKind, Verdict};

    fn scored(level: RiskLevel) -> ScoredItem {
        ScoredItem {
            item: Item::bare("tee", "shop"),
            verdict: Verdict::new(level, level == RiskLevel::High, "r"),
        }
    }

    fn fresh_state() -> SessionState {
        SessionState::new(Session::new(SessionKind::RemoteCatalog, "https://shop", None))
    }

    #[test]
    fn summary_tracks_results_after_every_apply() {
        let mut state = fresh_state();
        let summary = state.apply_results(vec![scored(RiskLevel::High), scored(RiskLevel::Low)]);
        assert_eq!(summary.total, state.processed());

        let summary = state.apply_results(vec![scored(RiskLevel::Medium)]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.critical, 1);
    }

    #[test]
    fn applying_the_same_sequence_yields_the_same_summary() {
        let batch = vec![scored(RiskLevel::High), scored(RiskLevel::Medium)];

        let mut a = fresh_state();
        let mut b = fresh_state();
        assert_eq!(a.apply_results(batch.clone()), b.apply_results(batch));
    }

    #[tokio::test]
    async fn persist_never_moves_the_cursor_backwards() {
        let store = MemorySessionStore::default();
        let mut state = fresh_state();
        store.create(state.session()).await.expect("create");

        state
            .persist(SessionStatus::Processing, 3, &store)
            .await
            .expect("persist");
        state
            .persist(SessionStatus::Paused, 1, &store)
            .await
            .expect("persist");

        assert_eq!(state.cursor(), 3);
        let stored = store
            .fetch(state.session().id)
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.cursor, 3);
        assert_eq!(stored.status, SessionStatus::Paused);
    }

    #[tokio::test]
    async fn persist_recomputes_summary_from_results() {
        let store = MemorySessionStore::default();
        let mut state = fresh_state();
        store.create(state.session()).await.expect("create");

        state.apply_results(vec![scored(RiskLevel::High)]);
        state
            .persist(SessionStatus::Completed, 1, &store)
            .await
            .expect("persist");

        let stored = store
            .fetch(state.session().id)
            .await
            .expect("fetch")
            .expect("present");
        assert_eq!(stored.summary.total, stored.results.len());
        assert_eq!(stored.summary.high, 1);
    }
}
