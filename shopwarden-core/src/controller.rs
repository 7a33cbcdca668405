//! Scan controller: drives source, scheduler, and session state across
//! pages and reconciles retries, empty pages, and operator cancellation
//! into one of the terminal dispositions.
//!
//! State machine: `Idle -> Processing -> {Completed, Paused, Aborted}`,
//! with `Paused`/`Aborted -> Processing` on explicit operator resume.
//! Cancellation is cooperative: the token is polled before fetching a new
//! page and before starting a new batch, never mid-call. Whatever the
//! disposition, every verdict gathered so far is persisted — failure never
//! silently drops data.

use std::sync::Arc;

use shopwarden_config::PatrolConfig;
use shopwarden_model::{Session, SessionKind, SessionStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::error::{PatrolError, Result};
use crate::events::PatrolProgress;
use crate::scheduler::{BatchScheduler, ConcurrencyMode};
use crate::session::SessionState;
use crate::source::ItemSource;
use crate::store::SessionStore;

/// Handle to a spawned patrol run.
#[derive(Debug)]
pub struct PatrolHandle {
    cancel: CancellationToken,
    join_handle: JoinHandle<Result<Session>>,
}

impl PatrolHandle {
    /// Request a pause. The in-flight batch finishes first; the session is
    /// persisted as `Paused` and can be resumed later.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to reach a terminal disposition.
    pub async fn join(self) -> Result<Session> {
        self.join_handle
            .await
            .map_err(|err| PatrolError::Internal(format!("patrol task failed: {err}")))?
    }
}

/// Orchestrates one patrol run.
pub struct PatrolController {
    config: PatrolConfig,
    source: Arc<dyn ItemSource>,
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn SessionStore>,
    progress: mpsc::Sender<PatrolProgress>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for PatrolController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatrolController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PatrolController {
    pub fn new(
        config: PatrolConfig,
        source: Arc<dyn ItemSource>,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn SessionStore>,
        progress: mpsc::Sender<PatrolProgress>,
    ) -> Self {
        Self {
            config,
            source,
            classifier,
            store,
            progress,
            cancel: CancellationToken::new(),
        }
    }

    /// Token an operator uses to pause the run. Polled before each page
    /// fetch and between batches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run on a background task, returning a pause/join handle.
    pub fn spawn(self, resume: Option<Session>, target_count: usize) -> PatrolHandle {
        let cancel = self.cancel.clone();
        let join_handle =
            tokio::spawn(async move { self.run(resume, target_count).await });
        PatrolHandle {
            cancel,
            join_handle,
        }
    }

    /// Drive one patrol run to a terminal disposition and return the final
    /// session. `resume` restores a paused/aborted session; fresh runs
    /// create and persist a new one.
    pub async fn run(&self, resume: Option<Session>, target_count: usize) -> Result<Session> {
        let descriptor = self.source.descriptor();

        let (mut state, target_count) = match resume {
            Some(previous) => {
                if descriptor.kind == SessionKind::BulkFile {
                    return Err(PatrolError::InvalidTarget(
                        "bulk runs are all-or-nothing and cannot resume".into(),
                    ));
                }
                // A resumed run always proceeds to the end of the catalog.
                (
                    SessionState::resume(previous),
                    self.config.pacing.full_scan_target,
                )
            }
            None => {
                let session =
                    Session::new(descriptor.kind, descriptor.target.clone(), descriptor.shop_name);
                self.store.create(&session).await?;
                (SessionState::new(session), target_count)
            }
        };

        self.emit(PatrolProgress::Started {
            session_id: state.session().id,
            kind: descriptor.kind,
            target: descriptor.target.clone(),
            target_count,
        })
        .await;

        let outcome = match descriptor.kind {
            SessionKind::RemoteCatalog => self.run_remote(&mut state, target_count).await,
            SessionKind::BulkFile => self.run_bulk(&mut state).await,
        };

        match outcome {
            Ok(final_status) => {
                let cursor = state.cursor();
                state.persist(final_status, cursor, &*self.store).await?;
                info!(
                    session = %state.session().id,
                    status = ?final_status,
                    total = state.processed(),
                    "patrol run finished"
                );
                self.emit(PatrolProgress::Finished {
                    session_id: state.session().id,
                    status: final_status,
                    summary: state.session().summary,
                })
                .await;
                Ok(state.into_session())
            }
            Err(err) => {
                // Keep everything gathered so far; the cursor already
                // points at the last fully completed page.
                warn!(
                    session = %state.session().id,
                    error = %err,
                    "patrol run aborted"
                );
                let cursor = state.cursor();
                state
                    .persist(SessionStatus::Aborted, cursor, &*self.store)
                    .await?;
                self.emit(PatrolProgress::Finished {
                    session_id: state.session().id,
                    status: SessionStatus::Aborted,
                    summary: state.session().summary,
                })
                .await;
                Err(err)
            }
        }
    }

    async fn run_remote(
        &self,
        state: &mut SessionState,
        target_count: usize,
    ) -> Result<SessionStatus> {
        let mode = ConcurrencyMode::from_high_speed(self.config.pacing.high_speed);
        let scheduler = BatchScheduler::new(Arc::clone(&self.classifier), mode);
        let page_size = self.config.catalog.page_size.max(1) as usize;
        let page_limit = target_count.div_ceil(page_size) as u32;

        loop {
            let page = state.cursor() + 1;
            if page > page_limit {
                break;
            }
            if self.cancel.is_cancelled() {
                return Ok(SessionStatus::Paused);
            }

            self.emit(PatrolProgress::StatusChanged {
                status: format!("fetching page {page}/{page_limit}"),
                processed: state.processed(),
                target_count,
            })
            .await;

            // A failed fetch propagates out and aborts the run; page-level
            // transport problems are not retried here.
            let item_page = self.source.next_page(state.cursor()).await?;
            if item_page.items.is_empty() {
                break;
            }
            self.emit(PatrolProgress::PageFetched {
                page,
                items: item_page.items.len(),
            })
            .await;

            let scored = scheduler.run_page(&item_page.items, &self.cancel).await;
            if !scored.is_empty() {
                state.apply_results(scored);
                state
                    .persist(SessionStatus::Processing, page, &*self.store)
                    .await?;
                self.emit(PatrolProgress::BatchCompleted {
                    processed: state.processed(),
                    target_count,
                })
                .await;
            }

            if state.processed() >= target_count {
                break;
            }
            if !item_page.has_more {
                break;
            }

            let delay = std::time::Duration::from_millis(self.config.pacing.inter_page_delay_ms);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        if self.cancel.is_cancelled() {
            Ok(SessionStatus::Paused)
        } else {
            Ok(SessionStatus::Completed)
        }
    }

    async fn run_bulk(&self, state: &mut SessionState) -> Result<SessionStatus> {
        let mode = ConcurrencyMode::from_high_speed(self.config.pacing.high_speed);
        let scheduler = BatchScheduler::new(Arc::clone(&self.classifier), mode);

        let page = self.source.next_page(0).await?;
        for warning in &page.warnings {
            warn!(warning = %warning, "bulk file skipped");
            self.emit(PatrolProgress::FileSkipped {
                message: warning.clone(),
            })
            .await;
        }
        if page.items.is_empty() {
            return Ok(SessionStatus::Completed);
        }

        let target_count = page.items.len();
        for chunk in page.items.chunks(mode.batch_size()) {
            if self.cancel.is_cancelled() {
                return Ok(SessionStatus::Paused);
            }

            let scored = scheduler.run_batch(chunk).await;
            state.apply_results(scored);
            // Bulk runs persist once per batch; there is no page cursor.
            state
                .persist(SessionStatus::Processing, 0, &*self.store)
                .await?;
            self.emit(PatrolProgress::BatchCompleted {
                processed: state.processed(),
                target_count,
            })
            .await;

            let delay = mode.batch_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(SessionStatus::Completed)
    }

    async fn emit(&self, event: PatrolProgress) {
        // A dropped receiver disables reporting; it never stalls the run.
        let _ = self.progress.send(event).await;
    }
}
