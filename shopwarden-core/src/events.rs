use shopwarden_model::{SessionId, SessionKind, SessionStatus, SessionSummary};

/// Progress events emitted while a patrol run is live.
///
/// Delivered over an mpsc channel owned by the caller; a dropped receiver
/// silently disables reporting without slowing the pipeline down.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatrolProgress {
    /// A run has started (fresh or resumed).
    Started {
        session_id: SessionId,
        kind: SessionKind,
        target: String,
        target_count: usize,
    },
    /// A catalog page has been fetched and is about to be classified.
    PageFetched { page: u32, items: usize },
    /// A batch finished and its results were persisted.
    BatchCompleted {
        processed: usize,
        target_count: usize,
    },
    /// A bulk file could not be parsed and was skipped.
    FileSkipped { message: String },
    /// Coarse status line for live display.
    StatusChanged {
        status: String,
        processed: usize,
        target_count: usize,
    },
    /// The run reached a terminal disposition.
    Finished {
        session_id: SessionId,
        status: SessionStatus,
        summary: SessionSummary,
    },
}
