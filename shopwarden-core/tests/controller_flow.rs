mod support;

use std::sync::Arc;

use shopwarden_config::PatrolConfig;
use shopwarden_core::PatrolError;
use shopwarden_core::controller::PatrolController;
use shopwarden_core::events::PatrolProgress;
use shopwarden_core::store::{MemorySessionStore, SessionStore};
use shopwarden_model::{
    ScoredItem, Session, SessionId, SessionKind, SessionStatus, Verdict,
};
use tokio::sync::mpsc;

use support::{FakeCatalogSource, FakeClassifier, page_of};

fn config(high_speed: bool) -> PatrolConfig {
    let mut config = PatrolConfig::default();
    config.pacing.high_speed = high_speed;
    config
}

struct Rig {
    controller: PatrolController,
    progress_rx: mpsc::Receiver<PatrolProgress>,
    source: Arc<FakeCatalogSource>,
    classifier: Arc<FakeClassifier>,
    store: Arc<MemorySessionStore>,
}

fn rig(high_speed: bool, pages: Vec<Vec<shopwarden_model::Item>>) -> Rig {
    let source = Arc::new(FakeCatalogSource::new(pages));
    let classifier = Arc::new(FakeClassifier::new());
    let store = Arc::new(MemorySessionStore::default());
    let (progress_tx, progress_rx) = mpsc::channel(256);
    let controller = PatrolController::new(
        config(high_speed),
        source.clone(),
        classifier.clone(),
        store.clone(),
        progress_tx,
    );
    Rig {
        controller,
        progress_rx,
        source,
        classifier,
        store,
    }
}

/// Drain buffered progress events and pull the session id out of the
/// `Started` event.
fn drain_events(rx: &mut mpsc::Receiver<PatrolProgress>) -> (Option<SessionId>, Vec<PatrolProgress>) {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let session_id = events.iter().find_map(|e| match e {
        PatrolProgress::Started { session_id, .. } => Some(*session_id),
        _ => None,
    });
    (session_id, events)
}

#[tokio::test(start_paused = true)]
async fn one_page_target_runs_one_page_and_completes() {
    let mut rig = rig(true, vec![page_of("item", 30), page_of("more", 30)]);

    let session = rig.controller.run(None, 30).await.expect("run");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.summary.total, 30);
    assert_eq!(session.cursor, 1);
    assert_eq!(rig.source.requested_cursors(), vec![0], "exactly one page fetched");
    assert_eq!(rig.classifier.calls(), 30);

    let stored = rig
        .store
        .fetch(session.id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(stored.summary.total, stored.results.len());

    let (_, events) = drain_events(&mut rig.progress_rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PatrolProgress::Finished { status: SessionStatus::Completed, .. }))
    );
}

#[tokio::test(start_paused = true)]
async fn normal_mode_classifies_the_same_page_in_batches_of_three() {
    let rig = rig(false, vec![page_of("item", 30)]);

    let session = rig.controller.run(None, 30).await.expect("run");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.summary.total, 30);
    assert_eq!(rig.classifier.calls(), 30);
}

#[tokio::test(start_paused = true)]
async fn resume_continues_at_the_stored_cursor_without_duplicating_results() {
    let rig = rig(
        true,
        vec![page_of("old", 30), page_of("old", 30), page_of("fresh", 30)],
    );

    // A previous run got through two pages before pausing.
    let mut previous = Session::new(
        SessionKind::RemoteCatalog,
        "https://mall.example/test-shop/",
        None,
    );
    previous.status = SessionStatus::Paused;
    previous.cursor = 2;
    previous.results = page_of("carried", 60)
        .into_iter()
        .map(|item| ScoredItem {
            item,
            verdict: Verdict::low("ok"),
        })
        .collect();
    rig.store.create(&previous).await.expect("create");

    let session = rig.controller.run(Some(previous), 30).await.expect("run");

    // Page 3 is fetched next — never pages 1 and 2 again.
    assert_eq!(rig.source.requested_cursors(), vec![2]);
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.summary.total, 90);
    assert_eq!(rig.classifier.calls(), 30, "only the fresh page is classified");
    let carried = session
        .results
        .iter()
        .filter(|r| r.item.name.starts_with("carried"))
        .count();
    assert_eq!(carried, 60, "carried results are kept exactly once");
}

#[tokio::test(start_paused = true)]
async fn page_fetch_failure_aborts_and_keeps_prior_pages() {
    let source = Arc::new(
        FakeCatalogSource::new(vec![page_of("item", 30), page_of("never", 30)])
            .failing_at_page(2),
    );
    let classifier = Arc::new(FakeClassifier::new());
    let store = Arc::new(MemorySessionStore::default());
    let (progress_tx, mut progress_rx) = mpsc::channel(256);
    let controller = PatrolController::new(
        config(true),
        source,
        classifier,
        store.clone(),
        progress_tx,
    );

    let err = controller.run(None, 90).await.expect_err("must abort");
    assert!(matches!(err, PatrolError::CatalogStatus { status: 500 }));

    let (session_id, events) = drain_events(&mut progress_rx);
    let session_id = session_id.expect("started event");
    assert!(
        events
            .iter()
            .any(|e| matches!(e, PatrolProgress::Finished { status: SessionStatus::Aborted, .. }))
    );

    // The session survived with everything gathered before the failure.
    let stored = store
        .fetch(session_id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, SessionStatus::Aborted);
    assert_eq!(stored.cursor, 1);
    assert_eq!(stored.summary.total, 30);
    assert_eq!(stored.summary.total, stored.results.len());
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_page_pauses_with_in_flight_batch_retained() {
    let rig = rig(false, vec![page_of("item", 30)]);

    // Cancel the controller's own token while the second batch of three is
    // in flight.
    rig.classifier.arm_cancel(5, rig.controller.cancellation_token());

    let session = rig.controller.run(None, 30).await.expect("run");

    assert_eq!(session.status, SessionStatus::Paused);
    // The in-flight batch finished; nothing after it started.
    assert_eq!(session.summary.total, 6);
    assert_eq!(rig.classifier.calls(), 6);

    let stored = rig
        .store
        .fetch(session.id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, SessionStatus::Paused);
    assert_eq!(stored.summary.total, 6);
}

#[tokio::test(start_paused = true)]
async fn empty_first_page_completes_with_no_results() {
    let rig = rig(true, vec![vec![]]);

    let session = rig.controller.run(None, 30).await.expect("run");

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.summary.total, 0);
    assert_eq!(rig.classifier.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn spawned_run_can_be_paused_through_the_handle() {
    let rig = rig(false, vec![page_of("item", 30), page_of("item2", 30)]);
    let classifier = rig.classifier.clone();
    let store = rig.store.clone();

    let handle = rig.controller.spawn(None, 3_000);
    // Let the first batches land, then ask for a pause.
    tokio::task::yield_now().await;
    handle.cancel();
    let session = handle.join().await.expect("join");

    assert_eq!(session.status, SessionStatus::Paused);
    assert!(classifier.calls() <= 30, "no new page may start after pause");
    let stored = store
        .fetch(session.id)
        .await
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.status, SessionStatus::Paused);
    assert_eq!(stored.summary.total, stored.results.len());
}
