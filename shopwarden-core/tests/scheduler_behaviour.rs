mod support;

use std::sync::Arc;

use shopwarden_core::scheduler::{BatchScheduler, ConcurrencyMode};
use shopwarden_model::Item;
use tokio_util::sync::CancellationToken;

use support::FakeClassifier;

fn items(names: &[&str]) -> Vec<Item> {
    names
        .iter()
        .map(|n| Item::bare(*n, "https://mall.example/test-shop/"))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn output_order_matches_input_order_despite_staggered_latencies() {
    // A is slow; B and C finish long before it. The batch barrier must
    // still yield A, B, C.
    let classifier = FakeClassifier::new()
        .with_delay("A", 300)
        .with_delay("B", 5)
        .with_delay("C", 5);
    let scheduler =
        BatchScheduler::new(Arc::new(classifier), ConcurrencyMode::HighSpeed);

    let scored = scheduler
        .run_page(&items(&["A", "B", "C"]), &CancellationToken::new())
        .await;

    let names: Vec<&str> = scored.iter().map(|s| s.item.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn mid_batch_cancellation_finishes_the_batch_but_starts_no_more() {
    let token = CancellationToken::new();
    // Fires while the second batch is in flight.
    let classifier = Arc::new(FakeClassifier::new().cancel_at_call(5, token.clone()));
    let scheduler = BatchScheduler::new(classifier.clone(), ConcurrencyMode::Normal);

    let page = support::page_of("item", 30);
    let scored = scheduler.run_page(&page, &token).await;

    // Batches of three: the in-flight second batch completes, the third
    // never starts.
    assert_eq!(scored.len(), 6);
    assert_eq!(classifier.calls(), 6);
    let names: Vec<&str> = scored.iter().map(|s| s.item.name.as_str()).collect();
    assert_eq!(names, vec!["item 0", "item 1", "item 2", "item 3", "item 4", "item 5"]);
}

#[tokio::test(start_paused = true)]
async fn normal_mode_cuts_a_page_into_batches_of_three() {
    let classifier = Arc::new(FakeClassifier::new());
    let scheduler = BatchScheduler::new(classifier.clone(), ConcurrencyMode::Normal);

    let page = support::page_of("item", 30);
    let scored = scheduler.run_page(&page, &CancellationToken::new()).await;

    assert_eq!(scored.len(), 30);
    assert_eq!(classifier.calls(), 30);
}
