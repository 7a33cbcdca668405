//! Batch scheduler: concurrency-bounded fan-out over one page of items.
//!
//! A page is cut into consecutive batches; within a batch every
//! classification runs concurrently and the batch is a barrier — results
//! join before the next batch starts, so fan-out never exceeds the batch
//! size and output composition is deterministic. Cancellation is polled
//! only between batches; a batch already in flight always finishes.

use std::sync::Arc;
use std::time::Duration;

use shopwarden_model::{Item, ScoredItem, Verdict};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classifier::Classifier;

/// Throughput mode. High-speed widens batches and drops the inter-batch
/// delay, trading rate-limit headroom for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    #[default]
    Normal,
    HighSpeed,
}

impl ConcurrencyMode {
    pub fn from_high_speed(high_speed: bool) -> Self {
        if high_speed {
            ConcurrencyMode::HighSpeed
        } else {
            ConcurrencyMode::Normal
        }
    }

    pub fn batch_size(&self) -> usize {
        match self {
            ConcurrencyMode::Normal => 3,
            ConcurrencyMode::HighSpeed => 15,
        }
    }

    pub fn batch_delay(&self) -> Duration {
        match self {
            ConcurrencyMode::Normal => Duration::from_millis(500),
            ConcurrencyMode::HighSpeed => Duration::ZERO,
        }
    }
}

/// Runs one page's classifications in bounded concurrent batches,
/// preserving input order in the output.
#[derive(Clone)]
pub struct BatchScheduler {
    classifier: Arc<dyn Classifier>,
    mode: ConcurrencyMode,
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl BatchScheduler {
    pub fn new(classifier: Arc<dyn Classifier>, mode: ConcurrencyMode) -> Self {
        Self { classifier, mode }
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    /// Classify one batch. `join_all` both bounds the fan-out to the chunk
    /// length and restores input order regardless of completion timing.
    pub async fn run_batch(&self, chunk: &[Item]) -> Vec<ScoredItem> {
        let futures = chunk.iter().map(|item| {
            let classifier = Arc::clone(&self.classifier);
            async move {
                let verdict = if item.has_name() {
                    classifier.classify(item).await
                } else {
                    // No name means nothing to grade; don't spend quota.
                    Verdict::low("-")
                };
                ScoredItem {
                    item: item.clone(),
                    verdict,
                }
            }
        });
        futures::future::join_all(futures).await
    }

    /// Classify a full page batch-by-batch. Stops early when `cancel`
    /// fires, returning the batches that already completed.
    pub async fn run_page(&self, items: &[Item], cancel: &CancellationToken) -> Vec<ScoredItem> {
        let mut results = Vec::with_capacity(items.len());

        for chunk in items.chunks(self.mode.batch_size()) {
            if cancel.is_cancelled() {
                debug!(
                    classified = results.len(),
                    remaining = items.len() - results.len(),
                    "cancellation observed between batches"
                );
                break;
            }
            results.extend(self.run_batch(chunk).await);
            let delay = self.mode.batch_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        results
    }
}
