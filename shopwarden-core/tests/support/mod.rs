//! Shared fakes for pipeline integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use shopwarden_core::classifier::Classifier;
use shopwarden_core::error::{PatrolError, Result};
use shopwarden_core::source::{ItemPage, ItemSource, SourceDescriptor};
use shopwarden_model::{Item, RiskLevel, SessionKind, Verdict};
use tokio_util::sync::CancellationToken;

/// Classifier double with scripted verdicts, per-item latency, and an
/// optional cancellation trigger at a given call number.
#[derive(Default)]
pub struct FakeClassifier {
    delays_ms: HashMap<String, u64>,
    verdicts: HashMap<String, Verdict>,
    calls: AtomicUsize,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
}

impl FakeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, name: &str, ms: u64) -> Self {
        self.delays_ms.insert(name.to_string(), ms);
        self
    }

    pub fn with_verdict(mut self, name: &str, verdict: Verdict) -> Self {
        self.verdicts.insert(name.to_string(), verdict);
        self
    }

    /// Cancel `token` when the n-th classify call (1-based) starts.
    pub fn cancel_at_call(self, call: usize, token: CancellationToken) -> Self {
        self.arm_cancel(call, token);
        self
    }

    /// Same as [`Self::cancel_at_call`], usable after the classifier has
    /// been shared (the controller's own token only exists once the
    /// controller does).
    pub fn arm_cancel(&self, call: usize, token: CancellationToken) {
        *self.cancel_at.lock().expect("lock") = Some((call, token));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, item: &Item) -> Verdict {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &*self.cancel_at.lock().expect("lock")
            && call == *at
        {
            token.cancel();
        }
        if let Some(ms) = self.delays_ms.get(&item.name) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.verdicts
            .get(&item.name)
            .cloned()
            .unwrap_or_else(|| Verdict::new(RiskLevel::Low, false, "ok"))
    }
}

/// Remote catalog double serving fixed pages and recording the cursors it
/// was asked for.
pub struct FakeCatalogSource {
    pages: Vec<Vec<Item>>,
    requested: Mutex<Vec<u32>>,
    fail_at_page: Option<u32>,
    target: String,
}

impl FakeCatalogSource {
    pub fn new(pages: Vec<Vec<Item>>) -> Self {
        Self {
            pages,
            requested: Mutex::new(Vec::new()),
            fail_at_page: None,
            target: "https://mall.example/test-shop/".to_string(),
        }
    }

    pub fn failing_at_page(mut self, page: u32) -> Self {
        self.fail_at_page = Some(page);
        self
    }

    pub fn requested_cursors(&self) -> Vec<u32> {
        self.requested.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ItemSource for FakeCatalogSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            kind: SessionKind::RemoteCatalog,
            target: self.target.clone(),
            shop_name: Some("Test Shop".to_string()),
        }
    }

    async fn next_page(&self, cursor: u32) -> Result<ItemPage> {
        self.requested.lock().expect("lock").push(cursor);
        let page = cursor + 1;
        if self.fail_at_page == Some(page) {
            return Err(PatrolError::CatalogStatus { status: 500 });
        }
        let index = (page - 1) as usize;
        let items = self.pages.get(index).cloned().unwrap_or_default();
        let has_more = !items.is_empty() && index + 1 < self.pages.len();
        Ok(ItemPage {
            items,
            has_more,
            warnings: Vec::new(),
        })
    }
}

/// A page of `count` distinctly named items.
pub fn page_of(prefix: &str, count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| Item::bare(format!("{prefix} {i}"), "https://mall.example/test-shop/"))
        .collect()
}
