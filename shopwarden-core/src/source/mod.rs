//! Item sources: ordered, lazily-paginated producers of candidate items.

use async_trait::async_trait;
use shopwarden_model::{Item, SessionKind};

use crate::error::Result;

pub mod bulk;
pub mod catalog;

pub use bulk::{BulkEncoding, BulkFileSource};
pub use catalog::{CatalogSource, ShopProbe};

/// One unit of retrieval from a source.
#[derive(Debug, Clone, Default)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Whether another page may follow. False on an empty page or once the
    /// configured maximum item count has been reached.
    pub has_more: bool,
    /// Non-fatal problems encountered while producing this page, such as a
    /// bulk file that failed to parse and was skipped.
    pub warnings: Vec<String>,
}

/// Identity of a source, used by the controller to seed the session record.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub kind: SessionKind,
    pub target: String,
    pub shop_name: Option<String>,
}

/// An ordered, lazily-paginated sequence of candidate items.
///
/// `cursor` is the last fully processed page index; implementations serve
/// the page after it. Transport failures are surfaced, not retried here —
/// the controller decides whether a failed fetch aborts the run.
#[async_trait]
pub trait ItemSource: Send + Sync {
    fn descriptor(&self) -> SourceDescriptor;

    async fn next_page(&self, cursor: u32) -> Result<ItemPage>;
}
