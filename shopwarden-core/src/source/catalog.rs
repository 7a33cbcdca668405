//! Remote storefront catalog source.
//!
//! Wraps the paginated item-search endpoint. One page is a fixed number of
//! items (30 on the storefront this was built against); a transport failure
//! here is surfaced to the controller rather than retried, because a shop
//! that stopped answering is a run-level problem, not an item-level one.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use shopwarden_config::CatalogConfig;
use shopwarden_model::{Item, SessionKind};
use tracing::debug;
use url::Url;

use crate::error::{PatrolError, Result};
use crate::source::{ItemPage, ItemSource, SourceDescriptor};

/// Path segments that can never be a shop code.
const IGNORED_SEGMENTS: &[&str] = &["search", "category", "event", "review", "gold"];

/// Shop-level metadata gathered from the first page, for confirm-style UIs.
#[derive(Debug, Clone)]
pub struct ShopProbe {
    pub shop_code: String,
    pub shop_name: Option<String>,
    pub total_items: u64,
}

/// Wire shape of the catalog search response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchResponse {
    items: Vec<SearchItem>,
    total_count: u64,
    page_count: u32,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    name: String,
    #[serde(default)]
    price: Option<u64>,
    #[serde(default)]
    detail_url: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    shop_name: Option<String>,
}

/// Paginated remote catalog backed by the storefront search endpoint.
#[derive(Debug)]
pub struct CatalogSource {
    http: reqwest::Client,
    config: CatalogConfig,
    shop_code: String,
    shop_url: String,
    shop_name: std::sync::Mutex<Option<String>>,
}

impl CatalogSource {
    /// Build a source from a pasted shop URL, resolving the shop code from
    /// its path.
    pub fn from_shop_url(config: CatalogConfig, shop_url: &str) -> Result<Self> {
        let shop_code = extract_shop_code(shop_url)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            shop_code,
            shop_url: shop_url.to_string(),
            shop_name: std::sync::Mutex::new(None),
        })
    }

    pub fn shop_code(&self) -> &str {
        &self.shop_code
    }

    /// Fetch page 1 and report the shop's size and display name without
    /// classifying anything.
    pub async fn probe(&self) -> Result<ShopProbe> {
        let response = self.fetch_page(1).await?;
        Ok(ShopProbe {
            shop_code: self.shop_code.clone(),
            shop_name: response.items.first().and_then(|i| i.shop_name.clone()),
            total_items: response.total_count,
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<SearchResponse> {
        let hits = self.config.page_size.to_string();
        let page_param = page.to_string();
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("targetIdentifier", self.shop_code.as_str()),
                ("applicationId", self.config.app_id.as_str()),
                ("hits", hits.as_str()),
                ("page", page_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(PatrolError::RateLimited);
        }
        if !status.is_success() {
            return Err(PatrolError::CatalogStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed = parse_search_body(&body)?;
        debug!(
            page,
            items = parsed.items.len(),
            total = parsed.total_count,
            pages = parsed.page_count,
            "catalog page fetched"
        );

        // Remember the shop display name from the first item we ever see.
        if let Some(name) = parsed.items.first().and_then(|i| i.shop_name.clone())
            && let Ok(mut slot) = self.shop_name.lock()
            && slot.is_none()
        {
            *slot = Some(name);
        }

        Ok(parsed)
    }

    fn item_cap(&self) -> u64 {
        self.config.max_items.map(u64::from).unwrap_or(u64::MAX)
    }
}

#[async_trait]
impl ItemSource for CatalogSource {
    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            kind: SessionKind::RemoteCatalog,
            target: self.shop_url.clone(),
            shop_name: self.shop_name.lock().ok().and_then(|s| s.clone()),
        }
    }

    async fn next_page(&self, cursor: u32) -> Result<ItemPage> {
        let page = cursor + 1;
        let response = self.fetch_page(page).await?;

        let items: Vec<Item> = response
            .items
            .into_iter()
            .map(|i| Item {
                name: i.name,
                image_url: i.image_url.map(|u| strip_query(&u)),
                source_reference: self.shop_url.clone(),
                detail_url: i.detail_url,
                price: i.price,
                shop_name: i.shop_name,
            })
            .collect();

        let fetched = u64::from(page) * u64::from(self.config.page_size);
        let remaining = response.total_count.min(self.item_cap());
        let has_more = !items.is_empty() && fetched < remaining;

        Ok(ItemPage {
            items,
            has_more,
            warnings: Vec::new(),
        })
    }
}

/// Resolve the shop code from a pasted shop URL.
///
/// The first path segment that is not a known non-shop segment and does
/// not start with `item` wins; item-subdomain URLs always use the first
/// segment.
pub fn extract_shop_code(shop_url: &str) -> Result<String> {
    let parsed = Url::parse(shop_url)
        .map_err(|_| PatrolError::InvalidTarget(format!("not a valid shop URL: {shop_url}")))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| PatrolError::InvalidTarget(format!("shop URL has no host: {shop_url}")))?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if host.starts_with("item.") {
        if let Some(first) = segments.first() {
            return Ok((*first).to_string());
        }
    }

    segments
        .iter()
        .find(|p| !IGNORED_SEGMENTS.contains(p) && !p.starts_with("item"))
        .map(|p| (*p).to_string())
        .ok_or_else(|| {
            PatrolError::InvalidTarget(format!("could not resolve a shop code from {shop_url}"))
        })
}

fn parse_search_body(body: &str) -> Result<SearchResponse> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|err| PatrolError::MalformedResponse(format!("catalog response: {err}")))?;

    if let Some(error) = &parsed.error {
        // An unknown shop code comes back as a parameter error; treat it
        // as an empty catalog rather than a failure.
        if error == "wrong_parameter" {
            return Ok(SearchResponse::default());
        }
        let detail = parsed.error_description.as_deref().unwrap_or(error);
        return Err(PatrolError::InvalidTarget(format!(
            "catalog rejected the request: {detail}"
        )));
    }

    Ok(parsed)
}

/// Image URLs arrive with size-hint query strings; the classifier wants
/// the bare asset.
fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}
