//! Risk classifier client.
//!
//! The classifier contract is infallible by design: a call that cannot
//! produce a real grade produces an [`RiskLevel::Error`] verdict instead of
//! an error, so one bad item never stops a run. All of the endpoint's
//! loose field spellings and label languages are normalized here — nothing
//! past this module ever sees a raw classifier payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopwarden_model::{Item, RiskLevel, Verdict};
use tracing::debug;

use crate::backoff;

pub mod http;

pub use http::{ClassifyEndpoint, EndpointFailure, EndpointReply, HttpClassifyEndpoint};

/// Scores one item. Implementations must be cheap to call concurrently;
/// the batch scheduler fans a whole batch out at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, item: &Item) -> Verdict;
}

/// Payload submitted to the classification endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ClassifyRequest {
    pub fn for_item(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            image_url: item.image_url.clone(),
        }
    }
}

/// Retry/normalization shell around a classification endpoint.
///
/// 429 and 5xx replies are retried with exponential backoff up to
/// `max_retries`; a timeout is recorded as an error verdict without
/// retrying (the caller may resubmit the item in a later run); anything
/// else non-2xx or unparseable degrades to an error verdict.
#[derive(Debug)]
pub struct RiskClassifier<E> {
    endpoint: E,
    max_retries: u32,
}

impl<E: ClassifyEndpoint> RiskClassifier<E> {
    pub fn new(endpoint: E, max_retries: u32) -> Self {
        Self {
            endpoint,
            max_retries,
        }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

#[async_trait]
impl<E: ClassifyEndpoint> Classifier for RiskClassifier<E> {
    async fn classify(&self, item: &Item) -> Verdict {
        let request = ClassifyRequest::for_item(item);
        let mut attempt: u32 = 0;

        loop {
            match self.endpoint.submit(&request).await {
                Ok(reply) if reply.is_success() => {
                    return match parse_verdict(&reply.body) {
                        Ok(verdict) => verdict,
                        Err(message) => Verdict::error(message),
                    };
                }
                Ok(reply) if reply.is_retryable() => {
                    if attempt >= self.max_retries {
                        return Verdict::error(format!(
                            "server busy (rate limit) after {attempt} retries"
                        ));
                    }
                    let delay = {
                        let mut rng = rand::rng();
                        backoff::jittered_delay(attempt, &mut rng)
                    };
                    debug!(
                        item = %request.name,
                        status = reply.status,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "classifier throttled; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Ok(reply) => {
                    return Verdict::error(format!(
                        "classifier returned status {}",
                        reply.status
                    ));
                }
                Err(EndpointFailure::Timeout) => return Verdict::error("timeout"),
                Err(EndpointFailure::Transport(message)) => return Verdict::error(message),
            }
        }
    }
}

/// Loosely-shaped classifier output, as the endpoint actually emits it.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "riskLevel", alias = "risk")]
    risk_level: Option<String>,
    #[serde(alias = "isCritical")]
    is_critical: Option<bool>,
    reason: Option<String>,
}

/// Normalize a classifier body into the canonical [`Verdict`] shape.
pub fn parse_verdict(body: &str) -> std::result::Result<Verdict, String> {
    let raw: RawVerdict = serde_json::from_str(body)
        .map_err(|err| format!("unparseable classifier response: {err}"))?;

    let label = raw
        .risk_level
        .ok_or_else(|| "classifier response is missing a risk level".to_string())?;
    let risk_level = parse_risk_label(&label)
        .ok_or_else(|| format!("unknown risk level: {label}"))?;

    Ok(Verdict::new(
        risk_level,
        raw.is_critical.unwrap_or(false),
        raw.reason.unwrap_or_default(),
    ))
}

/// The endpoint grades in English or Japanese depending on its prompt
/// language; both map onto the same scale.
fn parse_risk_label(label: &str) -> Option<RiskLevel> {
    match label.trim() {
        "高" => Some(RiskLevel::High),
        "中" => Some(RiskLevel::Medium),
        "低" => Some(RiskLevel::Low),
        "エラー" => Some(RiskLevel::Error),
        other => match other.to_ascii_lowercase().as_str() {
            "high" => Some(RiskLevel::High),
            "medium" => Some(RiskLevel::Medium),
            "low" => Some(RiskLevel::Low),
            "error" => Some(RiskLevel::Error),
            _ => None,
        },
    }
}
