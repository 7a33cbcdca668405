//! HTTP transport for the risk classifier.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::json;
use shopwarden_config::ClassifierConfig;
use tracing::warn;

use crate::classifier::ClassifyRequest;
use crate::error::Result;

/// Raw reply from a classification endpoint, before normalization.
#[derive(Debug, Clone)]
pub struct EndpointReply {
    pub status: u16,
    pub body: String,
}

impl EndpointReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 429 and 5xx replies are worth retrying; everything else is not.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || self.status >= 500
    }
}

/// Transport-level failure of one submission attempt.
#[derive(Debug, Clone)]
pub enum EndpointFailure {
    /// The call exceeded the per-request timeout. Not retried by the
    /// client; the verdict records it and the caller may resubmit later.
    Timeout,
    Transport(String),
}

/// One submission attempt against a classification endpoint. The seam the
/// retry shell is tested through.
#[async_trait]
pub trait ClassifyEndpoint: Send + Sync {
    async fn submit(
        &self,
        request: &ClassifyRequest,
    ) -> std::result::Result<EndpointReply, EndpointFailure>;
}

/// Production endpoint: POSTs the item to the configured classifier URL,
/// resolving the image reference to embedded bytes when one is present.
#[derive(Debug)]
pub struct HttpClassifyEndpoint {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpClassifyEndpoint {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Fetch the listing image and inline it as base64. A broken image is
    /// never worth failing the item over; classification proceeds on the
    /// name alone.
    async fn resolve_image(&self, image_url: &str) -> Option<serde_json::Value> {
        let response = match self.http.get(image_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(image_url, status = %response.status(), "image fetch refused; classifying without image");
                return None;
            }
            Err(err) => {
                warn!(image_url, error = %err, "image fetch failed; classifying without image");
                return None;
            }
        };

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        match response.bytes().await {
            Ok(bytes) => Some(json!({
                "data": BASE64.encode(&bytes),
                "mimeType": mime_type,
            })),
            Err(err) => {
                warn!(image_url, error = %err, "image body read failed; classifying without image");
                None
            }
        }
    }
}

#[async_trait]
impl ClassifyEndpoint for HttpClassifyEndpoint {
    async fn submit(
        &self,
        request: &ClassifyRequest,
    ) -> std::result::Result<EndpointReply, EndpointFailure> {
        let mut payload = json!({ "name": request.name });
        if let Some(image_url) = &request.image_url
            && let Some(image) = self.resolve_image(image_url).await
        {
            payload["imageReference"] = image;
        }

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    EndpointFailure::Timeout
                } else {
                    EndpointFailure::Transport(err.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                EndpointFailure::Timeout
            } else {
                EndpointFailure::Transport(err.to_string())
            }
        })?;

        Ok(EndpointReply { status, body })
    }
}
