//! Remote rendering service provider.
//!
//! Last resort in the chain: most compatible, lowest fidelity. The service
//! loads the page URL in its own browser and returns a screenshot, so the
//! result knows nothing about the user's scroll position or window.
//!
//! Wire format:
//!   POST {"url": "...", "fullPage": true}
//!   → 200 {"image": "data:image/png;base64,..."}

use super::{CaptureError, CaptureKind, CaptureProvider, CaptureRequest, RawCapture, SpaceHint};
use crate::encode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default timeout for a remote render (seconds).
const RENDER_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderServiceRequest<'a> {
    url: &'a str,
    full_page: bool,
}

#[derive(Debug, Deserialize)]
struct RenderServiceResponse {
    image: String,
}

pub struct ServerSideProvider {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ServerSideProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, Duration::from_secs(RENDER_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> CaptureError {
        if e.is_timeout() {
            CaptureError::Timeout(self.timeout)
        } else if e.is_connect() {
            CaptureError::Unsupported(format!("Render service unreachable: {}", e))
        } else {
            CaptureError::RenderFailure(format!("Render service request failed: {}", e))
        }
    }
}

#[async_trait]
impl CaptureProvider for ServerSideProvider {
    fn name(&self) -> &str {
        "server-side"
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture, CaptureError> {
        let url = request
            .page_url
            .as_deref()
            .ok_or_else(|| CaptureError::Unsupported("No page URL to render".to_string()))?;
        let body = RenderServiceRequest {
            url,
            full_page: matches!(request.kind, CaptureKind::WholePage),
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::RenderFailure(format!(
                "Render service returned {}",
                status
            )));
        }

        let payload: RenderServiceResponse = response
            .json()
            .await
            .map_err(|e| CaptureError::RenderFailure(format!("Bad render response: {}", e)))?;
        let network_ms = start.elapsed().as_millis();

        let bytes = encode::decode_data_url(&payload.image)
            .map_err(|e| CaptureError::RenderFailure(e.to_string()))?;
        let bitmap =
            encode::decode_image(&bytes).map_err(|e| CaptureError::RenderFailure(e.to_string()))?;

        log::info!(
            "[CAPTURE] server-side: {}x{} ({} bytes) network={}ms total={}ms",
            bitmap.width(),
            bitmap.height(),
            bytes.len(),
            network_ms,
            start.elapsed().as_millis()
        );
        RawCapture::new(bitmap, SpaceHint::Unknown)
    }
}
