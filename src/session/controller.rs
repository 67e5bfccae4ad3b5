//! Capture session controller — the façade the widget UI talks to.
//!
//! Owns the provider chain, the page environment and the chrome switch.
//! Each call runs capture → crop and hands back an annotation session.

use super::chrome::{ChromeLease, ChromeVisibility};
use super::handle::CaptureSessionHandle;
use super::SessionError;
use crate::capture::{
    CaptureError, CaptureKind, CaptureOrchestrator, ElementRef, PageEnvironment, ProviderFailure,
};
use crate::config::CaptureConfig;
use crate::crop::{crop_area, crop_whole};
use crate::geometry::SelectionRect;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// The capture currently running: its sequence number and cancel token.
type Slot = Arc<Mutex<Option<(u64, CancellationToken)>>>;

pub struct CaptureSessionController {
    orchestrator: CaptureOrchestrator,
    env: Arc<dyn PageEnvironment>,
    chrome: Arc<ChromeLease>,
    config: CaptureConfig,
    in_flight: Slot,
    next_id: AtomicU64,
}

/// Clears the in-flight slot when a capture call ends, however it ends.
struct InFlight {
    slot: Slot,
    id: u64,
    token: CancellationToken,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        // A newer capture may already own the slot.
        if matches!(slot.as_ref(), Some((id, _)) if *id == self.id) {
            *slot = None;
        }
    }
}

impl CaptureSessionController {
    pub fn new(
        orchestrator: CaptureOrchestrator,
        env: Arc<dyn PageEnvironment>,
        chrome: Arc<dyn ChromeVisibility>,
    ) -> Self {
        Self {
            orchestrator,
            env,
            chrome: ChromeLease::new(chrome),
            config: CaptureConfig::default(),
            in_flight: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Use `config` for session defaults (colour, stroke width).
    pub fn with_config(mut self, config: CaptureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    /// Capture the user-dragged area. The widget chrome is hidden meanwhile.
    pub async fn capture_area(
        &self,
        selection: SelectionRect,
    ) -> Result<CaptureSessionHandle, SessionError> {
        self.run(CaptureKind::Area(selection)).await
    }

    /// Capture the whole page. No cropping.
    pub async fn capture_whole_page(&self) -> Result<CaptureSessionHandle, SessionError> {
        self.run(CaptureKind::WholePage).await
    }

    /// Capture a single element, cropped to its page bounds.
    pub async fn capture_element(
        &self,
        element: &ElementRef,
    ) -> Result<CaptureSessionHandle, SessionError> {
        self.run(CaptureKind::Element(element.clone())).await
    }

    /// Cancel the capture in flight, if any. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        let slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some((_, token)) => {
                log::info!("[SESSION] Cancel requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    async fn run(&self, kind: CaptureKind) -> Result<CaptureSessionHandle, SessionError> {
        let in_flight = self.begin();
        let token = in_flight.token.clone();

        // Dropped on every exit path below. The chrome comes back once no
        // capture holds the lease any more.
        let _chrome = match kind {
            CaptureKind::WholePage => None,
            _ => Some(self.chrome.hide()),
        };

        log::info!("[SESSION] Starting {} capture", kind.label());
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::info!("[SESSION] {} capture cancelled", kind.label());
                return Err(SessionError::Cancelled);
            }
            result = self.orchestrator.capture_with_fallback(&kind, self.env.as_ref()) => result,
        };

        let captured = result.map_err(|e| match e {
            CaptureError::AllStrategiesExhausted(failures) => SessionError::CaptureFailed(failures),
            other => SessionError::CaptureFailed(vec![ProviderFailure {
                provider: "orchestrator".to_string(),
                error: other,
            }]),
        })?;

        let outcome = match kind.region() {
            Some(selection) => crop_area(&captured.raw, &selection, &captured.metrics),
            None => crop_whole(&captured.raw),
        };
        if outcome.is_degraded() {
            log::warn!("[SESSION] Crop degraded to center fallback");
        }
        Ok(CaptureSessionHandle::new(outcome, captured.provider, &self.config))
    }

    /// Register a fresh token for this call, cancelling any older capture.
    fn begin(&self) -> InFlight {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((_, previous)) = slot.replace((id, token.clone())) {
            log::warn!("[SESSION] New capture supersedes one still in flight");
            previous.cancel();
        }
        InFlight {
            slot: self.in_flight.clone(),
            id,
            token,
        }
    }
}
