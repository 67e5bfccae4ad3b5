//! Capture provider trait — common interface for every capture mechanism.
//!
//! Each mechanism implements this trait. The orchestrator walks an ordered
//! list of them and takes the first success.

use super::{CaptureError, CaptureRequest, RawCapture};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Stable name used in logs and failure lists.
    fn name(&self) -> &str;

    /// Per-provider time budget. `None` uses the orchestrator default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Produce one frame. Must release any OS resource it acquired before
    /// returning, on success and on failure.
    async fn capture(&self, request: &CaptureRequest) -> Result<RawCapture, CaptureError>;
}
