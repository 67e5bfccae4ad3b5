//! Capture error taxonomy.

use std::time::Duration;

/// Why a capture attempt failed.
///
/// The first four variants come from individual providers. The orchestrator
/// swallows them and only ever returns `AllStrategiesExhausted` upward.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture mechanism unavailable: {0}")]
    Unsupported(String),

    #[error("Capture timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Render failed: {0}")]
    RenderFailure(String),

    #[error("All {} capture strategies failed", .0.len())]
    AllStrategiesExhausted(Vec<ProviderFailure>),
}

/// One provider's failure, as recorded by the orchestrator.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: CaptureError,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}
