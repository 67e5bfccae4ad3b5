//! Session domain — the API boundary the widget UI consumes.
//!
//!   - controller.rs — capture_area / capture_whole_page / capture_element, cancel
//!   - handle.rs     — per-capture annotation session and the final image
//!   - chrome.rs     — scoped hiding of the widget's own UI

mod chrome;
mod controller;
mod handle;

pub use chrome::{ChromeFlag, ChromeVisibility};
pub use controller::CaptureSessionController;
pub use handle::{CaptureSessionHandle, FinalImage, FinalImageMeta};

use crate::annotate::ColorParseError;
use crate::capture::ProviderFailure;
use crate::encode::EncodeError;

/// Errors surfaced to the widget UI.
///
/// `CaptureFailed` deliberately renders one generic message; the
/// per-provider details stay available on the variant for logs.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Could not capture the screen")]
    CaptureFailed(Vec<ProviderFailure>),

    #[error("Capture cancelled")]
    Cancelled,

    #[error("Failed to encode image: {0}")]
    Encode(#[from] EncodeError),

    #[error("Invalid colour: {0}")]
    Color(#[from] ColorParseError),
}

impl SessionError {
    /// Per-provider failures behind a `CaptureFailed`, empty otherwise.
    pub fn provider_failures(&self) -> &[ProviderFailure] {
        match self {
            SessionError::CaptureFailed(failures) => failures,
            _ => &[],
        }
    }
}
