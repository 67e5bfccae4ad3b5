//! feedback-snip — capture-and-annotate core for in-page feedback widgets.
//!
//! No UI lives here. The widget supplies selections and pointer events;
//! this crate turns them into an annotated PNG.
//!
//! Domains:
//!   - capture/   — capture providers and the fallback orchestrator
//!   - crop/      — selection → capture-pixel reconciliation and cropping
//!   - annotate/  — drawing state machine, rasterization, flattening
//!   - session/   — the controller façade and per-capture handles
//!   - geometry.rs, encode.rs, config.rs — shared value types and helpers

pub mod annotate;
pub mod capture;
pub mod config;
pub mod crop;
pub mod encode;
pub mod geometry;
pub mod session;

pub use annotate::{AnnotationPrimitive, Color, Tool};
pub use capture::{CaptureError, CaptureOrchestrator, ElementRef, PageEnvironment, RawCapture, SpaceHint};
pub use crop::{CropOutcome, CropStatus};
pub use geometry::{PixelRect, Point, SelectionRect, ViewportMetrics};
pub use session::{
    CaptureSessionController, CaptureSessionHandle, ChromeFlag, ChromeVisibility, FinalImage,
    SessionError,
};

/// Process-level setup for hosts embedding the crate.
///
/// Loads `.env.local`, else `.env`, from the working directory, then
/// installs `env_logger`. Safe to call more than once; a logger installed
/// by the host wins.
pub fn init() {
    'env_load: for env_file in [".env.local", ".env"] {
        let path = std::path::Path::new(env_file);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break 'env_load;
        }
    }

    if env_logger::try_init().is_err() {
        log::debug!("[STARTUP] Logger already installed");
    }
}
