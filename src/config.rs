//! Capture pipeline configuration.
//!
//! Values are layered:
//!   1. built-in defaults
//!   2. `<config_dir>/feedback-snip/capture.json` (missing or invalid → defaults)
//!   3. `SNIP_*` environment variables (usually from `.env` via dotenvy)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "capture.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to create config dir: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write config: {0}")]
    Write(std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Remote rendering endpoint. No server-side provider when unset.
    pub render_service_url: Option<String>,
    /// Budget for one provider attempt.
    pub provider_timeout_ms: u64,
    /// Budget for a display-stream attempt (includes the permission prompt).
    pub display_timeout_ms: u64,
    /// Wait between hiding the widget and rendering the page.
    pub settle_delay_ms: u64,
    /// Extra selectors excluded from DOM renders (own chrome is always excluded).
    pub exclude_selectors: Vec<String>,
    /// High-fidelity render scale; `None` follows the device pixel ratio.
    pub high_fidelity_scale: Option<f64>,
    pub conservative_scale: f64,
    pub background_color: Option<String>,
    pub default_color: String,
    pub default_thickness: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            render_service_url: None,
            provider_timeout_ms: 10_000,
            display_timeout_ms: 60_000,
            settle_delay_ms: 100,
            exclude_selectors: Vec::new(),
            high_fidelity_scale: None,
            conservative_scale: 1.0,
            background_color: Some("#ffffff".to_string()),
            default_color: "#ff0000".to_string(),
            default_thickness: 3,
        }
    }
}

impl CaptureConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn display_timeout(&self) -> Duration {
        Duration::from_millis(self.display_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Apply `SNIP_*` overrides from an arbitrary lookup.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SNIP_RENDER_SERVICE_URL") {
            let url = url.trim().to_string();
            self.render_service_url = if url.is_empty() { None } else { Some(url) };
        }
        override_ms(&lookup, "SNIP_PROVIDER_TIMEOUT_MS", &mut self.provider_timeout_ms);
        override_ms(&lookup, "SNIP_DISPLAY_TIMEOUT_MS", &mut self.display_timeout_ms);
        override_ms(&lookup, "SNIP_SETTLE_DELAY_MS", &mut self.settle_delay_ms);
        if let Some(color) = lookup("SNIP_DEFAULT_COLOR") {
            if !color.trim().is_empty() {
                self.default_color = color.trim().to_string();
            }
        }
    }

    /// Replace values that would break the capture chain with defaults.
    ///
    /// A zero timeout fails every provider before it starts, and a render
    /// scale must be a positive finite number. Each replacement is logged.
    pub fn sanitized(mut self) -> Self {
        let defaults = CaptureConfig::default();
        if self.provider_timeout_ms == 0 {
            log::warn!(
                "[CONFIG] providerTimeoutMs=0 ignored, using {}",
                defaults.provider_timeout_ms
            );
            self.provider_timeout_ms = defaults.provider_timeout_ms;
        }
        if self.display_timeout_ms == 0 {
            log::warn!(
                "[CONFIG] displayTimeoutMs=0 ignored, using {}",
                defaults.display_timeout_ms
            );
            self.display_timeout_ms = defaults.display_timeout_ms;
        }
        if !valid_scale(self.conservative_scale) {
            log::warn!(
                "[CONFIG] conservativeScale={} ignored, using {}",
                self.conservative_scale,
                defaults.conservative_scale
            );
            self.conservative_scale = defaults.conservative_scale;
        }
        if let Some(scale) = self.high_fidelity_scale.filter(|s| !valid_scale(*s)) {
            log::warn!(
                "[CONFIG] highFidelityScale={} ignored, following device ratio",
                scale
            );
            self.high_fidelity_scale = None;
        }
        self
    }
}

fn valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}

fn override_ms(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut u64) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<u64>() {
            Ok(v) => *field = v,
            Err(_) => log::warn!("[CONFIG] Ignoring {}={:?} (not a number)", key, raw),
        }
    }
}

/// Directory where the capture config is stored.
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feedback-snip")
}

/// Full path to the capture config file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Read a config file. Missing or invalid files fall back to defaults.
pub fn load_from(path: &Path) -> CaptureConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("[CONFIG] Invalid {}: {} — using defaults", path.display(), e);
                CaptureConfig::default()
            }
        },
        Err(_) => CaptureConfig::default(),
    }
}

/// Load the effective configuration: file, then environment overrides,
/// then sanity checks.
pub fn load_config() -> CaptureConfig {
    let mut config = load_from(&config_path());
    config.apply_overrides(|key| std::env::var(key).ok());
    config.sanitized()
}

/// Persist a configuration to `path`, creating parent directories.
pub fn save_to(path: &Path, config: &CaptureConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(ConfigError::CreateDir)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(ConfigError::Write)?;
    log::info!("[CONFIG] Saved capture config to {}", path.display());
    Ok(())
}

/// Persist a configuration to the default location.
pub fn save_config(config: &CaptureConfig) -> Result<(), ConfigError> {
    save_to(&config_path(), config)
}
