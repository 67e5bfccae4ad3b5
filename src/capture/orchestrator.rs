//! Capture orchestrator — ordered fallback over capture providers.
//!
//! The provider list *is* the priority order. Providers run strictly one
//! after another: two of them may compete for the same OS capture
//! permission, so provider N+1 never starts before provider N has finished
//! and released whatever it acquired.

use super::{
    CaptureError, CaptureKind, CaptureProvider, CaptureRequest, DisplayCapture,
    DisplayStreamProvider, DomRenderProvider, DomRenderer, PageEnvironment, ProviderFailure,
    RawCapture, RenderProfile, ServerSideProvider,
};
use crate::config::CaptureConfig;
use crate::geometry::ViewportMetrics;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default budget for a provider that doesn't declare its own (seconds).
const ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// A successful capture plus the metrics its pixels should be mapped with:
/// the attempt's snapshot, or the viewport the provider rendered for.
#[derive(Debug, Clone)]
pub struct Captured {
    pub raw: RawCapture,
    pub metrics: ViewportMetrics,
    pub provider: String,
}

pub struct CaptureOrchestrator {
    providers: Vec<Box<dyn CaptureProvider>>,
    attempt_timeout: Duration,
}

impl Default for CaptureOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureOrchestrator {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            attempt_timeout: Duration::from_secs(ATTEMPT_TIMEOUT_SECS),
        }
    }

    /// Build the default chain:
    /// display stream → DOM render (hi-fi) → DOM render (safe) → server side.
    ///
    /// Links whose backing mechanism isn't available are left out.
    pub fn from_config(
        config: &CaptureConfig,
        display: Option<Arc<dyn DisplayCapture>>,
        renderer: Option<Arc<dyn DomRenderer>>,
    ) -> Self {
        let config = config.clone().sanitized();
        let config = &config;
        let mut orchestrator = Self::new().with_attempt_timeout(config.provider_timeout());

        if let Some(display) = display {
            orchestrator.push(Box::new(
                DisplayStreamProvider::new(display).with_timeout(config.display_timeout()),
            ));
        }

        if let Some(renderer) = renderer {
            let mut hifi = RenderProfile::high_fidelity();
            hifi.scale = config.high_fidelity_scale;
            let mut safe = RenderProfile::conservative();
            safe.scale = Some(config.conservative_scale);
            safe.background_color = config.background_color.clone();

            for profile in [hifi, safe] {
                orchestrator.push(Box::new(
                    DomRenderProvider::new(renderer.clone(), profile)
                        .with_excludes(config.exclude_selectors.clone())
                        .with_settle_delay(config.settle_delay()),
                ));
            }
        }

        if let Some(url) = &config.render_service_url {
            orchestrator.push(Box::new(ServerSideProvider::with_timeout(
                url.clone(),
                config.provider_timeout(),
            )));
        }

        log::info!(
            "[ORCHESTRATOR] Provider chain: [{}]",
            orchestrator.provider_names().join(" → ")
        );
        orchestrator
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_provider(mut self, provider: Box<dyn CaptureProvider>) -> Self {
        self.push(provider);
        self
    }

    /// Append a provider at the lowest priority.
    pub fn push(&mut self, provider: Box<dyn CaptureProvider>) {
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try each provider in order until one succeeds.
    ///
    /// Metrics are re-read from `env` before every attempt. Individual
    /// failures are logged and collected; only when every provider has
    /// failed does the caller see `AllStrategiesExhausted`.
    pub async fn capture_with_fallback(
        &self,
        kind: &CaptureKind,
        env: &dyn PageEnvironment,
    ) -> Result<Captured, CaptureError> {
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let request = CaptureRequest {
                kind: kind.clone(),
                metrics: env.metrics(),
                page_url: env.page_url(),
            };
            let budget = provider.timeout().unwrap_or(self.attempt_timeout);
            let start = Instant::now();

            // On timeout the attempt future is dropped here, which releases
            // anything it acquired before the next provider starts.
            let outcome = match tokio::time::timeout(budget, provider.capture(&request)).await {
                Ok(result) => result,
                Err(_) => Err(CaptureError::Timeout(budget)),
            };

            match outcome {
                Ok(raw) => {
                    log::info!(
                        "[ORCHESTRATOR] {} capture via '{}' (attempt {}/{}) in {}ms — {}x{} {:?}",
                        kind.label(),
                        provider.name(),
                        index + 1,
                        self.providers.len(),
                        start.elapsed().as_millis(),
                        raw.pixel_width(),
                        raw.pixel_height(),
                        raw.space_hint()
                    );
                    let metrics = raw.viewport().unwrap_or(request.metrics);
                    return Ok(Captured {
                        raw,
                        metrics,
                        provider: provider.name().to_string(),
                    });
                }
                Err(error) => {
                    log::warn!(
                        "[ORCHESTRATOR] '{}' failed after {}ms: {}",
                        provider.name(),
                        start.elapsed().as_millis(),
                        error
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        log::error!(
            "[ORCHESTRATOR] All {} providers failed for {} capture",
            failures.len(),
            kind.label()
        );
        Err(CaptureError::AllStrategiesExhausted(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{SpaceHint, StaticEnvironment};
    use async_trait::async_trait;
    use image::RgbaImage;

    struct Failing(&'static str);

    #[async_trait]
    impl CaptureProvider for Failing {
        fn name(&self) -> &str {
            self.0
        }

        async fn capture(&self, _r: &CaptureRequest) -> Result<RawCapture, CaptureError> {
            Err(CaptureError::Unsupported(format!("{} unavailable", self.0)))
        }
    }

    struct Hanging;

    #[async_trait]
    impl CaptureProvider for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        fn timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(20))
        }

        async fn capture(&self, _r: &CaptureRequest) -> Result<RawCapture, CaptureError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct Solid(u32);

    #[async_trait]
    impl CaptureProvider for Solid {
        fn name(&self) -> &str {
            "solid"
        }

        async fn capture(&self, _r: &CaptureRequest) -> Result<RawCapture, CaptureError> {
            RawCapture::new(RgbaImage::new(self.0, self.0), SpaceHint::ViewportOnly)
        }
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted_with_no_failures() {
        let result = CaptureOrchestrator::new()
            .capture_with_fallback(&CaptureKind::WholePage, &StaticEnvironment::default())
            .await;
        match result {
            Err(CaptureError::AllStrategiesExhausted(f)) => assert!(f.is_empty()),
            other => panic!("expected exhaustion, got {:?}", other.map(|c| c.provider)),
        }
    }

    #[tokio::test]
    async fn timeout_is_recorded_and_next_provider_runs() {
        let orchestrator = CaptureOrchestrator::new()
            .with_provider(Box::new(Hanging))
            .with_provider(Box::new(Solid(32)));
        let captured = orchestrator
            .capture_with_fallback(&CaptureKind::WholePage, &StaticEnvironment::default())
            .await
            .unwrap();
        assert_eq!(captured.provider, "solid");
        assert_eq!(captured.raw.pixel_width(), 32);
    }

    #[tokio::test]
    async fn exhaustion_lists_every_failure_in_order() {
        let orchestrator = CaptureOrchestrator::new()
            .with_provider(Box::new(Failing("a")))
            .with_provider(Box::new(Hanging))
            .with_provider(Box::new(Failing("c")));
        let err = orchestrator
            .capture_with_fallback(&CaptureKind::WholePage, &StaticEnvironment::default())
            .await
            .unwrap_err();
        let CaptureError::AllStrategiesExhausted(failures) = err else {
            panic!("expected exhaustion");
        };
        let names: Vec<_> = failures.iter().map(|f| f.provider.as_str()).collect();
        assert_eq!(names, ["a", "hanging", "c"]);
        assert!(matches!(failures[1].error, CaptureError::Timeout(_)));
    }

    #[test]
    fn from_config_orders_chain_by_fidelity() {
        struct NoDisplay;
        #[async_trait]
        impl DisplayCapture for NoDisplay {
            async fn request_capture(
                &self,
                _r: crate::capture::SurfaceRequest,
            ) -> Result<Box<dyn crate::capture::MediaStream>, CaptureError> {
                Err(CaptureError::Unsupported("none".to_string()))
            }
        }
        struct NoRender;
        #[async_trait]
        impl DomRenderer for NoRender {
            async fn render(
                &self,
                _o: &crate::capture::RenderOptions,
            ) -> Result<RgbaImage, CaptureError> {
                Err(CaptureError::RenderFailure("none".to_string()))
            }
        }

        let config = CaptureConfig {
            render_service_url: Some("http://render.local".to_string()),
            ..Default::default()
        };
        let orchestrator =
            CaptureOrchestrator::from_config(&config, Some(Arc::new(NoDisplay)), Some(Arc::new(NoRender)));
        assert_eq!(
            orchestrator.provider_names(),
            ["display-stream", "dom-render-hifi", "dom-render-safe", "server-side"]
        );

        let bare = CaptureOrchestrator::from_config(&CaptureConfig::default(), None, None);
        assert!(bare.is_empty());
    }

    #[test]
    fn from_config_ignores_zero_attempt_timeout() {
        let config = CaptureConfig {
            provider_timeout_ms: 0,
            ..Default::default()
        };
        let orchestrator = CaptureOrchestrator::from_config(&config, None, None);
        assert_eq!(orchestrator.attempt_timeout, Duration::from_secs(ATTEMPT_TIMEOUT_SECS));
    }
}
