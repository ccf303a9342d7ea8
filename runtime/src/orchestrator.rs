// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Routing state machine tying the classifier and both pipelines together.
//!
//! ```text
//! classified ─┬─ block ─────────────► result (no network)
//!             ├─ dynamic ───────────► render ─► dynamic_direct
//!             ├─ static ────────────► fetch  ─► static_only
//!             └─ try_static_first ──► fetch (1 attempt)
//!                                      ├─ usable text ─► static_success
//!                                      └─ degraded | failed ─► render ─► fallback_to_dynamic
//! ```

use crate::acquisition::http_client::{FetchOutcome, StaticPipeline};
use crate::config::RuntimeConfig;
use crate::error::{ExtractError, ExtractResult};
use crate::extraction::Normalizer;
use crate::pacing::{Sleeper, TokioSleeper};
use crate::renderer::chromium::ChromiumLauncher;
use crate::renderer::guard::RenderGuard;
use crate::renderer::pipeline::{RenderOptions, RenderPipeline};
use crate::renderer::sweep::TempSweeper;
use crate::routing::{DomainClassifier, DomainPolicy, RoutingAction};
use crate::types::{ExtractionRequest, ExtractionResult, RoutingOutcome};
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters of the static failure kept on a fallback result.
pub const STATIC_ERROR_CHARS: usize = 100;

/// Static attempts allowed before escalating an unknown domain.
const STATIC_FIRST_RETRIES: u32 = 1;

/// How the capped static attempt for an unknown domain ended.
#[derive(Debug)]
pub enum StaticAttempt {
    /// Fetched and produced article text.
    Usable(FetchOutcome),
    /// Fetched fine but no text came out. Escalates.
    Degraded(FetchOutcome),
    /// Pipeline gave up. Escalates.
    Failed(ExtractError),
}

impl StaticAttempt {
    pub fn from_result(result: ExtractResult<FetchOutcome>) -> Self {
        match result {
            Ok(out) if out.article.has_text() => StaticAttempt::Usable(out),
            Ok(out) => StaticAttempt::Degraded(out),
            Err(e) => StaticAttempt::Failed(e),
        }
    }

    /// Why this attempt escalates, `None` when it does not.
    pub fn escalation_reason(&self) -> Option<String> {
        match self {
            StaticAttempt::Usable(_) => None,
            StaticAttempt::Degraded(out) => Some(format!(
                "static fetch returned no article text (HTTP {})",
                out.status
            )),
            StaticAttempt::Failed(e) => Some(e.to_string()),
        }
    }
}

/// Entry point for one extraction request.
#[derive(Clone)]
pub struct Orchestrator {
    classifier: Arc<DomainClassifier>,
    static_pipeline: StaticPipeline,
    render_pipeline: RenderPipeline,
    render_retries: u32,
}

impl Orchestrator {
    pub fn new(
        classifier: Arc<DomainClassifier>,
        static_pipeline: StaticPipeline,
        render_pipeline: RenderPipeline,
    ) -> Self {
        Self {
            classifier,
            static_pipeline,
            render_pipeline,
            render_retries: 2,
        }
    }

    pub fn with_render_retries(mut self, render_retries: u32) -> Self {
        self.render_retries = render_retries.max(1);
        self
    }

    /// Production wiring: policy file or built-in tables, Chromium
    /// launcher, tokio timers.
    pub fn from_config(config: &RuntimeConfig) -> anyhow::Result<Self> {
        let policy = match &config.policy_file {
            Some(path) => DomainPolicy::load(path)
                .with_context(|| format!("failed to load domain policy {}", path.display()))?,
            None => DomainPolicy::builtin(),
        };
        let normalizer = Normalizer::default();
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

        let static_pipeline = StaticPipeline::new(normalizer.clone(), Arc::clone(&sleeper))
            .context("failed to build HTTP clients")?;
        let render_pipeline = RenderPipeline::new(
            Arc::new(ChromiumLauncher::new(config.chromium_path.clone())),
            RenderGuard::new(config.max_concurrent_renders),
            TempSweeper::new(config.temp_dir.clone()),
            normalizer,
            sleeper,
        );

        Ok(Self::new(
            Arc::new(DomainClassifier::new(policy)),
            static_pipeline,
            render_pipeline,
        )
        .with_render_retries(config.render_retries))
    }

    pub fn classifier(&self) -> &DomainClassifier {
        &self.classifier
    }

    pub fn render_guard(&self) -> &RenderGuard {
        self.render_pipeline.guard()
    }

    /// Classify, dispatch, and return the single result envelope. The
    /// request is expected to be validated already.
    pub async fn extract(&self, req: &ExtractionRequest) -> ExtractionResult {
        let decision = self.classifier.classify(&req.url);
        info!(
            url = %req.url,
            action = ?decision.action,
            reason = %decision.reason,
            "routing decision"
        );

        match decision.action {
            RoutingAction::Block => ExtractionResult::blocked(&decision),
            RoutingAction::Dynamic => self
                .render(req, RoutingOutcome::DynamicDirect)
                .await
                .with_suggestion(decision.suggestion),
            RoutingAction::Static => {
                self.fetch(req, req.retry_budget(), RoutingOutcome::StaticOnly)
                    .await
            }
            RoutingAction::TryStaticFirst => self.static_first(req).await,
        }
    }

    /// Lightweight pipeline only, no classification.
    pub async fn extract_static(&self, req: &ExtractionRequest) -> ExtractionResult {
        self.fetch(req, req.retry_budget(), RoutingOutcome::StaticOnly)
            .await
    }

    /// Render pipeline only, no classification.
    pub async fn extract_dynamic(&self, req: &ExtractionRequest) -> ExtractionResult {
        self.render(req, RoutingOutcome::DynamicDirect).await
    }

    async fn static_first(&self, req: &ExtractionRequest) -> ExtractionResult {
        let attempt = StaticAttempt::from_result(
            self.static_pipeline
                .fetch_and_extract(
                    &req.url,
                    req.retry_budget().min(STATIC_FIRST_RETRIES),
                    req.skip_ssl_verification,
                )
                .await,
        );

        let reason = match attempt {
            StaticAttempt::Usable(out) => {
                return ExtractionResult::succeeded(
                    out.article,
                    out.attempts,
                    RoutingOutcome::StaticSuccess,
                )
            }
            other => other
                .escalation_reason()
                .unwrap_or_else(|| "static fetch unusable".to_string()),
        };

        info!(url = %req.url, static_error = %reason, "escalating to browser render");
        self.render(req, RoutingOutcome::FallbackToDynamic)
            .await
            .with_static_error(truncate_chars(&reason, STATIC_ERROR_CHARS))
    }

    async fn fetch(
        &self,
        req: &ExtractionRequest,
        max_retries: u32,
        outcome: RoutingOutcome,
    ) -> ExtractionResult {
        match self
            .static_pipeline
            .fetch_and_extract(&req.url, max_retries, req.skip_ssl_verification)
            .await
        {
            Ok(out) => ExtractionResult::succeeded(out.article, out.attempts, outcome),
            Err(e) => {
                warn!(url = %req.url, code = e.code(), error = %e, "static extraction failed");
                ExtractionResult::failed(&e, outcome)
            }
        }
    }

    async fn render(&self, req: &ExtractionRequest, outcome: RoutingOutcome) -> ExtractionResult {
        let options = RenderOptions {
            wait_for_selector: req.wait_for_selector.clone(),
            block_ads: req.block_ads,
            stealth_mode: req.stealth_mode,
        };
        match self
            .render_pipeline
            .render_and_extract(&req.url, &options, self.render_retries)
            .await
        {
            Ok(out) => ExtractionResult::succeeded(out.article, out.attempts, outcome),
            Err(e) => {
                warn!(url = %req.url, code = e.code(), error = %e, "render extraction failed");
                ExtractionResult::failed(&e, outcome)
            }
        }
    }
}

/// First `max` characters of `s`, cut on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractedArticle, RenderingMethod};

    fn outcome(text: Option<&str>) -> FetchOutcome {
        let mut article = ExtractedArticle::empty(RenderingMethod::Static);
        article.text_content = text.map(str::to_string);
        FetchOutcome {
            article,
            attempts: 1,
            final_url: "https://example.com/".into(),
            status: 200,
        }
    }

    #[test]
    fn test_static_attempt_classification() {
        assert!(matches!(
            StaticAttempt::from_result(Ok(outcome(Some("body text")))),
            StaticAttempt::Usable(_)
        ));
        let degraded = StaticAttempt::from_result(Ok(outcome(Some("   "))));
        assert!(matches!(degraded, StaticAttempt::Degraded(_)));
        assert!(degraded
            .escalation_reason()
            .unwrap()
            .contains("no article text"));

        let failed = StaticAttempt::from_result(Err(ExtractError::Fetch {
            message: "HTTP 503".into(),
            attempts: 1,
        }));
        assert_eq!(failed.escalation_reason().as_deref(), Some("HTTP 503"));
        assert!(StaticAttempt::from_result(Ok(outcome(None)))
            .escalation_reason()
            .is_some());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 100), "short");
        let long = "é".repeat(150);
        let cut = truncate_chars(&long, STATIC_ERROR_CHARS);
        assert_eq!(cut.chars().count(), 100);
    }
}
