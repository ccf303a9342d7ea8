// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Render pipeline: headless browser fetch plus content normalization.
//!
//! Every attempt holds one [`RenderGuard`] slot and runs in its own task,
//! so browser teardown finishes even when the caller stops waiting.
//! Teardown order on every path: page, browser, profile dir and temp
//! sweep, then the slot.

use super::guard::RenderGuard;
use super::sweep::TempSweeper;
use super::{BrowserLauncher, BrowserSession, ContextProfile, LaunchConfig, RenderContext};
use crate::acquisition::headers::random_user_agent;
use crate::error::{ExtractError, ExtractResult};
use crate::extraction::Normalizer;
use crate::pacing::{jittered, Sleeper};
use crate::stealth;
use crate::types::{ExtractedArticle, RenderingMethod};
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timing knobs for one render attempt.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    /// Human-like pause after load, uniform in this range (ms).
    pub human_delay_ms: (u64, u64),
    pub settle: Duration,
    pub retry_pause: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(90),
            selector_timeout: Duration::from_secs(20),
            human_delay_ms: (1000, 2500),
            settle: Duration::from_secs(2),
            retry_pause: Duration::from_secs(3),
        }
    }
}

/// Per-request render behaviour.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub wait_for_selector: Option<String>,
    pub block_ads: bool,
    pub stealth_mode: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            wait_for_selector: None,
            block_ads: true,
            stealth_mode: true,
        }
    }
}

/// Successful pipeline run.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub article: ExtractedArticle,
    /// Attempt number that succeeded (1-based).
    pub attempts: u32,
    pub final_url: String,
}

impl RenderOutcome {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

struct RenderedPage {
    html: String,
    final_url: String,
}

#[derive(Clone)]
pub struct RenderPipeline {
    launcher: Arc<dyn BrowserLauncher>,
    guard: RenderGuard,
    sweeper: TempSweeper,
    normalizer: Normalizer,
    sleeper: Arc<dyn Sleeper>,
    settings: RenderSettings,
}

impl RenderPipeline {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        guard: RenderGuard,
        sweeper: TempSweeper,
        normalizer: Normalizer,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            launcher,
            guard,
            sweeper,
            normalizer,
            sleeper,
            settings: RenderSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn guard(&self) -> &RenderGuard {
        &self.guard
    }

    /// Render `url` in a fresh headless browser and extract its article,
    /// trying up to `max_retries` times (at least once) with a pause
    /// between attempts.
    pub async fn render_and_extract(
        &self,
        url: &str,
        options: &RenderOptions,
        max_retries: u32,
    ) -> ExtractResult<RenderOutcome> {
        let max_attempts = max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let job = self.clone();
            let target = url.to_string();
            let opts = options.clone();
            let handle = tokio::spawn(async move { job.attempt(&target, &opts, attempt).await });

            match handle.await {
                Ok(Ok(page)) => {
                    let article =
                        self.normalizer
                            .normalize(&page.html, &page.final_url, RenderingMethod::Dynamic);
                    info!(
                        url = %url,
                        attempt,
                        words = article.word_count,
                        "render succeeded"
                    );
                    return Ok(RenderOutcome {
                        article,
                        attempts: attempt,
                        final_url: page.final_url,
                    });
                }
                Ok(Err(e)) => last_error = format!("{e:#}"),
                Err(e) => last_error = format!("render task aborted: {e}"),
            }

            if attempt < max_attempts {
                warn!(
                    url = %url,
                    attempt,
                    error = %last_error,
                    "render attempt failed, retrying"
                );
                self.sleeper.sleep(self.settings.retry_pause).await;
            } else {
                warn!(url = %url, attempt, error = %last_error, "render failed, giving up");
            }
        }

        Err(ExtractError::Render {
            message: format!("browser render failed: {last_error}"),
            attempts: max_attempts,
        })
    }

    /// One attempt, from slot acquisition to slot release.
    async fn attempt(&self, url: &str, options: &RenderOptions, attempt: u32) -> Result<RenderedPage> {
        let slot = self
            .guard
            .acquire()
            .await
            .map_err(|e| anyhow!("render guard closed: {e}"))?;
        let profile_dir = self.sweeper.claim_profile();
        debug!(
            url = %url,
            attempt,
            in_flight = self.guard.in_flight(),
            profile = %profile_dir.display(),
            "launching browser"
        );

        let result = match self.launcher.launch(&LaunchConfig::new(profile_dir.clone())).await {
            Ok(mut session) => {
                let result = self.drive(session.as_mut(), url, options).await;
                if let Err(e) = session.close().await {
                    warn!(url = %url, error = %e, "browser close failed");
                }
                result
            }
            Err(e) => Err(e),
        };

        self.cleanup(profile_dir).await;
        drop(slot);
        result
    }

    /// Open a context, capture the page, close the context.
    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        options: &RenderOptions,
    ) -> Result<RenderedPage> {
        let mut profile = ContextProfile::desktop(random_user_agent());
        if options.block_ads {
            profile.blocked_urls = stealth::ad_block_patterns();
        }
        if options.stealth_mode {
            profile.init_scripts.push(stealth::STEALTH_SCRIPT.to_string());
        }

        let mut ctx = session.new_context(&profile).await?;
        let result = self.capture(ctx.as_mut(), url, options).await;
        if let Err(e) = ctx.close().await {
            debug!(url = %url, error = %e, "context close failed");
        }
        result
    }

    async fn capture(
        &self,
        ctx: &mut dyn RenderContext,
        url: &str,
        options: &RenderOptions,
    ) -> Result<RenderedPage> {
        let nav = ctx.navigate(url, self.settings.navigation_timeout).await?;
        debug!(url = %url, load_ms = nav.load_time_ms, "page loaded");

        let (min_ms, max_ms) = self.settings.human_delay_ms;
        self.sleeper.sleep(jittered(min_ms, max_ms)).await;

        if options.block_ads {
            match ctx.execute_js(&stealth::ad_removal_script()).await {
                Ok(removed) => debug!(url = %url, removed = %removed, "removed ad elements"),
                Err(e) => debug!(url = %url, error = %e, "ad removal failed"),
            }
        }

        if let Some(selector) = options.wait_for_selector.as_deref() {
            if let Err(e) = ctx
                .wait_for_selector(selector, self.settings.selector_timeout)
                .await
            {
                warn!(url = %url, selector, error = %e, "selector never appeared, extracting anyway");
            }
        }

        for ratio in stealth::SCROLL_POSITIONS {
            if let Err(e) = ctx.execute_js(&stealth::scroll_script(*ratio)).await {
                debug!(url = %url, error = %e, "scroll failed");
            }
            self.sleeper.sleep(stealth::SCROLL_PAUSE).await;
        }
        self.sleeper.sleep(self.settings.settle).await;

        let html = ctx.get_html().await?;
        Ok(RenderedPage {
            html,
            final_url: nav.final_url,
        })
    }

    /// Remove this launch's profile, then sweep browser leftovers from the
    /// temp root. Profiles of renders still running are kept.
    async fn cleanup(&self, profile_dir: PathBuf) {
        let sweeper = self.sweeper.clone();
        let swept = tokio::task::spawn_blocking(move || {
            if let Err(e) = sweeper.release_profile(&profile_dir) {
                debug!(profile = %profile_dir.display(), error = %e, "profile dir not removed");
            }
            let report = sweeper.sweep();
            if report.skipped > 0 {
                debug!(skipped = report.skipped, "fresh temp entries kept for running renders");
            }
        })
        .await;
        if let Err(e) = swept {
            warn!(error = %e, "temp cleanup task failed");
        }
    }
}
