// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fakes for the integration tests.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use newsparse_runtime::acquisition::http_client::StaticPipeline;
use newsparse_runtime::extraction::Normalizer;
use newsparse_runtime::pacing::Sleeper;
use newsparse_runtime::renderer::guard::RenderGuard;
use newsparse_runtime::renderer::pipeline::RenderPipeline;
use newsparse_runtime::renderer::sweep::TempSweeper;
use newsparse_runtime::renderer::{
    BrowserLauncher, BrowserSession, ContextProfile, LaunchConfig, NavigationResult, RenderContext,
};
use newsparse_runtime::routing::{DomainClassifier, DomainPolicy};
use newsparse_runtime::Orchestrator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ARTICLE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Harbour Bridge Reopens | Example News</title>
  <meta property="og:title" content="Harbour Bridge Reopens">
  <meta name="author" content="Jane Reporter">
  <meta property="article:published_time" content="2024-03-05T08:00:00Z">
</head>
<body>
  <nav><a href="/">Home</a></nav>
  <article>
    <h1>Harbour Bridge Reopens</h1>
    <p>The harbour bridge reopened to traffic on Tuesday after six months of repairs.</p>
    <p>Commuters said the closure had doubled their travel time across the city.</p>
  </article>
  <footer>Copyright Example News</footer>
</body>
</html>"#;

pub const EMPTY_HTML: &str = "<html><head></head><body></body></html>";

/// Records every requested pause instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

/// What the fake browser does.
#[derive(Clone)]
pub enum Behavior {
    Serve(String),
    FailNavigate,
    FailLaunch,
}

/// Observations shared by every fake session and page.
#[derive(Clone, Default)]
pub struct Spy {
    pub events: Arc<Mutex<Vec<String>>>,
    pub launches: Arc<AtomicUsize>,
    pub live: Arc<AtomicUsize>,
    pub peak_live: Arc<AtomicUsize>,
}

impl Spy {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    fn record(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

pub struct FakeLauncher {
    behavior: Behavior,
    /// Real time spent in navigation, to keep slots busy.
    hold: Duration,
    spy: Spy,
}

impl FakeLauncher {
    pub fn new(behavior: Behavior, spy: Spy) -> Self {
        Self {
            behavior,
            hold: Duration::ZERO,
            spy,
        }
    }

    pub fn holding(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn BrowserSession>> {
        self.spy.launches.fetch_add(1, Ordering::SeqCst);
        if matches!(self.behavior, Behavior::FailLaunch) {
            self.spy.record("launch failed");
            return Err(anyhow!("failed to launch Chromium: no such file"));
        }
        // A real browser populates its profile on start.
        std::fs::create_dir_all(&config.user_data_dir)?;
        std::fs::write(config.user_data_dir.join("Local State"), b"{}")?;
        let live = self.spy.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.spy.peak_live.fetch_max(live, Ordering::SeqCst);
        self.spy.record("launch");
        Ok(Box::new(FakeSession {
            behavior: self.behavior.clone(),
            hold: self.hold,
            spy: self.spy.clone(),
        }))
    }
}

struct FakeSession {
    behavior: Behavior,
    hold: Duration,
    spy: Spy,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_context(&mut self, _profile: &ContextProfile) -> Result<Box<dyn RenderContext>> {
        self.spy.record("context");
        Ok(Box::new(FakeContext {
            behavior: self.behavior.clone(),
            hold: self.hold,
            spy: self.spy.clone(),
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.spy.live.fetch_sub(1, Ordering::SeqCst);
        self.spy.record("browser close");
        Ok(())
    }
}

struct FakeContext {
    behavior: Behavior,
    hold: Duration,
    spy: Spy,
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }
        match self.behavior {
            Behavior::FailNavigate => Err(anyhow!(
                "navigation timed out after {}ms",
                timeout.as_millis()
            )),
            _ => Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: self.hold.as_millis() as u64,
            }),
        }
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn get_html(&self) -> Result<String> {
        match &self.behavior {
            Behavior::Serve(html) => Ok(html.clone()),
            _ => Err(anyhow!("page has no content")),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.spy.record("context close");
        Ok(())
    }
}

pub fn render_pipeline(
    launcher: FakeLauncher,
    limit: usize,
    sweep_root: &std::path::Path,
    sleeper: Arc<dyn Sleeper>,
) -> RenderPipeline {
    RenderPipeline::new(
        Arc::new(launcher),
        RenderGuard::new(limit),
        TempSweeper::new(sweep_root),
        Normalizer::default(),
        sleeper,
    )
}

/// Orchestrator over a custom policy, a recording sleeper, and a fake browser.
pub fn orchestrator(
    policy: DomainPolicy,
    behavior: Behavior,
    spy: Spy,
    sweep_root: &std::path::Path,
) -> (Orchestrator, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let static_pipeline = StaticPipeline::new(Normalizer::default(), sleeper.clone()).unwrap();
    let render_pipeline = render_pipeline(
        FakeLauncher::new(behavior, spy),
        2,
        sweep_root,
        sleeper.clone(),
    );
    let orchestrator = Orchestrator::new(
        Arc::new(DomainClassifier::new(policy)),
        static_pipeline,
        render_pipeline,
    );
    (orchestrator, sleeper)
}

pub fn policy(blocked: &[&str], dynamic: &[&str], static_ok: &[&str]) -> DomainPolicy {
    DomainPolicy::new(blocked.to_vec(), dynamic.to_vec(), static_ok.to_vec()).unwrap()
}
