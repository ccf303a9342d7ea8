// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Browser rendering for pages that need JavaScript.
//!
//! Three traits abstract over the browser engine (currently Chromium via
//! chromiumoxide): a [`BrowserLauncher`] starts an isolated
//! [`BrowserSession`], which hands out [`RenderContext`]s (one tab each in
//! a private browsing context). The [`pipeline::RenderPipeline`] drives
//! them under the [`guard::RenderGuard`] slot limit.

pub mod chromium;
pub mod guard;
pub mod pipeline;
pub mod sweep;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to reach DOM content loaded, in milliseconds.
    pub load_time_ms: u64,
}

/// How to start one browser process.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Profile directory private to this launch.
    pub user_data_dir: PathBuf,
    pub args: Vec<String>,
    pub viewport: (u32, u32),
}

/// Hardening flags for headless Chromium in containers.
pub const LAUNCH_ARGS: &[&str] = &[
    "--headless=new",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-background-networking",
    "--disable-extensions",
    "--disable-sync",
    "--disable-translate",
    "--disable-features=TranslateUI",
    "--disable-default-apps",
    "--mute-audio",
    "--hide-scrollbars",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--disable-component-update",
    "--disable-blink-features=AutomationControlled",
    "--ignore-certificate-errors",
];

impl LaunchConfig {
    pub fn new(user_data_dir: PathBuf) -> Self {
        Self {
            user_data_dir,
            args: LAUNCH_ARGS.iter().map(|a| a.to_string()).collect(),
            viewport: (1920, 1080),
        }
    }
}

/// Per-context emulation applied before navigation.
#[derive(Debug, Clone)]
pub struct ContextProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub locale: String,
    pub timezone: String,
    pub viewport: (u32, u32),
    /// URL patterns the network layer refuses to load.
    pub blocked_urls: Vec<String>,
    /// Scripts evaluated before any page script on every new document.
    pub init_scripts: Vec<String>,
}

impl ContextProfile {
    /// Desktop zh-TW profile with a rotated user agent.
    pub fn desktop(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_language: crate::acquisition::headers::ACCEPT_LANGUAGE.to_string(),
            locale: "zh-TW".to_string(),
            timezone: "Asia/Taipei".to_string(),
            viewport: (1920, 1080),
            blocked_urls: Vec::new(),
            init_scripts: Vec::new(),
        }
    }
}

/// Starts browser processes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn BrowserSession>>;
}

/// One running browser process.
#[async_trait]
pub trait BrowserSession: Send {
    /// Create an isolated browsing context with one blank page.
    async fn new_context(&mut self, profile: &ContextProfile) -> Result<Box<dyn RenderContext>>;
    /// Dispose remaining contexts and terminate the process.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A single page inside a browsing context.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate and wait for DOM content loaded, bounded by `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Execute JavaScript in the page and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Wait until `selector` matches an element, or fail after `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;
    /// Get the full rendered HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close the page. Its browsing context goes with the session.
    async fn close(self: Box<Self>) -> Result<()>;
}
