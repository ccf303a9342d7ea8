// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium backend using chromiumoxide.

use super::{BrowserLauncher, BrowserSession, ContextProfile, LaunchConfig, NavigationResult, RenderContext};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetTimezoneOverrideParams,
    SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. NEWSPARSE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("NEWSPARSE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.newsparse/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".newsparse/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".newsparse/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".newsparse/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".newsparse/chromium/chrome-linux64/chrome"),
                home.join(".newsparse/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one headless Chromium per call.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &LaunchConfig) -> Result<Box<dyn BrowserSession>> {
        let chrome_path = self
            .executable
            .clone()
            .or_else(find_chromium)
            .context("Chromium not found. Set NEWSPARSE_CHROMIUM_PATH or install Chromium.")?;

        let (width, height) = config.viewport;
        let browser_config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(&config.user_data_dir)
            .viewport(Some(Viewport {
                width,
                height,
                device_scale_factor: Some(1.0),
                ..Default::default()
            }))
            .args(config.args.iter().cloned())
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "chromium handler event error");
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler,
            contexts: Vec::new(),
        }))
    }
}

/// A running Chromium process.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    contexts: Vec<BrowserContextId>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_context(&mut self, profile: &ContextProfile) -> Result<Box<dyn RenderContext>> {
        let context_id = self
            .browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .context("failed to create browser context")?;
        self.contexts.push(context_id.clone());

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(|e| anyhow!("failed to build target params: {e}"))?;

        let page = self
            .browser
            .new_page(target)
            .await
            .context("failed to create new page")?;

        apply_profile(&page, profile).await?;

        Ok(Box::new(ChromiumContext { page }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            handler,
            contexts,
        } = *self;

        for id in contexts {
            if let Err(e) = browser.dispose_browser_context(id).await {
                debug!(error = %e, "failed to dispose browser context");
            }
        }

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "failed to reap Chromium process");
        }
        handler.abort();

        closed.map(|_| ()).context("failed to close Chromium")
    }
}

/// Emulation, ad blocking and init scripts for a fresh page.
async fn apply_profile(page: &Page, profile: &ContextProfile) -> Result<()> {
    let ua = SetUserAgentOverrideParams::builder()
        .user_agent(profile.user_agent.clone())
        .accept_language(profile.accept_language.clone())
        .build()
        .map_err(|e| anyhow!("failed to build user agent override: {e}"))?;
    page.execute(ua).await.context("failed to override user agent")?;

    let (width, height) = profile.viewport;
    page.execute(SetDeviceMetricsOverrideParams::new(
        width as i64,
        height as i64,
        1.0,
        false,
    ))
    .await
    .context("failed to set viewport")?;

    page.execute(SetTimezoneOverrideParams::new(profile.timezone.clone()))
        .await
        .context("failed to set timezone")?;

    page.execute(SetLocaleOverrideParams {
        locale: Some(profile.locale.clone()),
    })
    .await
    .context("failed to set locale")?;

    if !profile.blocked_urls.is_empty() {
        page.execute(EnableParams::default())
            .await
            .context("failed to enable network domain")?;
        page.execute(SetBlockedUrLsParams::new(profile.blocked_urls.clone()))
            .await
            .context("failed to install blocked URL list")?;
    }

    for script in &profile.init_scripts {
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(script.clone()))
            .await
            .context("failed to inject init script")?;
    }

    Ok(())
}

/// A single Chromium page in its own browsing context.
pub struct ChromiumContext {
    page: Page,
}

impl ChromiumContext {
    async fn ready_state(&self) -> Option<String> {
        let result = self.page.evaluate("document.readyState").await.ok()?;
        result.into_value::<String>().ok()
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();

        let navigation = async {
            let resp = self
                .page
                .execute(NavigateParams::new(url))
                .await
                .context("navigation failed")?;
            if let Some(err) = resp.result.error_text.as_ref() {
                bail!("navigation failed: {err}");
            }

            // DOM content loaded, not network idle
            loop {
                match self.ready_state().await.as_deref() {
                    Some("interactive") | Some("complete") => break,
                    _ => tokio::time::sleep(POLL_INTERVAL).await,
                }
            }
            Ok(())
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }

        let final_url = self
            .page
            .url()
            .await
            .unwrap_or_default()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                bail!(
                    "selector '{selector}' not found after {}ms",
                    timeout.as_millis()
                );
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("failed to close page")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_read_html() {
        let dir = tempfile::tempdir().unwrap();
        let config = LaunchConfig::new(dir.path().join("profile"));
        let launcher = ChromiumLauncher::default();
        let mut session = launcher.launch(&config).await.expect("launch failed");
        let mut ctx = session
            .new_context(&ContextProfile::desktop("Mozilla/5.0 test"))
            .await
            .expect("failed to create context");

        let nav = ctx
            .navigate(
                "data:text/html,<h1>Hello</h1><p>World</p>",
                Duration::from_secs(10),
            )
            .await
            .expect("navigation failed");
        assert!(nav.load_time_ms < 10_000);

        let result = ctx
            .execute_js("document.querySelector('h1').textContent")
            .await
            .expect("JS execution failed");
        assert_eq!(result.as_str().unwrap(), "Hello");

        ctx.wait_for_selector("p", Duration::from_secs(2))
            .await
            .expect("selector wait failed");
        assert!(ctx
            .wait_for_selector("#missing", Duration::from_millis(300))
            .await
            .is_err());

        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains("<h1>Hello</h1>"));

        ctx.close().await.expect("close failed");
        session.close().await.expect("shutdown failed");
    }

    #[test]
    fn test_find_chromium_honours_env_only_when_path_exists() {
        // A missing explicit path falls through to the other lookups.
        std::env::set_var("NEWSPARSE_CHROMIUM_PATH", "/definitely/not/here/chrome");
        let found = find_chromium();
        assert_ne!(found, Some(PathBuf::from("/definitely/not/here/chrome")));
        std::env::remove_var("NEWSPARSE_CHROMIUM_PATH");
    }
}
