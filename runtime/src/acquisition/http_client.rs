// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lightweight fetch pipeline: plain HTTP GET plus content normalization.
//!
//! Not a browser. Rotates browser-like headers per attempt, backs off
//! exponentially on 429/403, and drops TLS verification after a
//! certificate failure. Attempts run strictly one after another.

use super::headers::browser_headers;
use crate::error::{ExtractError, ExtractResult};
use crate::extraction::Normalizer;
use crate::pacing::{exponential_backoff, Sleeper};
use crate::types::{ExtractedArticle, RenderingMethod};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connect phase timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_REDIRECTS: usize = 10;

pub const TLS_HINT: &str = "hint: retry with skip_ssl_verification set to true";

/// Successful pipeline run.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub article: ExtractedArticle,
    /// Attempt number that succeeded (1-based).
    pub attempts: u32,
    /// Final URL after redirects.
    pub final_url: String,
    pub status: u16,
}

impl FetchOutcome {
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Why a single attempt failed. Decides how long to wait before the next.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchFault {
    Status { code: u16, reason: String },
    Tls(String),
    Connect(String),
    Timeout(String),
    Other(String),
}

impl FetchFault {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        let chain = error_chain(err);
        if err.is_timeout() {
            FetchFault::Timeout(chain)
        } else if is_tls_failure(err) {
            FetchFault::Tls(chain)
        } else if err.is_connect() {
            FetchFault::Connect(chain)
        } else {
            FetchFault::Other(chain)
        }
    }

    /// Pause before the attempt following `attempt`.
    fn pause(&self, attempt: u32) -> Duration {
        match self {
            FetchFault::Status { code: 429 | 403, .. } => exponential_backoff(attempt),
            FetchFault::Connect(_) => Duration::from_secs(2),
            _ => Duration::from_secs(1),
        }
    }

    fn describe(&self, url: &str) -> String {
        match self {
            FetchFault::Status { code, reason } => {
                format!("failed to download page: HTTP {code} {reason} for url '{url}'")
            }
            FetchFault::Tls(e) => format!("failed to download page: TLS error: {e}"),
            FetchFault::Connect(_) => format!("failed to download page: could not connect to {url}"),
            FetchFault::Timeout(e) => format!("failed to download page: timed out: {e}"),
            FetchFault::Other(e) => format!("failed to parse page: {e}"),
        }
    }
}

const TLS_MARKERS: [&str; 5] = ["certificate", "tls", "ssl", "handshake", "peer sent"];

/// Whether the handshake, not the socket, failed. Only the sources below
/// reqwest's own message are inspected, with the URL and host removed,
/// so a URL like `/ssl-guide` never reads as a TLS fault.
fn is_tls_failure(err: &reqwest::Error) -> bool {
    use std::error::Error as _;

    let url = err.url().map(|u| u.as_str().to_ascii_lowercase());
    let host = err
        .url()
        .and_then(|u| u.host_str())
        .map(str::to_ascii_lowercase);

    let mut source = err.source();
    while let Some(s) = source {
        let mut msg = s.to_string().to_ascii_lowercase();
        for needle in url.iter().chain(host.iter()) {
            msg = msg.replace(needle.as_str(), "");
        }
        if TLS_MARKERS.iter().any(|m| msg.contains(m)) {
            return true;
        }
        source = s.source();
    }
    false
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        let msg = s.to_string();
        if !parts.contains(&msg) {
            parts.push(msg);
        }
        source = s.source();
    }
    parts.join(": ")
}

struct HttpPage {
    final_url: String,
    status: u16,
    body: String,
}

/// HTTP GET + normalize, with retry and backoff.
#[derive(Clone)]
pub struct StaticPipeline {
    client: reqwest::Client,
    /// Same settings with certificate verification disabled.
    insecure_client: reqwest::Client,
    normalizer: Normalizer,
    sleeper: Arc<dyn Sleeper>,
}

impl StaticPipeline {
    pub fn new(normalizer: Normalizer, sleeper: Arc<dyn Sleeper>) -> reqwest::Result<Self> {
        Self::with_timeouts(normalizer, sleeper, CONNECT_TIMEOUT, REQUEST_TIMEOUT)
    }

    /// Fails when the TLS backend cannot be initialized.
    pub fn with_timeouts(
        normalizer: Normalizer,
        sleeper: Arc<dyn Sleeper>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let build = |insecure: bool| {
            reqwest::Client::builder()
                .connect_timeout(connect_timeout)
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
                .danger_accept_invalid_certs(insecure)
                .build()
        };

        Ok(Self {
            client: build(false)?,
            insecure_client: build(true)?,
            normalizer,
            sleeper,
        })
    }

    /// Fetch `url` and extract its article, trying up to `max_retries`
    /// times (at least once). Fails with [`ExtractError::Fetch`] naming the
    /// last status code or network fault.
    pub async fn fetch_and_extract(
        &self,
        url: &str,
        max_retries: u32,
        skip_ssl: bool,
    ) -> ExtractResult<FetchOutcome> {
        let max_attempts = max_retries.max(1);
        let mut skip_ssl = skip_ssl;
        let mut tls_hint = false;
        let mut last_fault = None;

        for attempt in 1..=max_attempts {
            debug!(url = %url, attempt, max_attempts, skip_ssl, "static fetch attempt");

            match self.fetch_once(url, skip_ssl).await {
                Ok(page) => {
                    let article =
                        self.normalizer
                            .normalize(&page.body, &page.final_url, RenderingMethod::Static);
                    info!(
                        url = %url,
                        attempt,
                        status = page.status,
                        words = article.word_count,
                        "static fetch succeeded"
                    );
                    return Ok(FetchOutcome {
                        article,
                        attempts: attempt,
                        final_url: page.final_url,
                        status: page.status,
                    });
                }
                Err(fault) => {
                    if matches!(fault, FetchFault::Tls(_)) && !skip_ssl {
                        skip_ssl = true;
                        tls_hint = true;
                    }

                    if attempt < max_attempts {
                        let pause = fault.pause(attempt);
                        warn!(
                            url = %url,
                            attempt,
                            fault = ?fault,
                            pause_ms = pause.as_millis() as u64,
                            "static fetch failed, retrying"
                        );
                        self.sleeper.sleep(pause).await;
                    } else {
                        warn!(url = %url, attempt, fault = ?fault, "static fetch failed, giving up");
                    }
                    last_fault = Some(fault);
                }
            }
        }

        let mut message = last_fault
            .map(|f| f.describe(url))
            .unwrap_or_else(|| format!("failed to download page: {url}"));
        if tls_hint {
            message.push('\n');
            message.push_str(TLS_HINT);
        }
        Err(ExtractError::Fetch {
            message,
            attempts: max_attempts,
        })
    }

    async fn fetch_once(&self, url: &str, skip_ssl: bool) -> Result<HttpPage, FetchFault> {
        let client = if skip_ssl {
            &self.insecure_client
        } else {
            &self.client
        };

        let resp = client
            .get(url)
            .headers(browser_headers(url))
            .send()
            .await
            .map_err(|e| FetchFault::from_reqwest(&e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchFault::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchFault::from_reqwest(&e))?;

        Ok(HttpPage {
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}
