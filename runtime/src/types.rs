// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request and result envelopes shared by every pipeline.

use crate::error::ExtractError;
use crate::routing::RoutingDecision;
use serde::{Deserialize, Serialize};

/// Default number of lightweight fetch attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Schemes an extraction target may use.
const ACCEPTED_SCHEMES: [&str; 2] = ["http://", "https://"];

/// A single extraction job. Built once and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Target page URL.
    pub url: String,
    /// Attempts allowed for the lightweight pipeline. Unset means the
    /// deployment default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Disable TLS certificate verification from the first attempt.
    #[serde(default, alias = "skip_ssl")]
    pub skip_ssl_verification: bool,
    /// CSS selector the render pipeline waits for (best effort).
    #[serde(default, alias = "wait_for")]
    pub wait_for_selector: Option<String>,
    /// Abort ad/tracker requests and strip ad elements while rendering.
    #[serde(default = "default_true")]
    pub block_ads: bool,
    /// Mask automation fingerprints while rendering.
    #[serde(default = "default_true")]
    pub stealth_mode: bool,
}

fn default_true() -> bool {
    true
}

impl ExtractionRequest {
    /// Build a request with default options, validating the URL scheme.
    pub fn new(url: impl Into<String>) -> Result<Self, ExtractError> {
        let req = Self {
            url: url.into(),
            max_retries: None,
            skip_ssl_verification: false,
            wait_for_selector: None,
            block_ads: true,
            stealth_mode: true,
        };
        req.validate()?;
        Ok(req)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Use `default` when the caller did not pick a retry count.
    pub fn or_max_retries(mut self, default: u32) -> Self {
        self.max_retries.get_or_insert(default);
        self
    }

    /// Attempts allowed for the lightweight pipeline.
    pub fn retry_budget(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn with_skip_ssl(mut self, skip: bool) -> Self {
        self.skip_ssl_verification = skip;
        self
    }

    pub fn with_wait_for_selector(mut self, selector: impl Into<String>) -> Self {
        self.wait_for_selector = Some(selector.into());
        self
    }

    /// Reject URLs that do not start with a recognized scheme.
    pub fn validate(&self) -> Result<(), ExtractError> {
        validate_url(&self.url)
    }
}

/// Check that a URL starts with `http://` or `https://`.
pub fn validate_url(url: &str) -> Result<(), ExtractError> {
    let lower = url.trim_start().to_ascii_lowercase();
    if ACCEPTED_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        Ok(())
    } else {
        Err(ExtractError::InvalidRequest(format!(
            "url must start with http:// or https://, got '{url}'"
        )))
    }
}

/// Which pipeline produced an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingMethod {
    Static,
    Dynamic,
}

/// Structured article content. Absent fields mean the extractor could not
/// recover them, not that extraction failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date_published: Option<String>,
    pub url: Option<String>,
    pub source_domain: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub rendering_method: RenderingMethod,
    /// Best available structured text (XML-tagged when possible).
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub excerpt: Option<String>,
    pub word_count: usize,
    pub language: Option<String>,
}

impl ExtractedArticle {
    /// An article with nothing recovered.
    pub fn empty(rendering_method: RenderingMethod) -> Self {
        Self {
            title: None,
            author: None,
            date_published: None,
            url: None,
            source_domain: None,
            description: None,
            categories: None,
            tags: None,
            rendering_method,
            content: None,
            text_content: None,
            excerpt: None,
            word_count: 0,
            language: None,
        }
    }

    /// True when the body text is missing or only whitespace.
    pub fn has_text(&self) -> bool {
        self.text_content
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Path the orchestrator took for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingOutcome {
    Block,
    DynamicDirect,
    StaticOnly,
    StaticSuccess,
    FallbackToDynamic,
}

/// The single envelope returned for every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub data: Option<ExtractedArticle>,
    pub error: Option<String>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    pub routing_decision: RoutingOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_rss_instead: Option<bool>,
}

impl ExtractionResult {
    /// Terminal result for a blocked domain. No network call was made, the
    /// classification counts as the single attempt.
    pub fn blocked(decision: &RoutingDecision) -> Self {
        let err = ExtractError::PolicyBlock {
            reason: decision.reason.clone(),
            suggestion: decision.suggestion.clone(),
        };
        let mut result = Self::failed(&err, RoutingOutcome::Block);
        result.reason = Some(decision.reason.clone());
        result.suggestion = decision.suggestion.clone();
        result.use_rss_instead = Some(true);
        result
    }

    pub fn succeeded(article: ExtractedArticle, attempts: u32, outcome: RoutingOutcome) -> Self {
        Self {
            success: true,
            data: Some(article),
            error: None,
            attempts,
            retries: Some(attempts.saturating_sub(1)),
            routing_decision: outcome,
            static_error: None,
            reason: None,
            suggestion: None,
            use_rss_instead: None,
        }
    }

    pub fn failed(err: &ExtractError, outcome: RoutingOutcome) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            attempts: err.attempts(),
            retries: None,
            routing_decision: outcome,
            static_error: None,
            reason: None,
            suggestion: None,
            use_rss_instead: None,
        }
    }

    pub fn with_static_error(mut self, static_error: impl Into<String>) -> Self {
        self.static_error = Some(static_error.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: Option<String>) -> Self {
        if suggestion.is_some() {
            self.suggestion = suggestion;
        }
        self
    }
}
