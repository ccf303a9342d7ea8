// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Content normalizer: raw HTML in, [`ExtractedArticle`] out.
//!
//! Plain text, structured text, and metadata come from a
//! [`ContentExtractor`] through three independent calls. A failure in any
//! one of them (error or panic) only nulls the fields it would have filled.

pub mod article;

pub use article::ReadableExtractor;

use crate::types::{ExtractedArticle, RenderingMethod};
use anyhow::Result;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Characters kept in an excerpt before the ellipsis.
pub const EXCERPT_CHARS: usize = 200;

/// Page metadata recovered by an extractor. Empty vectors mean "not found".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    /// Publication date, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub url: Option<String>,
    pub sitename: Option<String>,
    pub description: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub language: Option<String>,
}

/// The content-extraction capability the normalizer delegates to.
pub trait ContentExtractor: Send + Sync {
    /// Main article body as plain text, `None` when nothing was found.
    fn extract_text(&self, html: &str) -> Result<Option<String>>;
    /// Main article body as tagged XML, `None` when nothing was found.
    fn extract_xml(&self, html: &str) -> Result<Option<String>>;
    /// Page metadata. `source_url` resolves relative links and fills the
    /// site name when the page declares none.
    fn extract_metadata(&self, html: &str, source_url: &str) -> Result<PageMetadata>;
}

/// Turns HTML into an [`ExtractedArticle`]. Never fails.
#[derive(Clone)]
pub struct Normalizer {
    extractor: Arc<dyn ContentExtractor>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Arc::new(ReadableExtractor::default()))
    }
}

impl Normalizer {
    pub fn new(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self { extractor }
    }

    pub fn normalize(
        &self,
        html: &str,
        source_url: &str,
        rendering_method: RenderingMethod,
    ) -> ExtractedArticle {
        let text_content = guarded("text", source_url, || self.extractor.extract_text(html))
            .flatten()
            .filter(|t| !t.is_empty());
        let metadata = guarded("metadata", source_url, || {
            self.extractor.extract_metadata(html, source_url)
        });
        let xml = guarded("xml", source_url, || self.extractor.extract_xml(html)).flatten();

        let mut article = ExtractedArticle::empty(rendering_method);
        if let Some(meta) = metadata {
            article.title = meta.title;
            article.author = meta.author;
            article.date_published = meta.date;
            article.url = meta.url;
            article.source_domain = meta.sitename;
            article.description = meta.description;
            article.categories = non_empty(meta.categories);
            article.tags = non_empty(meta.tags);
            article.language = meta.language;
        }
        article.content = xml.or_else(|| text_content.clone());
        article.word_count = word_count(text_content.as_deref());
        article.excerpt = text_content.as_deref().map(excerpt);
        article.text_content = text_content;
        article
    }
}

/// Whitespace-token count, 0 when there is no text.
pub fn word_count(text: Option<&str>) -> usize {
    text.map_or(0, |t| t.split_whitespace().count())
}

/// First [`EXCERPT_CHARS`] characters, with `...` appended when truncated.
pub fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn non_empty(v: Vec<String>) -> Option<Vec<String>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Run one extractor call, turning errors and panics into `None`.
fn guarded<T>(what: &str, url: &str, f: impl FnOnce() -> Result<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(v)) => Some(v),
        Ok(Err(e)) => {
            warn!(url = %url, error = %e, "{what} extraction failed");
            None
        }
        Err(_) => {
            warn!(url = %url, "{what} extraction panicked");
            None
        }
    }
}
