// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Default [`ContentExtractor`] built on `scraper`.
//!
//! Picks the most article-like container, drops boilerplate, and emits the
//! remaining blocks as plain text or `<doc><main>…</main></doc>` XML.
//! Metadata comes from OpenGraph, JSON-LD, standard meta tags, `<title>`,
//! `<time>`, and the `lang` attribute.

use super::{ContentExtractor, PageMetadata};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quick_xml::escape::escape;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Containers tried, in order, as the article root.
const ROOT_CANDIDATES: &[&str] = &[
    "article",
    "[itemprop=\"articleBody\"]",
    "main",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    ".story-body",
    "#content",
];

/// Elements whose subtree never contributes body text.
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "form", "button",
    "template", "svg",
];

/// Class/id fragments that mark non-article blocks.
const BOILERPLATE_MARKERS: &[&str] = &[
    "comment",
    "share",
    "social",
    "related",
    "newsletter",
    "subscribe",
    "breadcrumb",
    "advert",
];

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, td, th";

const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "ReportageNewsArticle",
    "AnalysisNewsArticle",
    "OpinionNewsArticle",
    "TechArticle",
    "Report",
];

/// One unit of body content.
#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading(u8, String),
    Paragraph(String),
    ListItem(String),
    Quote(String),
    Code(String),
    Cell(String),
}

impl Block {
    fn text(&self) -> &str {
        match self {
            Block::Heading(_, t)
            | Block::Paragraph(t)
            | Block::ListItem(t)
            | Block::Quote(t)
            | Block::Code(t)
            | Block::Cell(t) => t,
        }
    }
}

/// Heuristic article extractor.
#[derive(Debug, Clone)]
pub struct ReadableExtractor {
    /// Keep table cells as body text.
    pub include_tables: bool,
}

impl Default for ReadableExtractor {
    fn default() -> Self {
        Self {
            include_tables: true,
        }
    }
}

impl ContentExtractor for ReadableExtractor {
    fn extract_text(&self, html: &str) -> Result<Option<String>> {
        let blocks = self.blocks(html);
        if blocks.is_empty() {
            return Ok(None);
        }
        let text = blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Some(text))
    }

    fn extract_xml(&self, html: &str) -> Result<Option<String>> {
        let blocks = self.blocks(html);
        if blocks.is_empty() {
            return Ok(None);
        }
        Ok(Some(blocks_to_xml(&blocks)))
    }

    fn extract_metadata(&self, html: &str, source_url: &str) -> Result<PageMetadata> {
        let document = Html::parse_document(html);
        let ld = find_article_jsonld(&document);
        let ld = ld.as_ref();

        let title = meta_content(&document, &[r#"meta[property="og:title"]"#])
            .or_else(|| ld.and_then(|v| json_str(v, "headline")))
            .or_else(|| meta_content(&document, &[r#"meta[name="twitter:title"]"#]))
            .or_else(|| first_text(&document, "title"))
            .or_else(|| first_text(&document, "h1"));

        let author = meta_content(&document, &[r#"meta[name="author"]"#])
            .or_else(|| ld.and_then(|v| json_names(v.get("author")).into_iter().next()))
            .or_else(|| {
                meta_content(&document, &[r#"meta[property="article:author"]"#])
                    .filter(|a| !a.starts_with("http"))
            })
            .or_else(|| first_text(&document, r#"[rel="author"]"#))
            .or_else(|| first_text(&document, r#"[itemprop="author"]"#));

        let date = meta_content(
            &document,
            &[
                r#"meta[property="article:published_time"]"#,
                r#"meta[itemprop="datePublished"]"#,
            ],
        )
        .or_else(|| ld.and_then(|v| json_str(v, "datePublished")))
        .or_else(|| {
            meta_content(
                &document,
                &[
                    r#"meta[name="date"]"#,
                    r#"meta[name="pubdate"]"#,
                    r#"meta[name="publishdate"]"#,
                ],
            )
        })
        .or_else(|| first_attr(&document, "time[datetime]", "datetime"))
        .and_then(|d| normalize_date(&d));

        let url = first_attr(&document, r#"link[rel="canonical"]"#, "href")
            .or_else(|| meta_content(&document, &[r#"meta[property="og:url"]"#]))
            .map(|u| resolve(source_url, &u))
            .or_else(|| Some(source_url.to_string()));

        let sitename = meta_content(&document, &[r#"meta[property="og:site_name"]"#])
            .or_else(|| {
                ld.and_then(|v| v.get("publisher"))
                    .and_then(|p| json_names(Some(p)).into_iter().next())
            })
            .or_else(|| host_of(source_url));

        let description = meta_content(
            &document,
            &[
                r#"meta[name="description"]"#,
                r#"meta[property="og:description"]"#,
            ],
        )
        .or_else(|| ld.and_then(|v| json_str(v, "description")));

        let mut categories = meta_contents(&document, r#"meta[property="article:section"]"#);
        if categories.is_empty() {
            categories = ld.map(|v| json_list(v.get("articleSection"))).unwrap_or_default();
        }

        let mut tags = meta_contents(&document, r#"meta[property="article:tag"]"#);
        if tags.is_empty() {
            tags = ld.map(|v| json_list(v.get("keywords"))).unwrap_or_default();
        }
        if tags.is_empty() {
            tags = meta_content(&document, &[r#"meta[name="keywords"]"#])
                .map(|k| split_list(&k))
                .unwrap_or_default();
        }

        let language = first_attr(&document, "html[lang]", "lang")
            .or_else(|| meta_content(&document, &[r#"meta[http-equiv="content-language"]"#]))
            .or_else(|| meta_content(&document, &[r#"meta[property="og:locale"]"#]))
            .or_else(|| ld.and_then(|v| json_str(v, "inLanguage")))
            .map(|l| l.replace('_', "-"));

        Ok(PageMetadata {
            title,
            author,
            date,
            url,
            sitename,
            description,
            categories,
            tags,
            language,
        })
    }
}

impl ReadableExtractor {
    fn blocks(&self, html: &str) -> Vec<Block> {
        let document = Html::parse_document(html);
        let Some(root) = article_root(&document) else {
            return Vec::new();
        };
        let Ok(block_sel) = Selector::parse(BLOCK_SELECTOR) else {
            return Vec::new();
        };

        let mut blocks = Vec::new();
        for el in root.select(&block_sel) {
            if is_boilerplate(&el, &root) || has_block_ancestor(&el, &root) {
                continue;
            }
            let text = clean_text(&el.text().collect::<Vec<_>>().join(" "));
            if text.is_empty() {
                continue;
            }
            let block = match el.value().name() {
                "h1" => Block::Heading(1, text),
                "h2" => Block::Heading(2, text),
                "h3" => Block::Heading(3, text),
                "h4" => Block::Heading(4, text),
                "h5" => Block::Heading(5, text),
                "h6" => Block::Heading(6, text),
                "li" => Block::ListItem(text),
                "blockquote" => Block::Quote(text),
                "pre" => Block::Code(text),
                "td" | "th" if self.include_tables => Block::Cell(text),
                "td" | "th" => continue,
                _ => Block::Paragraph(text),
            };
            blocks.push(block);
        }
        blocks
    }
}

/// Pick the candidate container holding the most paragraph text, falling
/// back to `<body>`.
fn article_root(document: &Html) -> Option<ElementRef<'_>> {
    let p_sel = Selector::parse("p").ok()?;
    let mut best: Option<(ElementRef<'_>, usize)> = None;

    for candidate in ROOT_CANDIDATES {
        let Ok(sel) = Selector::parse(candidate) else {
            continue;
        };
        for el in document.select(&sel) {
            let len: usize = el
                .select(&p_sel)
                .map(|p| p.text().map(str::len).sum::<usize>())
                .sum();
            if len > 0 && best.map_or(true, |(_, b)| len > b) {
                best = Some((el, len));
            }
        }
    }

    if let Some((el, _)) = best {
        return Some(el);
    }
    let body_sel = Selector::parse("body").ok()?;
    document
        .select(&body_sel)
        .next()
        .or_else(|| Some(document.root_element()))
}

/// True when the element or an ancestor below `root` is boilerplate.
fn is_boilerplate(el: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    if marks_boilerplate(el) {
        return true;
    }
    for node in el.ancestors() {
        if node.id() == root.id() {
            break;
        }
        if let Some(anc) = ElementRef::wrap(node) {
            if marks_boilerplate(&anc) {
                return true;
            }
        }
    }
    false
}

fn marks_boilerplate(el: &ElementRef<'_>) -> bool {
    let v = el.value();
    if BOILERPLATE_TAGS.contains(&v.name()) {
        return true;
    }
    let id = v.id().unwrap_or("").to_ascii_lowercase();
    let hit = |s: &str| BOILERPLATE_MARKERS.iter().any(|m| s.contains(m));
    hit(&id) || v.classes().any(|c| hit(&c.to_ascii_lowercase()))
}

/// Nested blocks (a `<p>` inside a `<li>`) are emitted once, by the outer one.
fn has_block_ancestor(el: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    for node in el.ancestors() {
        if node.id() == root.id() {
            break;
        }
        if let Some(anc) = ElementRef::wrap(node) {
            if matches!(
                anc.value().name(),
                "p" | "li" | "blockquote" | "pre" | "td" | "th"
            ) {
                return true;
            }
        }
    }
    false
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

fn clean_text(raw: &str) -> String {
    whitespace_re().replace_all(raw, " ").trim().to_string()
}

fn blocks_to_xml(blocks: &[Block]) -> String {
    let mut out = String::from("<doc><main>");
    let mut open: Option<&'static str> = None;

    for block in blocks {
        let wants = match block {
            Block::ListItem(_) => Some("list"),
            Block::Cell(_) => Some("table"),
            _ => None,
        };
        if open != wants {
            if let Some(tag) = open {
                out.push_str(&format!("</{tag}>"));
            }
            if let Some(tag) = wants {
                out.push_str(&format!("<{tag}>"));
            }
            open = wants;
        }
        let text = escape(block.text());
        match block {
            Block::Heading(level, _) => {
                out.push_str(&format!("<head rend=\"h{level}\">{text}</head>"))
            }
            Block::Paragraph(_) => out.push_str(&format!("<p>{text}</p>")),
            Block::ListItem(_) => out.push_str(&format!("<item>{text}</item>")),
            Block::Quote(_) => out.push_str(&format!("<quote>{text}</quote>")),
            Block::Code(_) => out.push_str(&format!("<code>{text}</code>")),
            Block::Cell(_) => out.push_str(&format!("<cell>{text}</cell>")),
        }
    }
    if let Some(tag) = open {
        out.push_str(&format!("</{tag}>"));
    }
    out.push_str("</main></doc>");
    out
}

// ── Metadata helpers ────────────────────────────────────────────

fn meta_content(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let sel = Selector::parse(s).ok()?;
        document
            .select(&sel)
            .filter_map(|el| el.value().attr("content"))
            .map(clean_text)
            .find(|c| !c.is_empty())
    })
}

fn meta_contents(document: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for c in document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
    {
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
        .find(|t| !t.is_empty())
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|a| a.trim().to_string())
        .find(|a| !a.is_empty())
}

/// First JSON-LD object whose `@type` is an article type. Looks through
/// top-level arrays and `@graph`.
fn find_article_jsonld(document: &Html) -> Option<Value> {
    let sel = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;
    for element in document.select(&sel) {
        let raw = element.inner_html();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        let mut stack = vec![value];
        while let Some(v) = stack.pop() {
            match v {
                Value::Array(items) => stack.extend(items),
                Value::Object(ref map) => {
                    if is_article_type(map.get("@type")) {
                        return Some(v);
                    }
                    if let Some(graph) = map.get("@graph") {
                        stack.push(graph.clone());
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn is_article_type(t: Option<&Value>) -> bool {
    match t {
        Some(Value::String(s)) => ARTICLE_TYPES.contains(&s.as_str()),
        Some(Value::Array(items)) => items.iter().any(|i| is_article_type(Some(i))),
        _ => false,
    }
}

fn json_str(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

/// Names from a string, an object with `name`, or an array of either.
fn json_names(v: Option<&Value>) -> Vec<String> {
    let names = match v {
        Some(Value::String(s)) => vec![clean_text(s)],
        Some(Value::Object(map)) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| vec![clean_text(s)])
            .unwrap_or_default(),
        Some(Value::Array(items)) => items.iter().flat_map(|i| json_names(Some(i))).collect(),
        _ => Vec::new(),
    };
    names.into_iter().filter(|s| !s.is_empty()).collect()
}

fn json_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::String(s)) => split_list(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(clean_text)
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reduce a date/datetime string to `YYYY-MM-DD`.
fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.format("%Y-%m-%d").to_string());
        }
    }
    let head: String = raw.chars().take(10).collect();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(&head, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    None
}

fn resolve(base: &str, href: &str) -> String {
    url::Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_string())
}
