// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Realistic browser header sets, rotated per request.

use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};

/// Desktop browser user agents rotated across requests and render contexts.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

pub const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

pub const ACCEPT_LANGUAGE: &str = "zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7";

/// Pick a user agent at random.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Full header set for a GET to `url`: rotated UA, referer on the target
/// host, and the accept/fetch-metadata headers a browser sends for a
/// top-level navigation.
pub fn browser_headers(url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        HeaderValue::from_static(random_user_agent()),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    if let Some(referer) = referer_for(url) {
        if let Ok(v) = HeaderValue::from_str(&referer) {
            headers.insert(header::REFERER, v);
        }
    }
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

/// `https://<host>/` for the target URL, keeping any explicit port.
pub fn referer_for(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("https://{host}:{port}/")),
        None => Some(format!("https://{host}/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referer_uses_target_host() {
        assert_eq!(
            referer_for("https://news.example.com/a/b?c=d").as_deref(),
            Some("https://news.example.com/")
        );
        assert_eq!(
            referer_for("http://127.0.0.1:8080/x").as_deref(),
            Some("https://127.0.0.1:8080/")
        );
        assert!(referer_for("nonsense").is_none());
    }

    #[test]
    fn test_headers_complete() {
        let h = browser_headers("https://example.com/article");
        let ua = h.get(header::USER_AGENT).unwrap().to_str().unwrap();
        assert!(USER_AGENTS.contains(&ua));
        assert_eq!(h.get(header::REFERER).unwrap(), "https://example.com/");
        assert_eq!(h.get("sec-fetch-mode").unwrap(), "navigate");
        assert!(h.get(header::ACCEPT).is_some());
        assert!(h.get(header::ACCEPT_LANGUAGE).is_some());
    }
}
