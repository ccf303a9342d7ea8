// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Scripts and lists injected into rendered pages.

use std::time::Duration;

/// Masks common automation fingerprints. Runs before any page script.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
window.chrome = { runtime: {} };
const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) => (
    parameters.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : originalQuery(parameters)
);
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['zh-TW', 'zh', 'en-US', 'en'] });
"#;

/// Ad and tracking hosts (and one tracking path) refused at the network layer.
pub const AD_DOMAINS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "googletagmanager.com",
    "google-analytics.com",
    "facebook.com/tr/",
    "scorecardresearch.com",
    "ad.doubleclick.net",
    "static.ads-twitter.com",
    "ads.yahoo.com",
    "pagead2.googlesyndication.com",
    "adservice.google.com",
    "analytics.google.com",
    "googleadservices.com",
];

/// DOM selectors for ad containers removed after load.
pub const AD_SELECTORS: &[&str] = &[
    "[class*=\"ad-\"]",
    "[class*=\"ad_\"]",
    "[id*=\"ad-\"]",
    "[id*=\"ad_\"]",
    "[class*=\"advertisement\"]",
    "[class*=\"banner\"]",
    "iframe[src*=\"ads\"]",
    "iframe[src*=\"doubleclick\"]",
    ".ad",
    ".ads",
    "#ad",
    "#ads",
];

/// Fractions of the page height scrolled to, in order.
pub const SCROLL_POSITIONS: &[f64] = &[0.3, 0.6, 1.0];

/// Pause between scroll steps.
pub const SCROLL_PAUSE: Duration = Duration::from_millis(400);

/// Blocked-URL patterns for the browser network layer. Substring match,
/// so each entry is wrapped in wildcards.
pub fn ad_block_patterns() -> Vec<String> {
    AD_DOMAINS.iter().map(|d| format!("*{d}*")).collect()
}

/// Script removing every element matched by [`AD_SELECTORS`]. Returns the
/// number of removed nodes.
pub fn ad_removal_script() -> String {
    let selectors = serde_json::to_string(AD_SELECTORS).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
    let removed = 0;
    for (const selector of {selectors}) {{
        try {{
            document.querySelectorAll(selector).forEach(el => {{ el.remove(); removed += 1; }});
        }} catch (e) {{}}
    }}
    return removed;
}})()"#
    )
}

/// Script scrolling to `ratio` of the document height.
pub fn scroll_script(ratio: f64) -> String {
    format!(
        "window.scrollTo(0, (document.body ? document.body.scrollHeight : 0) * {ratio})"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_patterns_wrap_wildcards() {
        let patterns = ad_block_patterns();
        assert_eq!(patterns.len(), AD_DOMAINS.len());
        assert!(patterns.contains(&"*doubleclick.net*".to_string()));
    }

    #[test]
    fn test_removal_script_embeds_selectors() {
        let script = ad_removal_script();
        assert!(script.contains(r#"iframe[src*=\"doubleclick\"]"#));
        assert!(script.contains(".ads"));
        assert!(script.starts_with("(() =>"));
    }

    #[test]
    fn test_scroll_script() {
        assert!(scroll_script(0.6).contains("* 0.6"));
        assert!(scroll_script(1.0).contains("* 1"));
    }
}
