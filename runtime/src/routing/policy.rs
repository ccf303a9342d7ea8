// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Domain policy tables: which hosts are blocked, which need a rendered
//! browser, and which are known to work with a plain HTTP fetch.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Hosts known to be unparsable (paywall, bot challenge, geo block).
const BUILTIN_BLOCKED: &[&str] = &[
    "reuters.com",
    "japantimes.co.jp",
    "content-technology.com",
    "isna.ir",
];

/// Hosts whose article body is only present after JavaScript runs.
const BUILTIN_DYNAMIC_REQUIRED: &[&str] = &[
    "techstory.in",
    "peoplematters.in",
    "storm.mg",
    "ustv.com.tw",
    "designnews.com",
    "gurufocus.com",
    "sammyfans.com",
    "manilatimes.net",
];

/// Category a host falls into, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCategory {
    Blocked,
    DynamicRequired,
    StaticOk,
    Unknown,
}

#[derive(thiserror::Error, Debug)]
pub enum PolicyError {
    #[error("pattern '{pattern}' appears in both {first} and {second}")]
    Overlap {
        pattern: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse policy file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk shape of a policy file.
#[derive(Debug, Default, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    blocked: Vec<String>,
    #[serde(default)]
    dynamic_required: Vec<String>,
    #[serde(default)]
    static_ok: Vec<String>,
}

/// Three disjoint sets of host-suffix patterns. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainPolicy {
    blocked: Vec<String>,
    dynamic_required: Vec<String>,
    static_ok: Vec<String>,
}

impl DomainPolicy {
    /// Build a policy, normalizing patterns and rejecting any pattern that
    /// appears in more than one table.
    pub fn new<I, S>(blocked: I, dynamic_required: I, static_ok: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blocked = normalize(blocked);
        let dynamic_required = normalize(dynamic_required);
        let static_ok = normalize(static_ok);

        check_disjoint(&blocked, "blocked", &dynamic_required, "dynamic_required")?;
        check_disjoint(&blocked, "blocked", &static_ok, "static_ok")?;
        check_disjoint(&dynamic_required, "dynamic_required", &static_ok, "static_ok")?;

        Ok(Self {
            blocked,
            dynamic_required,
            static_ok,
        })
    }

    /// The tables shipped with the binary.
    pub fn builtin() -> Self {
        Self {
            blocked: normalize(BUILTIN_BLOCKED.iter().copied()),
            dynamic_required: normalize(BUILTIN_DYNAMIC_REQUIRED.iter().copied()),
            static_ok: Vec::new(),
        }
    }

    /// Parse a JSON policy document.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = serde_json::from_str(json)?;
        Self::new(file.blocked, file.dynamic_required, file.static_ok)
    }

    /// Load a JSON policy document from disk.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Categorize a host. Blocked wins over dynamic-required, which wins
    /// over static-ok.
    pub fn category(&self, host: &str) -> DomainCategory {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        if matches_any(&host, &self.blocked) {
            DomainCategory::Blocked
        } else if matches_any(&host, &self.dynamic_required) {
            DomainCategory::DynamicRequired
        } else if matches_any(&host, &self.static_ok) {
            DomainCategory::StaticOk
        } else {
            DomainCategory::Unknown
        }
    }

    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    pub fn dynamic_required(&self) -> &[String] {
        &self.dynamic_required
    }

    pub fn static_ok(&self) -> &[String] {
        &self.static_ok
    }
}

/// A host matches a pattern when it equals it or is a subdomain of it.
pub fn host_matches(host: &str, pattern: &str) -> bool {
    if host == pattern {
        return true;
    }
    host.len() > pattern.len()
        && host.ends_with(pattern)
        && host.as_bytes()[host.len() - pattern.len() - 1] == b'.'
}

fn matches_any(host: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| host_matches(host, p))
}

fn normalize<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    patterns
        .into_iter()
        .map(|p| {
            p.as_ref()
                .trim()
                .trim_start_matches('.')
                .trim_end_matches('.')
                .to_ascii_lowercase()
        })
        .filter(|p| !p.is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

fn check_disjoint(
    a: &[String],
    a_name: &'static str,
    b: &[String],
    b_name: &'static str,
) -> Result<(), PolicyError> {
    match a.iter().find(|p| b.contains(p)) {
        Some(pattern) => Err(PolicyError::Overlap {
            pattern: pattern.clone(),
            first: a_name,
            second: b_name,
        }),
        None => Ok(()),
    }
}
