// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Domain classifier: decides which fetch mode a URL should start with.
//!
//! Pure lookup over the [`DomainPolicy`] tables plus an AMP heuristic.
//! No I/O. The policy can be swapped at runtime by replacing the shared
//! pointer; tables are never mutated in place.

pub mod policy;

pub use policy::{DomainCategory, DomainPolicy, PolicyError};

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use url::Url;

const BLOCK_SUGGESTION: &str = "use the site's RSS feed instead";
const AMP_SUGGESTION: &str = "request the non-AMP version of the page for better results";

/// What the orchestrator should do with a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingAction {
    /// Known unparsable. Fail without touching the network.
    Block,
    /// Go straight to the render pipeline.
    Dynamic,
    /// Lightweight fetch only.
    Static,
    /// Lightweight fetch, escalate to rendering on failure.
    TryStaticFirst,
}

/// Classifier output, computed once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub action: RoutingAction,
    pub reason: String,
    pub suggestion: Option<String>,
}

impl RoutingDecision {
    fn new(action: RoutingAction, reason: &str, suggestion: Option<&str>) -> Self {
        Self {
            action,
            reason: reason.to_string(),
            suggestion: suggestion.map(str::to_string),
        }
    }
}

/// Maps URLs to routing decisions using a swappable policy snapshot.
#[derive(Debug)]
pub struct DomainClassifier {
    policy: RwLock<Arc<DomainPolicy>>,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(DomainPolicy::builtin())
    }
}

impl DomainClassifier {
    pub fn new(policy: DomainPolicy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// Current policy snapshot.
    pub fn policy(&self) -> Arc<DomainPolicy> {
        let guard = self.policy.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Atomically replace the policy. In-flight classifications keep the
    /// snapshot they started with.
    pub fn replace(&self, policy: DomainPolicy) {
        let mut guard = self.policy.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(policy);
    }

    /// Classify a URL. Unparsable URLs fall through to `TryStaticFirst`.
    pub fn classify(&self, url: &str) -> RoutingDecision {
        let parsed = match Url::parse(url.trim()) {
            Ok(u) => u,
            Err(_) => {
                return RoutingDecision::new(
                    RoutingAction::TryStaticFirst,
                    "URL could not be parsed, trying a static fetch first",
                    None,
                )
            }
        };

        let policy = self.policy();
        let category = parsed
            .host_str()
            .map(|h| policy.category(h))
            .unwrap_or(DomainCategory::Unknown);

        if category == DomainCategory::Blocked {
            return RoutingDecision::new(
                RoutingAction::Block,
                "domain is on the blocked list (known unparsable)",
                Some(BLOCK_SUGGESTION),
            );
        }

        if is_amp_url(&parsed) {
            return RoutingDecision::new(RoutingAction::Dynamic, "AMP page", Some(AMP_SUGGESTION));
        }

        match category {
            DomainCategory::DynamicRequired => RoutingDecision::new(
                RoutingAction::Dynamic,
                "domain is known to load its content with JavaScript",
                None,
            ),
            DomainCategory::StaticOk => RoutingDecision::new(
                RoutingAction::Static,
                "domain is known to work with a static fetch",
                None,
            ),
            _ => RoutingDecision::new(
                RoutingAction::TryStaticFirst,
                "unknown domain, trying a static fetch before rendering",
                None,
            ),
        }
    }
}

/// Detect accelerated-mobile-page URLs: an `amp` path segment, a
/// `.amp.html` document, or an `amp=1` query flag.
pub fn is_amp_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    if path.ends_with(".amp.html") {
        return true;
    }
    if path.split('/').any(|segment| segment == "amp") {
        return true;
    }
    url.query_pairs()
        .any(|(k, v)| k.eq_ignore_ascii_case("amp") && v == "1")
}
