// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! `newsparse classify <url>`: show the routing decision without fetching.

use crate::config::RuntimeConfig;
use crate::routing::{DomainClassifier, DomainPolicy};
use anyhow::{Context, Result};

pub fn run(config: &RuntimeConfig, url: &str, json: bool) -> Result<()> {
    let policy = match &config.policy_file {
        Some(path) => DomainPolicy::load(path)
            .with_context(|| format!("failed to load policy {}", path.display()))?,
        None => DomainPolicy::builtin(),
    };
    let decision = DomainClassifier::new(policy).classify(url);

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!("action:     {:?}", decision.action);
        println!("reason:     {}", decision.reason);
        if let Some(s) = &decision.suggestion {
            println!("suggestion: {s}");
        }
    }
    Ok(())
}
