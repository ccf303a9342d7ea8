// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! `newsparse parse <url>`: one extraction, result printed as JSON.

use crate::config::RuntimeConfig;
use crate::orchestrator::Orchestrator;
use crate::types::ExtractionRequest;
use anyhow::Result;

/// Which path to force, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Routed,
    StaticOnly,
    DynamicOnly,
}

/// Run the extraction and print the envelope. Returns whether it succeeded.
pub async fn run(config: &RuntimeConfig, req: ExtractionRequest, mode: ParseMode) -> Result<bool> {
    req.validate()?;
    let orchestrator = Orchestrator::from_config(config)?;

    let result = match mode {
        ParseMode::Routed => orchestrator.extract(&req).await,
        ParseMode::StaticOnly => orchestrator.extract_static(&req).await,
        ParseMode::DynamicOnly => orchestrator.extract_dynamic(&req).await,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}
