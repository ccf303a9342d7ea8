// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! `newsparse serve`: run the REST API.

use crate::config::RuntimeConfig;
use crate::orchestrator::Orchestrator;
use crate::rest::{self, AppState};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Start the HTTP server with the given configuration.
pub async fn run(config: RuntimeConfig) -> Result<()> {
    let orchestrator = Orchestrator::from_config(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        max_concurrent_renders = config.max_concurrent_renders,
        render_retries = config.render_retries,
        temp_dir = %config.temp_dir.display(),
        "starting newsparse"
    );

    let state = Arc::new(AppState::new(orchestrator, &config));
    rest::start(config.bind_addr(), state).await
}
