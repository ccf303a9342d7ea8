// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the newsparse binary.

pub mod classify_cmd;
pub mod doctor;
pub mod parse_cmd;
pub mod serve;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber on stderr. `RUST_LOG` wins over `verbose`.
pub fn init_logging(json: bool, verbose: bool) {
    let default = if verbose { "newsparse=debug" } else { "newsparse=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
