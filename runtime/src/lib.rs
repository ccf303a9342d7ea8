// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Newsparse runtime: article extraction that picks between a lightweight
//! HTTP fetch and a headless-browser render per domain, with retry,
//! backoff, and fallback between the two.
//!
//! Entry point is [`orchestrator::Orchestrator`]; [`rest`] and [`cli`]
//! are thin adapters over it.

pub mod acquisition;
pub mod callback;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod orchestrator;
pub mod pacing;
pub mod renderer;
pub mod rest;
pub mod routing;
pub mod stealth;
pub mod types;

pub use error::{ExtractError, ExtractResult};
pub use orchestrator::Orchestrator;
pub use types::{ExtractedArticle, ExtractionRequest, ExtractionResult, RoutingOutcome};
